//! HTTP transport seam.
//!
//! Routes hand a fully built [`TransportRequest`] to a [`Transport`] and get
//! back the raw status, headers, final URL and body. Anything that fails
//! before a status line arrives is a [`TransportError`].

mod http_transport;

pub use http_transport::HyperTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

/// A request ready to be put on the wire
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Absolute URL, including any query string
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    /// URL that produced this response (after redirects)
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    /// `Content-Type` header value, if present and valid text
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Body as text, replacing invalid UTF-8
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes one HTTP exchange.
///
/// Implementations return `Ok` for every HTTP status, 4xx and 5xx included.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
