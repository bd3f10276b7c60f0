use http::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`Transport`](crate::transport::Transport) before any
/// HTTP status was received.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// URL could not be turned into a request target
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri { url: String, reason: String },

    /// The exchange did not complete in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection level failure (DNS, refused, reset, TLS handshake)
    #[error("Connection failed: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A 4xx or 5xx answer from the server.
///
/// Displays as the raw response body so callers see the server's own error
/// payload, and compares equal to a bare status code:
///
/// ```ignore
/// match route.call().await {
///     Err(RestError::Request(err)) if err == 404 => println!("missing: {err}"),
///     other => { other?; }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    status: StatusCode,
    body: String,
}

impl StatusError {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Raw response body text
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

impl std::error::Error for StatusError {}

impl PartialEq<u16> for StatusError {
    fn eq(&self, other: &u16) -> bool {
        self.status.as_u16() == *other
    }
}

impl PartialEq<StatusError> for u16 {
    fn eq(&self, other: &StatusError) -> bool {
        *self == other.status.as_u16()
    }
}

/// REST client error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RestError {
    /// The transport could not reach the URL (DNS, connect, malformed target).
    /// Never produced for an HTTP status.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: TransportError,
    },

    /// HTTP 4xx; displays as the response body
    #[error(transparent)]
    Request(StatusError),

    /// HTTP 5xx; displays as the response body
    #[error(transparent)]
    Server(StatusError),

    /// An absolute path that does not live under the client's base path
    #[error("Path '{path}' is outside the client base path '{base}'")]
    OutsideBasePath { path: String, base: String },

    /// An absolute URL pointing at a different origin than the client
    #[error("URL '{url}' does not belong to origin '{origin}'")]
    ForeignOrigin { url: String, origin: String },

    /// The owning client was dropped while a route handle was still in use
    #[error("Owning client has been dropped")]
    ClientDropped,

    /// HTTP method token is not valid
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// JSON encoding or decoding failed
    #[error("JSON processing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// Response body declared a handled MIME type but is not UTF-8
    #[error("Response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A user-registered MIME handler rejected the body.
    ///
    /// The built-in handlers report `Json`/`Utf8` instead; this is the
    /// variant for handlers added through
    /// [`Registry::register_mimetype`](crate::Registry::register_mimetype).
    #[error("Failed to decode '{mime}' body: {reason}")]
    Decode { mime: String, reason: String },

    /// Date detection pattern failed to compile
    #[error("Invalid date pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Client construction failed
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// TLS setup failed
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RestError {
    /// HTTP status carried by `Request`/`Server` errors
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RestError::Request(err) | RestError::Server(err) => Some(err.status()),
            _ => None,
        }
    }
}

impl PartialEq<u16> for RestError {
    fn eq(&self, other: &u16) -> bool {
        self.status().is_some_and(|status| status.as_u16() == *other)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_status_error_displays_body() {
        let err = RestError::Request(StatusError::new(StatusCode::NOT_FOUND, "not found"));
        assert_eq!(err.to_string(), "not found");

        let err = RestError::Server(StatusError::new(
            StatusCode::BAD_GATEWAY,
            r#"{"error":"upstream"}"#,
        ));
        assert_eq!(err.to_string(), r#"{"error":"upstream"}"#);
    }

    #[test]
    fn test_status_error_compares_to_code() {
        let err = StatusError::new(StatusCode::NOT_FOUND, "");
        assert!(err == 404);
        assert!(404 == err);
        assert!(err != 400);

        let rest = RestError::Server(StatusError::new(StatusCode::SERVICE_UNAVAILABLE, ""));
        assert!(rest == 503);
        assert_eq!(rest.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_non_status_error_never_equals_code() {
        let err = RestError::ClientDropped;
        assert!(err != 0);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_invalid_url_preserves_transport_source() {
        let err = RestError::InvalidUrl {
            url: "http://nope/".to_owned(),
            source: TransportError::Timeout(Duration::from_secs(1)),
        };

        let source = err.source().unwrap();
        let transport = source.downcast_ref::<TransportError>().unwrap();
        assert!(matches!(transport, TransportError::Timeout(_)));
    }
}
