//! Status-code pairs for callers that branch on a numeric outcome instead of
//! matching on [`RestError`].
//!
//! ```ignore
//! let (kind, outcome) = route.request().send_coded().await?;
//! if kind == StatusKind::Success { /* ... */ }
//! ```

use crate::error::RestError;
use crate::response::Response;
use crate::route::RouteRequest;

/// Numeric outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusKind {
    Success = 0,
    InvalidUrl = 1,
    RequestError = 4,
    ServerError = 5,
}

impl StatusKind {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Value paired with a [`StatusKind`]
#[derive(Debug)]
pub enum Outcome {
    Response(Response),
    /// The 4xx/5xx error, still carrying status and body
    Error(RestError),
    /// Transport failure; no value
    Nothing,
}

impl Outcome {
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Error(_) | Outcome::Nothing => None,
        }
    }
}

/// Translate a request result into a `(kind, outcome)` pair.
///
/// # Errors
/// Any error other than `InvalidUrl`, `Request` and `Server` is returned
/// unchanged.
pub fn into_status_pair(
    result: Result<Response, RestError>,
) -> Result<(StatusKind, Outcome), RestError> {
    match result {
        Ok(response) => Ok((StatusKind::Success, Outcome::Response(response))),
        Err(RestError::InvalidUrl { url, source }) => {
            tracing::debug!(url = %url, error = %source, "Transport failure reported as status pair");
            Ok((StatusKind::InvalidUrl, Outcome::Nothing))
        }
        Err(err @ RestError::Request(_)) => Ok((StatusKind::RequestError, Outcome::Error(err))),
        Err(err @ RestError::Server(_)) => Ok((StatusKind::ServerError, Outcome::Error(err))),
        Err(err) => Err(err),
    }
}

impl RouteRequest {
    /// [`send`](Self::send) with the result translated by [`into_status_pair`]
    ///
    /// # Errors
    /// Errors other than `InvalidUrl`, `Request` and `Server`
    pub async fn send_coded(self) -> Result<(StatusKind, Outcome), RestError> {
        into_status_pair(self.send().await)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::{StatusError, TransportError};
    use http::StatusCode;
    use std::time::Duration;

    #[test]
    fn test_codes() {
        assert_eq!(StatusKind::Success.code(), 0);
        assert_eq!(StatusKind::InvalidUrl.code(), 1);
        assert_eq!(StatusKind::RequestError.code(), 4);
        assert_eq!(StatusKind::ServerError.code(), 5);
    }

    #[test]
    fn test_transport_failure_maps_to_invalid_url() {
        let err = RestError::InvalidUrl {
            url: "http://api.test/".to_owned(),
            source: TransportError::Timeout(Duration::from_secs(1)),
        };
        let (kind, outcome) = into_status_pair(Err(err)).unwrap();
        assert_eq!(kind, StatusKind::InvalidUrl);
        assert!(matches!(outcome, Outcome::Nothing));
    }

    #[test]
    fn test_status_errors_are_paired() {
        let err = RestError::Request(StatusError::new(StatusCode::NOT_FOUND, "not found"));
        let (kind, outcome) = into_status_pair(Err(err)).unwrap();
        assert_eq!(kind, StatusKind::RequestError);
        match outcome {
            Outcome::Error(err) => assert_eq!(err.to_string(), "not found"),
            other => panic!("unexpected outcome {other:?}"),
        }

        let err = RestError::Server(StatusError::new(StatusCode::BAD_GATEWAY, "down"));
        let (kind, _) = into_status_pair(Err(err)).unwrap();
        assert_eq!(kind, StatusKind::ServerError);
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let result = into_status_pair(Err(RestError::Json(err)));
        assert!(matches!(result, Err(RestError::Json(_))));

        assert!(matches!(
            into_status_pair(Err(RestError::ClientDropped)),
            Err(RestError::ClientDropped)
        ));
    }
}
