//! HTTP error responses.
//!
//! Bodies are plain text; clients see the message verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shotit_core::Error;

/// Errors a screenshot request can end in.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request path.
    #[error("{0}")]
    BadRequest(String),

    /// No stored screenshot satisfies a dated request.
    #[error("{0}")]
    NotFound(String),

    /// `@refresh` already used today for this URL and modifier set.
    #[error("Refresh limit: once per day per URL")]
    RefreshLimited,

    /// The capture backend failed or the target was refused.
    #[error("Failed to capture screenshot: {0}")]
    CaptureFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RefreshLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CaptureFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_malformed_request() {
            ApiError::BadRequest(err.to_string())
        } else if err.is_capture_failure() {
            ApiError::CaptureFailed(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_requests_are_bad_request() {
        let err = ApiError::from(Error::UnknownModifier("foo".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Unknown modifier: @foo");

        assert_eq!(ApiError::from(Error::NoUrl).to_string(), "No URL provided");
        assert_eq!(ApiError::from(Error::MultipleDates).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(Error::InvalidUrl("x".into())).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_capture_failures_are_bad_gateway() {
        let err = ApiError::from(Error::CaptureFailed("timeout".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Failed to capture screenshot: Screenshot failed: timeout");

        let err = ApiError::from(Error::BlockedTarget("blocked IP: 127.0.0.1 (private/reserved)".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = ApiError::from(Error::Storage("disk full".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal error: storage error: disk full");
    }

    #[test]
    fn test_refresh_limited() {
        assert_eq!(ApiError::RefreshLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::RefreshLimited.to_string(), "Refresh limit: once per day per URL");
    }
}
