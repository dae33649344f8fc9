/// Errors raised while talking to the analysis, chat and doctor services.
///
/// Every non-success status is reported through the single `Upstream` variant;
/// callers never branch on the specific code, they only show the message.
/// Front-end crates wrap `TransportError` via `#[from]` in their own error type.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Error from server: {status} ({})", describe_status(.status))]
    Upstream { status: StatusCode, body: String },
}

impl TransportError {
    /// Status code reported by the service, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Request(e) => e.status(),
            TransportError::Upstream { status, .. } => Some(*status),
        }
    }
}

/// Human-readable explanation of a backend status code.
pub fn describe_status(status: &StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "the request was rejected as invalid",
        401 | 403 => "the credential was rejected",
        404 => "the requested resource was not found",
        408 | 504 => "the service timed out",
        429 => "too many requests, try again shortly",
        500..=599 => "the service failed to process the request",
        400..=499 => "the request could not be completed",
        _ => "unexpected response from the service",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_status_groups_codes() {
        assert_eq!(
            describe_status(&StatusCode::NOT_FOUND),
            "the requested resource was not found"
        );
        assert_eq!(
            describe_status(&StatusCode::UNAUTHORIZED),
            describe_status(&StatusCode::FORBIDDEN)
        );
        assert_eq!(
            describe_status(&StatusCode::BAD_GATEWAY),
            "the service failed to process the request"
        );
        assert_eq!(
            describe_status(&StatusCode::IM_A_TEAPOT),
            "the request could not be completed"
        );
        assert_eq!(
            describe_status(&StatusCode::MOVED_PERMANENTLY),
            "unexpected response from the service"
        );
    }

    #[test]
    fn test_upstream_display_includes_status_and_reason() {
        let err = TransportError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error from server: 500 Internal Server Error \
             (the service failed to process the request)"
        );
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
