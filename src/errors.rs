use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the data-access layer.
///
/// The HTTP layer raises a typed variant and [`classify`] decides which tier
/// reacts; no caller inspects message text.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure: DNS, refused connection, timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response that is not covered by a more specific variant.
    #[error("HTTP request failed with status: {0}")]
    Http(StatusCode),

    /// 401 from the remote service: the admin token is missing or stale.
    #[error("unauthorized: admin token rejected")]
    Unauthorized,

    /// 400 with a server-side validation message.
    #[error("validation failed: {0}")]
    Validation(String),

    /// 2xx body that could not be parsed into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Local persistence failure (unwritable storage dir etc).
    #[error("storage error: {0}")]
    Storage(String),

    /// Every delivery tier failed, including the local fallback.
    #[error("all delivery tiers failed (direct, proxy, local)")]
    Exhausted,
}

/// How the fallback chain should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Transient infra failure: try the next tier and/or enter local mode.
    Critical,
    /// Surfaced to the caller as-is; the operating mode does not change.
    /// Validation errors must not silently diverge local and remote state.
    Recoverable,
}

/// Classifies an error for the fallback logic.
///
/// Network failures and upstream-gateway statuses (502/503/504) are the only
/// Critical cases; everything else (4xx, parse errors, storage errors) is
/// surfaced without switching tiers.
pub fn classify(err: &ApiError) -> Severity {
    match err {
        ApiError::Network(_) => Severity::Critical,
        ApiError::Http(status) => match *status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Severity::Critical
            }
            _ => Severity::Recoverable,
        },
        _ => Severity::Recoverable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses_are_critical() {
        assert_eq!(classify(&ApiError::Http(StatusCode::BAD_GATEWAY)), Severity::Critical);
        assert_eq!(
            classify(&ApiError::Http(StatusCode::SERVICE_UNAVAILABLE)),
            Severity::Critical
        );
        assert_eq!(
            classify(&ApiError::Http(StatusCode::GATEWAY_TIMEOUT)),
            Severity::Critical
        );
    }

    #[test]
    fn client_errors_are_recoverable() {
        assert_eq!(
            classify(&ApiError::Http(StatusCode::BAD_REQUEST)),
            Severity::Recoverable
        );
        assert_eq!(classify(&ApiError::Unauthorized), Severity::Recoverable);
        assert_eq!(
            classify(&ApiError::Validation("name is required".into())),
            Severity::Recoverable
        );
        assert_eq!(
            classify(&ApiError::Http(StatusCode::INTERNAL_SERVER_ERROR)),
            Severity::Recoverable
        );
    }

    #[test]
    fn parse_and_storage_errors_do_not_switch_tiers() {
        assert_eq!(
            classify(&ApiError::InvalidResponse("not an object".into())),
            Severity::Recoverable
        );
        assert_eq!(
            classify(&ApiError::Storage("read-only filesystem".into())),
            Severity::Recoverable
        );
    }
}
