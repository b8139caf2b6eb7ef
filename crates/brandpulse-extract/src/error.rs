use brandpulse_core::{ErrorKind, SourcePlatform};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{platform} source unavailable: {reason}")]
    SourceUnavailable {
        platform: SourcePlatform,
        reason: String,
    },

    #[error("invalid fetch limit {limit} for {platform}: must be between 1 and {max}")]
    InvalidLimit {
        platform: SourcePlatform,
        limit: u32,
        max: u32,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{platform} API returned HTTP {status}: {message}")]
    Api {
        platform: SourcePlatform,
        status: u16,
        /// Machine-readable reason from the error body, e.g. `quotaExceeded`.
        reason: Option<String>,
        message: String,
    },

    #[error("rate limited by {platform} (retry after {retry_after_secs}s)")]
    RateLimited {
        platform: SourcePlatform,
        retry_after_secs: u64,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractError {
    /// Timeouts, connection failures, HTTP 429 and 5xx are worth retrying.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ExtractError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ExtractError::RateLimited { .. } => true,
            ExtractError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidLimit { .. } => ErrorKind::ConfigurationError,
            _ => ErrorKind::SourceUnavailable,
        }
    }

    /// Collapse a transient error that survived every retry into
    /// [`ExtractError::SourceUnavailable`]. Other errors pass through.
    #[must_use]
    pub(crate) fn exhausted(self, platform: SourcePlatform) -> Self {
        if self.is_retriable() {
            ExtractError::SourceUnavailable {
                platform,
                reason: format!("retries exhausted: {self}"),
            }
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retriable_client_errors_are_not() {
        let server = ExtractError::Api {
            platform: SourcePlatform::Reddit,
            status: 503,
            reason: None,
            message: String::new(),
        };
        let client = ExtractError::Api {
            platform: SourcePlatform::Reddit,
            status: 404,
            reason: None,
            message: String::new(),
        };
        assert!(server.is_retriable());
        assert!(!client.is_retriable());
    }

    #[test]
    fn exhausted_transient_errors_become_source_unavailable() {
        let err = ExtractError::RateLimited {
            platform: SourcePlatform::YouTube,
            retry_after_secs: 5,
        }
        .exhausted(SourcePlatform::YouTube);
        assert!(matches!(
            err,
            ExtractError::SourceUnavailable {
                platform: SourcePlatform::YouTube,
                ..
            }
        ));
    }

    #[test]
    fn invalid_limit_is_a_configuration_error() {
        let err = ExtractError::InvalidLimit {
            platform: SourcePlatform::Reddit,
            limit: 0,
            max: 100,
        };
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }
}
