use brandpulse_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classification backend unavailable: {0}")]
    Unavailable(String),

    #[error("classification backend not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classification backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend returned unmapped label \"{0}\"")]
    UnmappedLabel(String),

    #[error("backend returned {actual} predictions for {expected} inputs")]
    PredictionCountMismatch { expected: usize, actual: usize },

    #[error("batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
}

impl ClassifierError {
    /// Timeouts, connection failures, HTTP 429 and 5xx are worth retrying.
    /// A model that is still loading answers 503.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ClassifierError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClassifierError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifierError::InvalidBatchSize(_) | ClassifierError::NotConfigured(_) => {
                ErrorKind::ConfigurationError
            }
            _ => ErrorKind::ClassifierUnavailable,
        }
    }

    pub(crate) fn exhausted(self) -> Self {
        if self.is_retriable() {
            ClassifierError::Unavailable(format!("retries exhausted: {self}"))
        } else {
            self
        }
    }
}
