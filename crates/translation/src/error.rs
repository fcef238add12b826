use thiserror::Error;

/// Translation errors
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The backend answered with a non-success status
    #[error("translation backend returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("translation backend unreachable: {0}")]
    Connection(String),

    #[error("translation request timed out")]
    Timeout,

    /// Response body missing the translated text
    #[error("invalid translation response: {0}")]
    InvalidResponse(String),

    #[error("translation configuration error: {0}")]
    Config(String),
}

impl TranslationError {
    /// Whether the same request may succeed when sent again
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) | Self::Config(_) => false,
        }
    }

    pub(crate) fn from_send(backend: &str, e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            tracing::error!(backend, error = %e, "translation request failed");
            Self::Connection(e.to_string())
        }
    }

    pub(crate) fn from_body(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::InvalidResponse(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslationError>;
