use thiserror::Error;

/// Speech synthesis errors
#[derive(Debug, Error)]
pub enum TtsError {
    /// The request could not be sent
    #[error("connection error: {0}")]
    Connection(String),

    #[error("synthesis request timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider rejected the input text or options
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider returned {status}: {message}")]
    ProviderApi { status: u16, message: String },

    /// The provider answered without usable audio or reference
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Object storage rejected the synthesized audio
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TtsError {
    pub(crate) fn from_send(target: &str, e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            tracing::error!(target_service = target, error = %e, "synthesis request failed");
            Self::Connection(format!("failed to send request to {target}: {e}"))
        }
    }

    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(message),
            400 | 422 => Self::InvalidRequest(message),
            _ => Self::ProviderApi { status, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
