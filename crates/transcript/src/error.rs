use thiserror::Error;

/// Transcript acquisition errors
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The video has no transcript in the requested language
    #[error("no transcript available for {0}")]
    Unavailable(String),

    /// The service answered with an unexpected status
    #[error("transcript service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request could not be sent
    #[error("transcript service unreachable: {0}")]
    Connection(String),

    #[error("transcript request timed out")]
    Timeout,

    /// The response body could not be understood
    #[error("invalid transcript response: {0}")]
    InvalidResponse(String),

    #[error("transcript configuration error: {0}")]
    Config(String),
}

impl TranscriptError {
    /// Whether the same request may succeed when sent again
    ///
    /// A missing transcript is final.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) | Self::InvalidResponse(_) | Self::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_transcript_is_not_retryable() {
        assert!(!TranscriptError::Unavailable("dQw4w9WgXcQ".to_owned()).is_retryable());
        assert!(TranscriptError::Timeout.is_retryable());
        assert!(
            TranscriptError::Upstream {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
    }
}
