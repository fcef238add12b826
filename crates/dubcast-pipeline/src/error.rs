use dubcast_core::HttpError;
use dubcast_store::{SegmentId, StoreError};
use http::StatusCode;
use media::MediaError;
use thiserror::Error;
use transcript::TranscriptError;
use translation::TranslationError;
use tts::TtsError;

/// Errors of the pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller input that can never succeed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// The segment is not in a state that allows the operation
    #[error("{0}")]
    Conflict(String),

    /// The transcript produced no text to synthesize
    #[error("transcript for {0} is empty")]
    EmptyTranscript(String),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HttpError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::VideoNotFound(_) | Self::SegmentNotFound(_) | Self::Transcript(TranscriptError::Unavailable(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::EmptyTranscript(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transcript(TranscriptError::Timeout) | Self::Translation(TranslationError::Timeout) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::Transcript(_) | Self::Translation(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::VideoNotFound(_) | Self::SegmentNotFound(_) => "not_found_error",
            Self::Conflict(_) => "conflict_error",
            Self::EmptyTranscript(_) | Self::Transcript(_) => "transcript_error",
            Self::Translation(_) => "translation_error",
            Self::Store(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Transcript(_) => "failed to fetch transcript".to_owned(),
            Self::Translation(_) => "failed to translate transcript".to_owned(),
            Self::Store(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn client_details(&self) -> Option<String> {
        match self {
            // Send errors name the upstream address
            Self::Transcript(TranscriptError::Connection(_)) | Self::Translation(TranslationError::Connection(_)) => None,
            Self::Transcript(e) => Some(e.to_string()),
            Self::Translation(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

/// Errors of the segment delivery proxy
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("segment not found: {0}")]
    NotFound(SegmentId),

    /// Synthesis gave up on the segment; it must be requeued
    #[error("segment {id} failed to synthesize")]
    Failed { id: SegmentId, last_error: Option<String> },

    #[error("invalid audio reference: {0}")]
    InvalidReference(String),

    #[error("audio host not allowed: {0}")]
    HostNotAllowed(String),

    /// Origin error, the client should retry
    #[error("failed to fetch audio from origin")]
    Upstream { retry_after: u64 },

    /// Origin timeout, the client should retry
    #[error("timed out fetching audio from origin")]
    Timeout { retry_after: u64 },

    /// Client retried past the cap
    #[error("audio unavailable after {retries} retries")]
    Exhausted { retries: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MediaError> for DeliveryError {
    fn from(e: MediaError) -> Self {
        Self::InvalidReference(e.to_string())
    }
}

impl HttpError for DeliveryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Failed { .. } => StatusCode::CONFLICT,
            Self::InvalidReference(_) | Self::HostNotAllowed(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Exhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found_error",
            Self::Failed { .. } => "segment_failed",
            Self::InvalidReference(_) | Self::HostNotAllowed(_) => "invalid_request_error",
            Self::Upstream { .. } | Self::Timeout { .. } | Self::Exhausted { .. } => "upstream_error",
            Self::Store(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn client_details(&self) -> Option<String> {
        match self {
            Self::Failed { last_error, .. } => last_error.clone(),
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Upstream { retry_after } | Self::Timeout { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Failure category of one synthesis attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Speech synthesis failed or timed out
    Synthesis,
    /// The synthesized audio reference has an unknown shape
    Format,
    /// The audio duration could not be measured or was invalid
    Duration,
    /// Another flow took the segment over before it could be persisted
    Conflict,
}

impl FailureKind {
    /// Text persisted on the segment and shown to clients
    ///
    /// Provider errors and audio references stay in the logs.
    pub const fn client_message(self) -> &'static str {
        match self {
            Self::Synthesis => "speech synthesis failed",
            Self::Format => "synthesis returned an unrecognized audio reference",
            Self::Duration => "audio duration could not be determined",
            Self::Conflict => "segment was taken over by another flow",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Synthesis => "synthesis",
            Self::Format => "format",
            Self::Duration => "duration",
            Self::Conflict => "conflict",
        })
    }
}

/// Error of one step of a synthesis attempt
#[derive(Debug, Error)]
pub(crate) enum StepError {
    #[error("synthesis: {0}")]
    Synthesis(#[from] TtsError),
    #[error("format: {0}")]
    Format(MediaError),
    #[error("duration: {0}")]
    Duration(MediaError),
}

impl StepError {
    pub(crate) const fn kind(&self) -> FailureKind {
        match self {
            Self::Synthesis(_) => FailureKind::Synthesis,
            Self::Format(_) => FailureKind::Format,
            Self::Duration(_) => FailureKind::Duration,
        }
    }

    /// A malformed reference will not fix itself on retry
    pub(crate) const fn is_terminal(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}
