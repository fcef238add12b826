use thiserror::Error;

/// Media errors
#[derive(Debug, Error)]
pub enum MediaError {
    /// An audio reference in a shape nothing can fetch
    #[error("unrecognized audio reference: {0}")]
    Format(String),

    /// The probe ran but could not report a duration
    #[error("duration probe failed: {0}")]
    Probe(String),

    #[error("invalid audio duration: {0}")]
    InvalidDuration(f64),

    #[error("duration probe timed out")]
    ProbeTimeout,

    /// Origin answered with a non-success status
    #[error("audio origin returned {status}")]
    Upstream { status: u16 },

    #[error("audio fetch timed out")]
    FetchTimeout,

    #[error("audio origin unreachable: {0}")]
    Connection(String),

    #[error("media configuration error: {0}")]
    Config(String),
}

impl MediaError {
    /// Whether this error is a duration failure rather than a transport one
    pub const fn is_duration_error(&self) -> bool {
        matches!(self, Self::Probe(_) | Self::InvalidDuration(_) | Self::ProbeTimeout)
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
