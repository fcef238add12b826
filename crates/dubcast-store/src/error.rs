use thiserror::Error;

/// Segment store errors
///
/// Absent records are reported as `Ok(None)` and lost transitions as
/// `Ok(false)`, so every variant here is a system-level failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend connection or command error
    #[error("store backend: {0}")]
    Backend(String),
    /// A persisted record could not be decoded
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
