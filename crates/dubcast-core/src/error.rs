use http::StatusCode;
use serde::Serialize;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// converts these into actual HTTP responses, keeping domain errors
/// decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `not_found_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Optional extra detail safe to expose to API consumers
    fn client_details(&self) -> Option<String> {
        None
    }

    /// Seconds a client should wait before retrying, if the failure is transient
    fn retry_after(&self) -> Option<u64> {
        None
    }
}

/// JSON body returned by every endpoint on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Build the body for any [`HttpError`]
    pub fn from_error<E: HttpError + ?Sized>(error: &E) -> Self {
        Self {
            error: error.client_message(),
            details: error.client_details(),
        }
    }
}
