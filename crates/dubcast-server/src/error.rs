use axum::Json;
use axum::response::{IntoResponse, Response};
use dubcast_core::{ErrorBody, HttpError, InvalidVideoKey};
use dubcast_pipeline::{DeliveryError, PipelineError};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;

/// Every failure a handler can answer with
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Pipeline(PipelineError),
    Delivery(DeliveryError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

impl From<DeliveryError> for ApiError {
    fn from(e: DeliveryError) -> Self {
        Self::Delivery(e)
    }
}

impl From<InvalidVideoKey> for ApiError {
    fn from(e: InvalidVideoKey) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// Body of a transient failure or deferral, with the retry hint repeated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RetryBody {
    pub status: &'static str,
    pub message: String,
    pub retry_after: u64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response(),
            Self::Pipeline(e) => error_response(&e),
            Self::Delivery(e) => match e.retry_after() {
                Some(retry_after) => retry_response(
                    e.status_code(),
                    RetryBody {
                        status: "error",
                        message: e.client_message(),
                        retry_after,
                    },
                    "no-store",
                ),
                None => error_response(&e),
            },
        }
    }
}

fn error_response<E: HttpError>(error: &E) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, error_type = error.error_type(), "request failed");
    } else {
        tracing::debug!(error = %error, error_type = error.error_type(), "request rejected");
    }

    (status, Json(ErrorBody::from_error(error))).into_response()
}

/// JSON response carrying a `Retry-After` header
pub(crate) fn retry_response(status: StatusCode, body: RetryBody, cache_control: &'static str) -> Response {
    let retry_after = HeaderValue::from(body.retry_after);
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, retry_after);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    response
}
