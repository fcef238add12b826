use axum::response::IntoResponse;
use http::StatusCode;

/// Liveness only; collaborators are not contacted
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
