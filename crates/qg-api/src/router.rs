use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::{catalog, challenge, session, state::ApiState};

/// Largest accepted request body. Uploads may total 15 MiB before base64
/// inflates them by a third.
pub const MAX_BODY_BYTES: usize = 21 * 1024 * 1024;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .merge(catalog::routes())
        .merge(challenge::routes())
        .merge(session::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
