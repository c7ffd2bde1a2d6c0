//! `GET /data/:key`: stored media files.

use super::AppState;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Only plain keys are served. Dot files are in-progress uploads or
/// encoder output.
pub async fn serve(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Request,
) -> Response {
    if key.starts_with('.') {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Ok(path) = state.media.resolve(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
