//! HTTP inbound adapter.
//!
//! Routes:
//! - `GET /` recent events as HTML
//! - `GET /events` recent events as JSON
//! - `GET /event/:id` one event as JSON
//! - `POST /event/new` ingestion
//! - `GET /data/:key` stored media

pub mod events;
pub mod index;
pub mod media;
pub mod upload;

pub use index::IndexPage;

use crate::application::ingest::IngestService;
use crate::error::IngestError;
use crate::ports::repository::EventRepository;
use crate::ports::storage::MediaStore;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub events: Arc<dyn EventRepository>,
    pub media: Arc<dyn MediaStore>,
    pub page: Arc<IndexPage>,
    pub max_upload_bytes: u64,
    pub index_limit: u32,
}

pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(index::handle))
        .route("/events", get(events::list))
        .route(
            "/event/new",
            post(upload::handle).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/event/:id", get(events::show))
        .route("/data/:key", get(media::serve))
        .with_state(state)
}

/// Rejections carry no body.
impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::Validation(_) | IngestError::Storage(_) => StatusCode::NOT_ACCEPTABLE,
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Persistence(_) | IngestError::Aborted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}
