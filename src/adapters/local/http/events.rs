//! JSON views of the event store.

use super::AppState;
use crate::domain::{Event, EventId};
use crate::error::PersistenceError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<u32>,
}

/// `GET /events`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Event>>, StatusCode> {
    // The store caps the limit.
    let limit = query.limit.unwrap_or(state.index_limit);

    state
        .events
        .list_recent(limit)
        .await
        .map(Json)
        .map_err(status_for)
}

/// `GET /event/:id`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<Event>, StatusCode> {
    state.events.get_by_id(id).await.map(Json).map_err(status_for)
}

fn status_for(err: PersistenceError) -> StatusCode {
    match err {
        PersistenceError::NotFound(_) => StatusCode::NOT_FOUND,
        e => {
            tracing::error!(error = %e, "failed to read events");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
