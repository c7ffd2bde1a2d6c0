//! `POST /event/new`: multipart form with `name`, `video` and `image`.

use super::AppState;
use crate::application::ingest::MediaKind;
use crate::error::{IngestError, StorageError};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::BoxError;
use futures::{StreamExt, TryStreamExt};

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, IngestError> {
    let limit = state.max_upload_bytes;
    if content_length(&headers).is_some_and(|len| len > limit) {
        tracing::info!(limit, "rejecting oversized upload");
        return Err(IngestError::PayloadTooLarge { limit });
    }

    let mut multipart = multipart.map_err(|e| rejection_error(e, limit))?;

    let mut pending = state.ingest.begin();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                pending.discard().await;
                return Err(multipart_error(e, limit));
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        if field_name == "name" {
            match field.text().await {
                Ok(text) => pending.set_name(text),
                Err(e) => {
                    pending.discard().await;
                    return Err(multipart_error(e, limit));
                }
            }
            continue;
        }

        let Some(kind) = MediaKind::from_field(&field_name) else {
            tracing::debug!(field = %field_name, "skipping unknown form field");
            continue;
        };

        let file_name = field
            .file_name()
            .map(str::to_owned)
            .unwrap_or_else(|| field_name.clone());
        let stream = field.map_err(BoxError::from).boxed();

        if let Err(e) = state
            .ingest
            .accept_media(&mut pending, kind, &file_name, stream)
            .await
        {
            pending.discard().await;
            return Err(hit_body_limit(e, limit));
        }
    }

    let receipt = state.ingest.commit(pending).await?;

    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, format!("/event/{}", receipt.id))],
    ))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Not a multipart body at all: no or wrong content type, or no boundary.
fn rejection_error(rejection: MultipartRejection, limit: u64) -> IngestError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::PayloadTooLarge { limit }
    } else {
        tracing::info!(error = %rejection.body_text(), "rejecting non multipart upload");
        IngestError::Validation("form")
    }
}

fn multipart_error(err: MultipartError, limit: u64) -> IngestError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::PayloadTooLarge { limit }
    } else {
        tracing::info!(error = %err, "malformed upload");
        IngestError::Validation("form")
    }
}

/// A body without a content length can still run over the limit while a
/// file part is being streamed.
fn hit_body_limit(err: IngestError, limit: u64) -> IngestError {
    let over_limit = matches!(
        &err,
        IngestError::Storage(StorageError::Interrupted(source))
            if source
                .downcast_ref::<MultipartError>()
                .is_some_and(|e| e.status() == StatusCode::PAYLOAD_TOO_LARGE)
    );

    if over_limit {
        IngestError::PayloadTooLarge { limit }
    } else {
        err
    }
}
