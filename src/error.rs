//! Error taxonomy for the ingestion path.
//!
//! Only [`IngestError`] reaches the HTTP layer. Transcode and notification
//! errors are logged by the pipeline and never escalate.

use crate::domain::EventId;
use axum::BoxError;
use std::io;
use std::process::ExitStatus;

/// Media store failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("media write failed: {0}")]
    Io(#[from] io::Error),

    /// The upload stream failed before all bytes were received.
    #[error("upload interrupted: {0}")]
    Interrupted(#[source] BoxError),
}

/// Event record store failures.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("event {0} not found")]
    NotFound(EventId),

    /// Refused before touching the database.
    #[error("event is missing its {0}")]
    Incomplete(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("encoder unavailable: {0}")]
    Unavailable(#[source] io::Error),

    #[error("encoder exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("encoder produced no output")]
    MissingOutput,

    #[error("could not move encoded output into place: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notifications are not configured")]
    NotConfigured,

    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected with {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Outcome of a rejected ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing or empty field: {0}")]
    Validation(&'static str),

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("ingestion task aborted")]
    Aborted,
}
