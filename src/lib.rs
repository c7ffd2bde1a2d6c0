//! Tripwire - Motion event ingestion service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (events, video normalization)
//! - ports/: Trait definitions (media store, event store, notifier)
//! - adapters/: Concrete implementations (filesystem, SQLite, Twilio, HTTP)
//! - application/: The ingestion pipeline
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::ingest::{IngestService, MediaKind, PendingEvent, Receipt};
pub use config::Config;
pub use domain::{Event, EventId, NewEvent};
pub use error::IngestError;
