//! Domain layer - Pure business logic.

pub mod cmd;
pub mod event;
pub mod transcode;

pub use event::{Event, EventId, NewEvent};
