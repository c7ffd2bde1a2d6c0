use crate::domain::{Event, EventId, NewEvent};
use crate::error::PersistenceError;
use async_trait::async_trait;

/// Upper bound applied by [`EventRepository::list_recent`].
pub const MAX_LIST_LIMIT: u32 = 1000;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Atomically insert one event row and return its id.
    async fn insert(&self, event: &NewEvent) -> Result<EventId, PersistenceError>;

    /// Fetch a committed event
    async fn get_by_id(&self, id: EventId) -> Result<Event, PersistenceError>;

    /// Newest first, by id, at most [`MAX_LIST_LIMIT`] rows. An empty store
    /// yields an empty vec.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Event>, PersistenceError>;
}
