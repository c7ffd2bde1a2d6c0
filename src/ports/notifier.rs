use crate::domain::Event;
use crate::error::NotificationError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the configured recipient about a committed event.
    async fn notify(&self, event: &Event) -> Result<(), NotificationError>;
}
