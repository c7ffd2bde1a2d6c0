use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EventId = i64;

/// A committed motion event. Only ever built from a row of the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub time: DateTime<Utc>,
    pub video_path: String,
    pub image_path: String,
}

/// Fields handed to the record store on insert. `time` falls back to the
/// store's insert time when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub time: Option<DateTime<Utc>>,
    pub video_path: String,
    pub image_path: String,
}

impl NewEvent {
    pub fn new(
        name: impl Into<String>,
        video_path: impl Into<String>,
        image_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            time: None,
            video_path: video_path.into(),
            image_path: image_path.into(),
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Returns the first missing field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.video_path.is_empty() {
            Some("video")
        } else if self.image_path.is_empty() {
            Some("image")
        } else {
            None
        }
    }
}

impl Event {
    /// SMS body sent once the event is committed.
    pub fn notification_message(&self) -> String {
        format!(
            "Motion event \"{}\" captured at {}.",
            self.name,
            self.time.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}
