//! Event ingestion pipeline.
//!
//! An upload is received into a [`PendingEvent`]: each media part is streamed
//! straight into the media store as it arrives. [`IngestService::commit`] then
//! validates what was received, normalizes the video, inserts the record and
//! hands the committed event to the notifier.
//!
//! A pending event that is dropped without being committed removes its media,
//! so a rejected or abandoned upload never leaves files behind. Once commit has
//! started it runs on its own task and is not cancelled by the client going
//! away, which keeps records and files consistent with each other.

use crate::domain::cmd::TranscodeExecutor;
use crate::domain::transcode::normalize_video;
use crate::domain::{Event, EventId, NewEvent};
use crate::error::IngestError;
use crate::ports::notifier::Notifier;
use crate::ports::repository::EventRepository;
use crate::ports::storage::{ByteStream, MediaStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The two media parts of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Maps a multipart field name to the part it carries.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }
}

/// Result of a committed ingestion.
#[derive(Debug)]
pub struct Receipt {
    pub id: EventId,
    /// The committed record as read back from the store.
    pub event: Option<Event>,
    /// Notification task. Nothing waits for it on the request path.
    pub notification: Option<JoinHandle<()>>,
}

/// Parts received so far for one upload.
pub struct PendingEvent {
    media: Arc<dyn MediaStore>,
    name: Option<String>,
    video: Option<PathBuf>,
    image: Option<PathBuf>,
}

impl PendingEvent {
    fn new(media: Arc<dyn MediaStore>) -> Self {
        Self {
            media,
            name: None,
            video: None,
            image: None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn media_path(&self, kind: MediaKind) -> Option<&PathBuf> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Image => self.image.as_ref(),
        }
    }

    fn slot(&mut self, kind: MediaKind) -> &mut Option<PathBuf> {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Image => &mut self.image,
        }
    }

    fn take_media(&mut self) -> Vec<PathBuf> {
        self.video.take().into_iter().chain(self.image.take()).collect()
    }

    /// Remove everything stored for this upload.
    pub async fn discard(mut self) {
        for path in self.take_media() {
            self.media.remove(&path).await;
        }
    }
}

impl Drop for PendingEvent {
    fn drop(&mut self) {
        let leftovers = self.take_media();
        if leftovers.is_empty() {
            return;
        }

        tracing::warn!(files = leftovers.len(), "discarding media of abandoned upload");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let media = self.media.clone();
                handle.spawn(async move {
                    for path in leftovers {
                        media.remove(&path).await;
                    }
                });
            }
            Err(_) => {
                for path in leftovers {
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "failed to remove media")
                        }
                    }
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct IngestService {
    media: Arc<dyn MediaStore>,
    events: Arc<dyn EventRepository>,
    notifier: Arc<dyn Notifier>,
    transcoder: Option<Arc<dyn TranscodeExecutor>>,
}

impl IngestService {
    pub fn new(
        media: Arc<dyn MediaStore>,
        events: Arc<dyn EventRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            media,
            events,
            notifier,
            transcoder: None,
        }
    }

    /// Enable video normalization through `executor`.
    pub fn with_transcoder(mut self, executor: Arc<dyn TranscodeExecutor>) -> Self {
        self.transcoder = Some(executor);
        self
    }

    pub fn begin(&self) -> PendingEvent {
        PendingEvent::new(self.media.clone())
    }

    /// Stream one media part into the store. A repeated part replaces the
    /// earlier one; an empty part counts as not sent.
    pub async fn accept_media(
        &self,
        pending: &mut PendingEvent,
        kind: MediaKind,
        file_name: &str,
        stream: ByteStream<'_>,
    ) -> Result<(), IngestError> {
        let stored = self.media.save(stream, file_name).await.map_err(|e| {
            tracing::error!(part = kind.field_name(), error = %e, "failed to store upload");
            e
        })?;

        if stored.bytes == 0 {
            tracing::debug!(part = kind.field_name(), "ignoring empty upload part");
            self.media.remove(&stored.path).await;
            return Ok(());
        }

        if let Some(previous) = pending.slot(kind).replace(stored.path) {
            self.media.remove(&previous).await;
        }
        Ok(())
    }

    /// Validate and commit a received upload.
    pub async fn commit(&self, mut pending: PendingEvent) -> Result<Receipt, IngestError> {
        let name = pending
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        match (name.is_empty(), pending.video.take(), pending.image.take()) {
            (false, Some(video), Some(image)) => {
                // Finish on a separate task so a disconnecting client cannot
                // cut the commit in half.
                let service = self.clone();
                let task = tokio::spawn(async move { service.finalize(name, video, image).await });
                match task.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(_) => Err(IngestError::Aborted),
                }
            }
            (name_missing, video, image) => {
                let field = if name_missing {
                    "name"
                } else if video.is_none() {
                    "video"
                } else {
                    "image"
                };
                tracing::info!(field, "rejecting incomplete upload");
                pending.video = video;
                pending.image = image;
                pending.discard().await;
                Err(IngestError::Validation(field))
            }
        }
    }

    async fn finalize(
        &self,
        name: String,
        video: PathBuf,
        image: PathBuf,
    ) -> Result<Receipt, IngestError> {
        let video = self.normalize(video).await;

        let new_event = NewEvent::new(name, video.to_string_lossy(), image.to_string_lossy());

        let id = match self.events.insert(&new_event).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "failed to commit event");
                self.media.remove(&video).await;
                self.media.remove(&image).await;
                return Err(e.into());
            }
        };

        let event = match self.events.get_by_id(id).await {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(event_id = id, error = %e, "committed event could not be read back");
                None
            }
        };
        let notification = event.clone().map(|event| self.dispatch_notification(event));

        Ok(Receipt {
            id,
            event,
            notification,
        })
    }

    /// Returns the path to reference: the normalized video, or the original
    /// when normalization is disabled or fails.
    async fn normalize(&self, video: PathBuf) -> PathBuf {
        let Some(transcoder) = &self.transcoder else {
            return video;
        };

        match normalize_video(&video, transcoder.as_ref()).await {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(path = %video.display(), error = %e, "video normalization failed, keeping original");
                video
            }
        }
    }

    fn dispatch_notification(&self, event: Event) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(event_id = event.id, error = %e, "failed to send event notification");
            }
        })
    }
}
