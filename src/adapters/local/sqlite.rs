//! SQLite backed event record store.

use crate::domain::{Event, EventId, NewEvent};
use crate::error::PersistenceError;
use crate::ports::repository::{EventRepository, MAX_LIST_LIMIT};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const CREATE_EVENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        video TEXT NOT NULL,
        image TEXT NOT NULL
    )
"#;

#[derive(FromRow)]
struct EventRow {
    id: i64,
    name: String,
    time: NaiveDateTime,
    video: String,
    image: String,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            time: row.time.and_utc(),
            video_path: row.video,
            image_path: row.image,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    /// Open (creating if needed) the database file and its schema.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        tracing::info!(path = %path.display(), "opened event store");

        Ok(repo)
    }

    pub async fn open_in_memory() -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;

        Ok(repo)
    }

    async fn create_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn insert(&self, event: &NewEvent) -> Result<EventId, PersistenceError> {
        if let Some(field) = event.missing_field() {
            return Err(PersistenceError::Incomplete(field));
        }

        let result = sqlx::query(
            "INSERT INTO events (name, time, video, image) \
             VALUES (?, COALESCE(?, CURRENT_TIMESTAMP), ?, ?)",
        )
        .bind(&event.name)
        .bind(event.time.map(|t| t.naive_utc()))
        .bind(&event.video_path)
        .bind(&event.image_path)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(event_id = id, name = %event.name, "created new event");
        Ok(id)
    }

    async fn get_by_id(&self, id: EventId) -> Result<Event, PersistenceError> {
        let row: Option<EventRow> =
            sqlx::query_as("SELECT id, name, time, video, image FROM events WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Event::from).ok_or(PersistenceError::NotFound(id))
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Event>, PersistenceError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, name, time, video, image FROM events ORDER BY id DESC LIMIT ?",
        )
        .bind(limit.min(MAX_LIST_LIMIT))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_then_get_round_trip() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();

        let id = repo
            .insert(&NewEvent::new("motion-1", "a.mp4", "a.jpg"))
            .await
            .unwrap();
        let event = repo.get_by_id(id).await.unwrap();

        assert_eq!(event.id, id);
        assert_eq!(event.name, "motion-1");
        assert_eq!(event.video_path, "a.mp4");
        assert_eq!(event.image_path, "a.jpg");
        let age = Utc::now() - event.time;
        assert!(age.num_seconds().abs() < 60, "time should default to now");
    }

    #[tokio::test]
    async fn test_explicit_time_is_kept() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();
        let at = Utc.with_ymd_and_hms(2023, 11, 4, 8, 15, 30).unwrap();

        let id = repo
            .insert(&NewEvent::new("garage", "b.mp4", "b.jpg").at(at))
            .await
            .unwrap();

        assert_eq!(repo.get_by_id(id).await.unwrap().time, at);
    }

    #[tokio::test]
    async fn test_incomplete_event_is_refused() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();

        let result = repo.insert(&NewEvent::new("cam", "a.mp4", "")).await;

        assert!(matches!(result, Err(PersistenceError::Incomplete("image"))));
        assert!(repo.list_recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();
        assert!(matches!(
            repo.get_by_id(42).await,
            Err(PersistenceError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first_and_bounded() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();
        assert!(repo.list_recent(5).await.unwrap().is_empty());

        // Same explicit time for all rows, so only the id can order them.
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..7 {
            repo.insert(&NewEvent::new(format!("cam-{i}"), "v.mp4", "i.jpg").at(at))
                .await
                .unwrap();
        }

        let recent = repo.list_recent(5).await.unwrap();
        assert_eq!(recent.len(), 5);
        let ids: Vec<_> = recent.iter().map(|e| e.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(recent[0].name, "cam-6");

        assert_eq!(repo.list_recent(5).await.unwrap(), recent);
        assert!(repo.list_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_recent_caps_huge_limits() {
        let repo = SqliteEventRepository::open_in_memory().await.unwrap();
        for i in 0..3 {
            repo.insert(&NewEvent::new(format!("cam-{i}"), "v.mp4", "i.jpg"))
                .await
                .unwrap();
        }

        let all = repo.list_recent(u32::MAX).await.unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "cam-2");
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.db");
        let repo = SqliteEventRepository::open(&path).await.unwrap();

        let first = repo.insert(&NewEvent::new("a", "a.mp4", "a.jpg")).await.unwrap();
        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(first)
            .execute(&repo.pool)
            .await
            .unwrap();
        let second = repo.insert(&NewEvent::new("b", "b.mp4", "b.jpg")).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_reopen_keeps_schema_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.db");

        let id = {
            let repo = SqliteEventRepository::open(&path).await.unwrap();
            let id = repo.insert(&NewEvent::new("a", "a.mp4", "a.jpg")).await.unwrap();
            repo.pool.close().await;
            id
        };

        let repo = SqliteEventRepository::open(&path).await.unwrap();
        assert_eq!(repo.get_by_id(id).await.unwrap().name, "a");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_distinct_ids() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(
            SqliteEventRepository::open(&dir.path().join("events.db"))
                .await
                .unwrap(),
        );

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let name = format!("cam-{i}");
                    let id = repo
                        .insert(&NewEvent::new(&name, format!("{name}.mp4"), format!("{name}.jpg")))
                        .await
                        .unwrap();
                    (id, name)
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let (id, name) = handle.await.unwrap();
            assert!(ids.insert(id), "duplicate id {id}");
            let event = repo.get_by_id(id).await.unwrap();
            assert_eq!(event.name, name);
            assert_eq!(event.video_path, format!("{name}.mp4"));
            assert_eq!(event.image_path, format!("{name}.jpg"));
        }
        assert_eq!(ids.len(), 16);
    }
}
