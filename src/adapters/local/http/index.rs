//! `GET /`: the most recent events as an HTML page.

use super::AppState;
use crate::domain::Event;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use maud::{html, Markup, DOCTYPE};
use serde::Deserialize;
use std::io;
use std::path::Path;

/// Placeholder replaced by the event list in a custom `index.html`.
pub const EVENTS_PLACEHOLDER: &str = "{{events}}";

const MAX_INDEX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    limit: Option<u32>,
}

pub async fn handle(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(state.index_limit)
        .clamp(1, MAX_INDEX_LIMIT);

    let events = state.events.list_recent(limit).await.map_err(|e| {
        tracing::error!(error = %e, "failed to list events");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Html(state.page.render(&events)))
}

/// Renders the index. Uses a user supplied page shell when one was found in
/// the template directory at startup.
#[derive(Debug, Clone, Default)]
pub struct IndexPage {
    shell: Option<String>,
}

impl IndexPage {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
        }
    }

    /// Read `index.html` from `template_dir`, falling back to the built in
    /// page when it does not exist.
    pub async fn load(template_dir: &Path) -> io::Result<Self> {
        let path = template_dir.join("index.html");
        match tokio::fs::read_to_string(&path).await {
            Ok(shell) => {
                if !shell.contains(EVENTS_PLACEHOLDER) {
                    tracing::warn!(path = %path.display(), "template has no {{events}} placeholder");
                }
                tracing::info!(path = %path.display(), "loaded index template");
                Ok(Self::with_shell(shell))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no index template, using built in page");
                Ok(Self::builtin())
            }
            Err(e) => Err(e),
        }
    }

    pub fn render(&self, events: &[Event]) -> String {
        let list = event_list(events);
        match &self.shell {
            Some(shell) => shell.replace(EVENTS_PLACEHOLDER, &list.into_string()),
            None => layout(list).into_string(),
        }
    }
}

fn layout(content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Motion events" }
            }
            body {
                h1 { "Recent motion events" }
                (content)
            }
        }
    }
}

fn event_list(events: &[Event]) -> Markup {
    html! {
        @if events.is_empty() {
            p.empty { "No events recorded yet." }
        } @else {
            ul.events {
                @for event in events {
                    li.event id={ "event-" (event.id) } {
                        h2 { (event.name) }
                        time datetime=(event.time.to_rfc3339()) {
                            (event.time.format("%Y-%m-%d %H:%M:%S UTC"))
                        }
                        @if let Some(src) = media_url(&event.video_path) {
                            video controls preload="none" src=(src) {}
                        }
                        @if let Some(src) = media_url(&event.image_path) {
                            a href=(src) {
                                img src=(src) alt=(event.name) width="320";
                            }
                        }
                    }
                }
            }
        }
    }
}

/// URL of a stored file under the `/data/` mount.
pub fn media_url(path: &str) -> Option<String> {
    let name = Path::new(path).file_name()?.to_str()?;
    Some(format!("/data/{name}"))
}
