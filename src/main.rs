//! Tripwire server binary.
//!
//! Wires up:
//! - Local adapters (filesystem media store, SQLite event store, Twilio)
//! - The ingestion pipeline
//! - The HTTP inbound adapter

use anyhow::Context;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tripwire::adapters::local::http::{self, AppState, IndexPage};
use tripwire::adapters::local::{
    DisabledNotifier, FsMediaStore, SqliteEventRepository, TwilioNotifier,
};
use tripwire::domain::cmd::RealTranscodeExecutor;
use tripwire::ports::notifier::Notifier;
use tripwire::ports::storage::MediaStore;
use tripwire::{Config, IngestService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // 1. Adapters
    let events = Arc::new(
        SqliteEventRepository::open(&config.db_path)
            .await
            .with_context(|| format!("opening event store at {}", config.db_path.display()))?,
    );
    let media: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(&config.data_dir));

    let notifier: Arc<dyn Notifier> = match config.twilio.clone() {
        Some(twilio) => {
            tracing::info!(to = %twilio.to, "sms notifications enabled");
            Arc::new(TwilioNotifier::new(twilio).context("building notification client")?)
        }
        None => {
            tracing::info!("sms notifications disabled, TWILIO_* not fully set");
            Arc::new(DisabledNotifier)
        }
    };

    // 2. Ingestion pipeline
    let mut ingest = IngestService::new(media.clone(), events.clone(), notifier);
    if config.transcode.enabled {
        tracing::info!(ffmpeg = %config.transcode.ffmpeg_bin.display(), "video normalization enabled");
        ingest = ingest.with_transcoder(Arc::new(RealTranscodeExecutor::new(
            &config.transcode.ffmpeg_bin,
        )));
    }

    // 3. HTTP layer
    let page = IndexPage::load(&config.template_dir)
        .await
        .with_context(|| format!("reading templates from {}", config.template_dir.display()))?;

    let state = AppState {
        ingest,
        events,
        media,
        page: Arc::new(page),
        max_upload_bytes: config.max_upload_bytes,
        index_limit: config.index_limit,
    };
    let app = http::router(state).layer(TraceLayer::new_for_http());

    // 4. Serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("binding {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
