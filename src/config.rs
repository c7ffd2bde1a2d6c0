//! Configuration loaded from the environment (and an optional `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_INDEX_LIMIT: u32 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory holding stored media, served under `/data/`
    pub data_dir: PathBuf,
    /// Directory that may hold an `index.html` page shell
    pub template_dir: PathBuf,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: u64,
    /// Events shown on the index page
    pub index_limit: u32,
    pub transcode: TranscodeConfig,
    /// SMS notification credentials, when all of them are set
    pub twilio: Option<TwilioConfig>,
}

#[derive(Clone, Debug)]
pub struct TranscodeConfig {
    pub enabled: bool,
    pub ffmpeg_bin: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub sid: String,
    pub token: String,
    pub from: String,
    pub to: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| String::from(default));

        Self {
            addr: var("ADDR", "0.0.0.0"),
            port: var("PORT", "8000"),
            db_path: PathBuf::from(var("DATABASE_PATH", "./events.db")),
            data_dir: PathBuf::from(var("DATA_DIR", "./data")),
            template_dir: PathBuf::from(var("TEMPLATE_DIR", "./tmpl")),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            index_limit: parsed(&lookup, "INDEX_LIMIT", DEFAULT_INDEX_LIMIT),
            transcode: TranscodeConfig {
                enabled: parsed(&lookup, "TRANSCODE", true),
                ffmpeg_bin: PathBuf::from(var("FFMPEG_BIN", "ffmpeg")),
            },
            twilio: twilio_from(&lookup),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
    }
}

fn twilio_from(lookup: &impl Fn(&str) -> Option<String>) -> Option<TwilioConfig> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    Some(TwilioConfig {
        sid: non_empty("TWILIO_SID")?,
        token: non_empty("TWILIO_TOKEN")?,
        from: non_empty("TWILIO_FROM")?,
        to: non_empty("TWILIO_TO")?,
    })
}
