//! Local adapters for a single host deployment.

pub mod fs;
pub mod http;
pub mod sqlite;
pub mod twilio;

pub use fs::FsMediaStore;
pub use sqlite::SqliteEventRepository;
pub use twilio::{DisabledNotifier, TwilioNotifier};
