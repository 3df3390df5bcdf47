use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

use crate::errors::AppError;

/// Build a plain-text subscriber that writes one timestamped line per event to
/// `make_writer`, keeping events at `level` and above.
pub fn subscriber_with_writer<W>(make_writer: W, level: Level) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(make_writer)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .finish()
}

/// Build a subscriber appending to the log file at `path`.
///
/// Parent directories are created if missing.
pub fn file_subscriber(
    path: &Path,
    level: Level,
) -> Result<impl Subscriber + Send + Sync + use<>, AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(subscriber_with_writer(Mutex::new(file), level))
}

/// Install the file-backed subscriber as the process-wide default.
pub fn init_file_tracing(path: &Path, level: Level) -> Result<(), AppError> {
    let subscriber = file_subscriber(path, level)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::internal(format!("Failed to install log subscriber: {}", e)))
}
