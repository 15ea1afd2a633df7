use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

pub(crate) const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// File name of the operation database inside the data directory.
pub(crate) const DB_FILE_NAME: &str = "bridge.db";
