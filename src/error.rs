use std::path::PathBuf;

/// Why a counters file could not be turned into a sample.
///
/// Never escapes the reader: every variant collapses into
/// [`RawSample::UNREADABLE`](crate::sample::RawSample::UNREADABLE).
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no `{field}` entry")]
    MissingField { path: PathBuf, field: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A stopped scheduler is terminal; build a new one instead.
    #[error("scheduler has been stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("sampling interval must be positive")]
    InvalidInterval,

    #[error("failed to spawn sampler thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{field} must be a positive number of milliseconds")]
    InvalidInterval { field: &'static str },

    #[error("history_secs must be between 1 and {max}")]
    InvalidHistory { max: u64 },

    #[error("no process with pid {pid} under {proc_root}")]
    ProcessNotFound { pid: u32, proc_root: PathBuf },
}
