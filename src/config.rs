use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_HISTORY_SECS, DEFAULT_INTERVAL_MS, DEFAULT_PROC_ROOT, DEFAULT_REFRESH_MS,
    MAX_HISTORY_POINTS, MAX_HISTORY_SECS,
};
use crate::error::ConfigError;

#[derive(Parser, Debug, Default)]
#[clap(
    name = "proc_io_monitor",
    about = "Samples a process's disk I/O counters and reports read/write throughput"
)]
pub struct Cli {
    /// TOML file with monitor settings. Flags override its values.
    #[clap(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Process to observe. Defaults to this process.
    #[clap(long, short = 'p')]
    pub pid: Option<u32>,

    /// Milliseconds between samples.
    #[clap(long, short = 'i', value_name = "MS")]
    pub interval_ms: Option<u64>,

    #[clap(long, value_name = "DIR")]
    pub proc_root: Option<PathBuf>,

    /// Log rates instead of drawing the dashboard; runs until Ctrl-C.
    #[clap(long)]
    pub headless: bool,

    /// Also print a JSON snapshot per sample to stdout (headless only).
    #[clap(long)]
    pub json: bool,

    #[clap(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    /// Dashboard redraw period.
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    #[serde(default = "default_history_secs")]
    pub history_secs: u64,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_proc_root() -> PathBuf {
    PathBuf::from(DEFAULT_PROC_ROOT)
}

fn default_refresh_ms() -> u64 {
    DEFAULT_REFRESH_MS
}

fn default_history_secs() -> u64 {
    DEFAULT_HISTORY_SECS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pid: None,
            interval_ms: default_interval_ms(),
            proc_root: default_proc_root(),
            refresh_ms: default_refresh_ms(),
            history_secs: default_history_secs(),
            headless: false,
            json: false,
            log_file: None,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file (if any) with command line flags layered on top.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if cli.pid.is_some() {
            config.pid = cli.pid;
        }
        if let Some(interval_ms) = cli.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(proc_root) = &cli.proc_root {
            config.proc_root = proc_root.clone();
        }
        if cli.log_file.is_some() {
            config.log_file = cli.log_file.clone();
        }
        config.headless |= cli.headless;
        config.json |= cli.json;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "interval_ms",
            });
        }
        if self.refresh_ms == 0 {
            return Err(ConfigError::InvalidInterval { field: "refresh_ms" });
        }
        if !(1..=MAX_HISTORY_SECS).contains(&self.history_secs) {
            return Err(ConfigError::InvalidHistory {
                max: MAX_HISTORY_SECS,
            });
        }
        Ok(())
    }

    /// Number of dashboard refreshes kept in the rate history, capped at
    /// [`MAX_HISTORY_POINTS`].
    pub fn history_len(&self) -> usize {
        let points = self.history_secs.saturating_mul(1000) / self.refresh_ms.max(1);
        usize::try_from(points)
            .unwrap_or(usize::MAX)
            .clamp(1, MAX_HISTORY_POINTS)
    }
}
