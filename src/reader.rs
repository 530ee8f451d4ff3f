use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::error::{ConfigError, ReadError};
use crate::sample::RawSample;

/// Source of raw counter samples.
///
/// Implementations may block on I/O but must not fail: anything that
/// prevents a reading is reported as [`RawSample::UNREADABLE`].
pub trait IoReader: Send + Sync {
    fn read_sample(&self) -> RawSample;
}

impl<R: IoReader + ?Sized> IoReader for Box<R> {
    fn read_sample(&self) -> RawSample {
        (**self).read_sample()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Reads `read_bytes` / `write_bytes` from a Linux `/proc/<pid>/io` file.
pub struct ProcIoReader {
    path: PathBuf,
    clock: fn() -> i64,
}

impl ProcIoReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: now_millis,
        }
    }

    pub fn for_pid(proc_root: &Path, pid: u32) -> Self {
        Self::new(proc_root.join(pid.to_string()).join("io"))
    }

    /// Replaces the wall clock used to timestamp samples.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_read(&self) -> Result<(i64, i64), ReadError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ReadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let (read_bytes, write_bytes) = parse_io_counters(&content);
        let missing = |field| ReadError::MissingField {
            path: self.path.clone(),
            field,
        };
        Ok((
            read_bytes.ok_or_else(|| missing("read_bytes"))?,
            write_bytes.ok_or_else(|| missing("write_bytes"))?,
        ))
    }
}

impl IoReader for ProcIoReader {
    fn read_sample(&self) -> RawSample {
        match self.try_read() {
            Ok((read_bytes, write_bytes)) => RawSample::new((self.clock)(), read_bytes, write_bytes),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Process I/O counters unreadable"
                );
                RawSample::UNREADABLE
            }
        }
    }
}

/// Pulls the `read_bytes` and `write_bytes` values out of a proc io file.
/// Lines that don't parse, including negative or out-of-range values, are
/// ignored; the last valid entry wins.
fn parse_io_counters(content: &str) -> (Option<i64>, Option<i64>) {
    let mut read_bytes = None;
    let mut write_bytes = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        // Counters are non-negative; u64 parsing rejects a leading '-'.
        let value = match value.trim().parse::<u64>().map(i64::try_from) {
            Ok(Ok(v)) => v,
            _ => continue,
        };
        match key.trim() {
            "read_bytes" => read_bytes = Some(value),
            "write_bytes" => write_bytes = Some(value),
            _ => {}
        }
    }

    (read_bytes, write_bytes)
}

/// Picks the process to observe: `requested` if given, otherwise ourselves.
///
/// An explicit pid must exist under `proc_root`; failing that is fatal at
/// startup.
pub fn resolve_pid(proc_root: &Path, requested: Option<u32>) -> Result<u32, ConfigError> {
    let Some(pid) = requested else {
        return Ok(std::process::id());
    };
    if proc_root.join(pid.to_string()).is_dir() {
        Ok(pid)
    } else {
        Err(ConfigError::ProcessNotFound {
            pid,
            proc_root: proc_root.to_path_buf(),
        })
    }
}
