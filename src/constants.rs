pub const DEFAULT_INTERVAL_MS: u64 = 60_000; // sample once a minute
pub const DEFAULT_REFRESH_MS: u64 = 500;
pub const DEFAULT_HISTORY_SECS: u64 = 60;
pub const MAX_HISTORY_SECS: u64 = 3_600;
pub const MAX_HISTORY_POINTS: usize = 10_000;
pub const DEFAULT_PROC_ROOT: &str = "/proc";

pub const BYTES_PER_KB: f64 = 1024.0;
pub const KB_PER_MB: f64 = 1024.0;
pub const MILLIS_PER_SEC: f64 = 1000.0;
