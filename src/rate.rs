//! Throughput arithmetic over byte counters and millisecond timestamps.
//!
//! All functions are pure. Non-positive time spans and shrinking counters
//! yield `0.0` rather than a negative rate.

use serde::Serialize;

use crate::constants::{BYTES_PER_KB, KB_PER_MB, MILLIS_PER_SEC};
use crate::sample::SampleWindow;

/// KB/s between two samples of the same counter.
///
/// A counter that did not grow (or went backwards after a reset) reads as
/// zero throughput.
pub fn delta_rate_kb_per_sec(prev_ms: i64, curr_ms: i64, prev_bytes: i64, curr_bytes: i64) -> f64 {
    if curr_ms <= prev_ms || curr_bytes <= prev_bytes {
        return 0.0;
    }
    let kb = (curr_bytes - prev_bytes) as f64 / BYTES_PER_KB;
    let secs = (curr_ms - prev_ms) as f64 / MILLIS_PER_SEC;
    kb / secs
}

/// KB/s averaged over everything since `since_ms`.
///
/// `curr_bytes` is taken as the whole total accumulated since the reference
/// point, which is assumed to have started at zero bytes.
pub fn accumulated_rate_kb_per_sec(since_ms: i64, curr_ms: i64, curr_bytes: i64) -> f64 {
    if curr_ms <= since_ms {
        return 0.0;
    }
    let kb = curr_bytes as f64 / BYTES_PER_KB;
    let secs = (curr_ms - since_ms) as f64 / MILLIS_PER_SEC;
    kb / secs
}

pub fn kb_to_mb(kb_per_sec: f64) -> f64 {
    kb_per_sec / KB_PER_MB
}

/// Read and write throughput in both units, computed independently per counter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IoRates {
    pub read_kb_per_sec: f64,
    pub write_kb_per_sec: f64,
    pub read_mb_per_sec: f64,
    pub write_mb_per_sec: f64,
}

impl IoRates {
    fn from_kb(read_kb_per_sec: f64, write_kb_per_sec: f64) -> Self {
        Self {
            read_kb_per_sec,
            write_kb_per_sec,
            read_mb_per_sec: kb_to_mb(read_kb_per_sec),
            write_mb_per_sec: kb_to_mb(write_kb_per_sec),
        }
    }

    /// Rates over the span between `previous` and `current`.
    pub fn sample_time(window: &SampleWindow) -> Self {
        let (prev, curr) = (window.previous, window.current);
        Self::from_kb(
            delta_rate_kb_per_sec(prev.timestamp_ms, curr.timestamp_ms, prev.read_bytes, curr.read_bytes),
            delta_rate_kb_per_sec(prev.timestamp_ms, curr.timestamp_ms, prev.write_bytes, curr.write_bytes),
        )
    }

    /// Lifetime rates from `since_ms` up to the current sample.
    pub fn accumulated(since_ms: i64, window: &SampleWindow) -> Self {
        let curr = window.current;
        Self::from_kb(
            accumulated_rate_kb_per_sec(since_ms, curr.timestamp_ms, curr.read_bytes),
            accumulated_rate_kb_per_sec(since_ms, curr.timestamp_ms, curr.write_bytes),
        )
    }
}
