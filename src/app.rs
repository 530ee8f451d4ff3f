use std::time::Instant;

use chrono::{DateTime, Local};

use crate::rate::IoRates;
use crate::state::{IoUsage, UsageSnapshot};

/// Highest rate seen and when it was first seen.
#[derive(Debug, Clone, Copy)]
pub struct PeakRecord {
    pub kb_per_sec: f64,
    pub at: DateTime<Local>,
}

impl PeakRecord {
    fn new() -> Self {
        Self {
            kb_per_sec: 0.0,
            at: Local::now(),
        }
    }

    fn offer(&mut self, kb_per_sec: f64) {
        if kb_per_sec > self.kb_per_sec {
            self.kb_per_sec = kb_per_sec;
            self.at = Local::now();
        }
    }
}

/// Dashboard state, refreshed from the shared [`IoUsage`] on every redraw.
pub struct App {
    pub pid: u32,
    pub interval_ms: u64,
    pub read_history: Vec<f64>,
    pub write_history: Vec<f64>,
    pub peak_read: PeakRecord,
    pub peak_write: PeakRecord,
    pub snapshot: UsageSnapshot,
    pub last_tick: Instant,
}

impl App {
    pub fn new(pid: u32, interval_ms: u64, history_len: usize, usage: &IoUsage) -> App {
        App {
            pid,
            interval_ms,
            read_history: vec![0.0; history_len],
            write_history: vec![0.0; history_len],
            peak_read: PeakRecord::new(),
            peak_write: PeakRecord::new(),
            snapshot: usage.snapshot(),
            last_tick: Instant::now(),
        }
    }

    pub fn on_tick(&mut self, usage: &IoUsage) {
        self.snapshot = usage.snapshot();
        let rates = self.snapshot.sample_time;

        self.read_history.remove(0);
        self.read_history.push(rates.read_kb_per_sec);
        self.write_history.remove(0);
        self.write_history.push(rates.write_kb_per_sec);

        self.peak_read.offer(rates.read_kb_per_sec);
        self.peak_write.offer(rates.write_kb_per_sec);
    }

    pub fn sample_time(&self) -> IoRates {
        self.snapshot.sample_time
    }

    pub fn accumulated(&self) -> IoRates {
        self.snapshot.accumulated
    }

    /// Cumulative counters from the latest sample.
    pub fn totals(&self) -> (i64, i64) {
        let current = self.snapshot.window.current;
        (current.read_bytes, current.write_bytes)
    }

    pub fn has_sample(&self) -> bool {
        self.snapshot.window.current.timestamp_ms > 0
    }
}
