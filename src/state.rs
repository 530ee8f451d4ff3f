use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use serde::Serialize;

use crate::rate::IoRates;
use crate::sample::{RawSample, SampleWindow};

/// Single holder of the latest [`SampleWindow`].
///
/// Windows are never edited in place. Each update builds a new window and
/// swaps it in with a compare-and-swap, so readers always see a consistent
/// previous/current pair and never wait on the sampler.
pub struct SampleState {
    window: ArcSwap<SampleWindow>,
}

impl SampleState {
    pub fn new() -> Self {
        Self {
            window: ArcSwap::from_pointee(SampleWindow::default()),
        }
    }

    pub fn current(&self) -> SampleWindow {
        **self.window.load()
    }

    /// Slides `sample` into the window. Unreadable samples are dropped
    /// silently so stale values are reported instead of corrupt ones.
    pub fn update(&self, sample: RawSample) {
        if sample.is_unreadable() {
            return;
        }
        self.window.rcu(|window| window.advance(sample));
    }
}

impl Default for SampleState {
    fn default() -> Self {
        Self::new()
    }
}

/// Every derived value at one instant, ready for inspection or export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub since_ms: i64,
    pub window: SampleWindow,
    pub sample_time: IoRates,
    pub accumulated: IoRates,
}

/// Introspection surface for the sampled process.
///
/// Pairs the sample state with the instant monitoring began, which serves
/// as the reference point for lifetime (accumulated) rates.
pub struct IoUsage {
    since_ms: i64,
    state: SampleState,
}

impl IoUsage {
    pub fn new() -> Self {
        Self::with_start(Utc::now().timestamp_millis())
    }

    pub fn with_start(since_ms: i64) -> Self {
        Self {
            since_ms,
            state: SampleState::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn since_ms(&self) -> i64 {
        self.since_ms
    }

    pub fn window(&self) -> SampleWindow {
        self.state.current()
    }

    pub fn update(&self, sample: RawSample) {
        self.state.update(sample);
    }

    pub fn sample_time(&self) -> IoRates {
        IoRates::sample_time(&self.window())
    }

    pub fn accumulated(&self) -> IoRates {
        IoRates::accumulated(self.since_ms, &self.window())
    }

    pub fn sample_time_kb_per_sec_read(&self) -> f64 {
        self.sample_time().read_kb_per_sec
    }

    pub fn sample_time_kb_per_sec_write(&self) -> f64 {
        self.sample_time().write_kb_per_sec
    }

    pub fn sample_time_mb_per_sec_read(&self) -> f64 {
        self.sample_time().read_mb_per_sec
    }

    pub fn sample_time_mb_per_sec_write(&self) -> f64 {
        self.sample_time().write_mb_per_sec
    }

    pub fn accumulated_kb_per_sec_read(&self) -> f64 {
        self.accumulated().read_kb_per_sec
    }

    pub fn accumulated_kb_per_sec_write(&self) -> f64 {
        self.accumulated().write_kb_per_sec
    }

    pub fn accumulated_mb_per_sec_read(&self) -> f64 {
        self.accumulated().read_mb_per_sec
    }

    pub fn accumulated_mb_per_sec_write(&self) -> f64 {
        self.accumulated().write_mb_per_sec
    }

    /// All rates derived from one window load, so they agree with each other.
    pub fn snapshot(&self) -> UsageSnapshot {
        let window = self.window();
        UsageSnapshot {
            since_ms: self.since_ms,
            window,
            sample_time: IoRates::sample_time(&window),
            accumulated: IoRates::accumulated(self.since_ms, &window),
        }
    }
}

impl Default for IoUsage {
    fn default() -> Self {
        Self::new()
    }
}
