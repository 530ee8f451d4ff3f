use serde::Serialize;

/// One timestamped observation of a process's cumulative I/O counters.
///
/// `read_bytes` and `write_bytes` only ever grow for the lifetime of the
/// observed process. A reader that cannot obtain them returns
/// [`RawSample::UNREADABLE`] instead of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RawSample {
    pub timestamp_ms: i64,
    pub read_bytes: i64,
    pub write_bytes: i64,
}

impl RawSample {
    /// Timestamp carried by the unreadable sentinel.
    pub const INVALID_TIMESTAMP: i64 = -1;

    /// Marker for "counters could not be obtained this tick".
    pub const UNREADABLE: RawSample = RawSample {
        timestamp_ms: Self::INVALID_TIMESTAMP,
        read_bytes: i64::MIN,
        write_bytes: i64::MIN,
    };

    pub fn new(timestamp_ms: i64, read_bytes: i64, write_bytes: i64) -> Self {
        Self {
            timestamp_ms,
            read_bytes,
            write_bytes,
        }
    }

    /// A sample is unreadable when both byte counters hold the sentinel,
    /// whatever its timestamp.
    pub fn is_unreadable(&self) -> bool {
        self.read_bytes == i64::MIN && self.write_bytes == i64::MIN
    }
}

/// The previous and current sample, always read and replaced as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SampleWindow {
    pub previous: RawSample,
    pub current: RawSample,
}

impl SampleWindow {
    /// Derives the next window: the old `current` slides into `previous`.
    /// Unreadable samples leave the window as it was.
    pub fn advance(&self, sample: RawSample) -> SampleWindow {
        if sample.is_unreadable() {
            return *self;
        }
        SampleWindow {
            previous: self.current,
            current: sample,
        }
    }

    pub fn read_bytes_delta(&self) -> i64 {
        self.current.read_bytes - self.previous.read_bytes
    }

    pub fn write_bytes_delta(&self) -> i64 {
        self.current.write_bytes - self.previous.write_bytes
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.current.timestamp_ms - self.previous.timestamp_ms
    }
}
