use std::{
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};

use crate::error::PublishError;
use crate::sample::RawSample;
use crate::state::IoUsage;

/// Consumer of each successfully read sample.
///
/// Called once per tick on the sampler thread. Errors are logged by the
/// scheduler and never stop it.
pub trait Publisher: Send + Sync {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError> {
        (**self).publish(sample)
    }
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError> {
        (**self).publish(sample)
    }
}

/// Fans a sample out to every publisher. All of them are attempted; the
/// first error is returned.
impl Publisher for Vec<Box<dyn Publisher>> {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError> {
        let mut first_err = None;
        for publisher in self {
            if let Err(e) = publisher.publish(sample) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Logs the derived rates at info level.
pub struct TracingPublisher {
    usage: Arc<IoUsage>,
}

impl TracingPublisher {
    pub fn new(usage: Arc<IoUsage>) -> Self {
        Self { usage }
    }
}

impl Publisher for TracingPublisher {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError> {
        let snapshot = self.usage.snapshot();
        tracing::info!(
            timestamp_ms = sample.timestamp_ms,
            read_bytes = sample.read_bytes,
            write_bytes = sample.write_bytes,
            read_kb_s = snapshot.sample_time.read_kb_per_sec,
            write_kb_s = snapshot.sample_time.write_kb_per_sec,
            lifetime_read_kb_s = snapshot.accumulated.read_kb_per_sec,
            lifetime_write_kb_s = snapshot.accumulated.write_kb_per_sec,
            "Process I/O sampled"
        );
        Ok(())
    }
}

/// Writes one JSON [`UsageSnapshot`](crate::state::UsageSnapshot) per line.
pub struct JsonLinesPublisher<W> {
    usage: Arc<IoUsage>,
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(usage: Arc<IoUsage>, out: W) -> Self {
        Self {
            usage,
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Publisher for JsonLinesPublisher<W> {
    fn publish(&self, _sample: &RawSample) -> Result<(), PublishError> {
        let line = serde_json::to_string(&self.usage.snapshot())?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}
