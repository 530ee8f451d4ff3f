use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, RecvTimeoutError, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::error::{PublishError, SchedulerError};
use crate::publish::Publisher;
use crate::reader::IoReader;
use crate::state::IoUsage;

/// Periodic driver of the sample → state → publish cycle.
///
/// Lifecycle is `Created → Running → Stopped`. Stopped is terminal.
pub trait Scheduler {
    /// Starts ticking every `interval_ms`, first tick immediately. Calling
    /// it while running replaces the current ticker.
    fn start_with_interval(&self, interval_ms: u64) -> Result<(), SchedulerError>;

    /// Starts with the interval given at construction.
    fn start(&self) -> Result<(), SchedulerError>;

    /// Cancels future ticks and releases the worker. Idempotent.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Running,
    Stopped,
}

enum Lifecycle {
    Created,
    Running(Worker),
    Stopped,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Signals the worker and waits for it, unless called from the worker
    /// itself (e.g. a publisher stopping its own scheduler), where joining
    /// would deadlock. The worker then exits after the current tick.
    fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            tracing::error!("Sampler thread panicked outside a tick");
        }
    }
}

enum TickOutcome {
    Published,
    Skipped,
}

struct Sampler<R, P> {
    reader: R,
    publisher: P,
    usage: Arc<IoUsage>,
}

impl<R: IoReader, P: Publisher> Sampler<R, P> {
    fn sample_once(&self) -> Result<TickOutcome, PublishError> {
        let sample = self.reader.read_sample();
        if sample.is_unreadable() {
            return Ok(TickOutcome::Skipped);
        }
        self.usage.update(sample);
        self.publisher.publish(&sample)?;
        Ok(TickOutcome::Published)
    }

    /// Runs one tick. Nothing a tick does, error or panic, escapes it.
    fn tick(&self) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.sample_once())) {
            Ok(Ok(TickOutcome::Published)) => tracing::debug!("Sample published"),
            // The reader has already warned with its source path.
            Ok(Ok(TickOutcome::Skipped)) => tracing::debug!("Tick skipped, no sample"),
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to publish process I/O sample"),
            Err(_) => tracing::error!("Sampling tick panicked"),
        }
    }
}

/// Runs ticks on one dedicated thread at a fixed rate.
///
/// Tick `n` is due at `start + n * interval`. A tick that overruns makes the
/// next one fire immediately; ticks never overlap.
pub struct ThreadScheduler<R, P> {
    sampler: Arc<Sampler<R, P>>,
    default_interval_ms: u64,
    lifecycle: Mutex<Lifecycle>,
}

impl<R, P> ThreadScheduler<R, P>
where
    R: IoReader + 'static,
    P: Publisher + 'static,
{
    pub fn new(reader: R, publisher: P, usage: Arc<IoUsage>, default_interval_ms: u64) -> Self {
        Self {
            sampler: Arc::new(Sampler {
                reader,
                publisher,
                usage,
            }),
            default_interval_ms,
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    pub fn usage(&self) -> Arc<IoUsage> {
        Arc::clone(&self.sampler.usage)
    }

    pub fn state(&self) -> SchedulerState {
        match *self.lock_lifecycle() {
            Lifecycle::Created => SchedulerState::Created,
            Lifecycle::Running(_) => SchedulerState::Running,
            Lifecycle::Stopped => SchedulerState::Stopped,
        }
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_worker(&self, interval: Duration) -> Result<Worker, SchedulerError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let sampler = Arc::clone(&self.sampler);

        let handle = thread::Builder::new()
            .name("proc-io-sampler".to_string())
            .spawn(move || {
                let mut next = Instant::now();
                loop {
                    sampler.tick();
                    next += interval;
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("Sampler thread exiting");
            })
            .map_err(SchedulerError::Spawn)?;

        Ok(Worker { stop_tx, handle })
    }
}

impl<R, P> Scheduler for ThreadScheduler<R, P>
where
    R: IoReader + 'static,
    P: Publisher + 'static,
{
    fn start_with_interval(&self, interval_ms: u64) -> Result<(), SchedulerError> {
        if interval_ms == 0 {
            return Err(SchedulerError::InvalidInterval);
        }
        let mut lifecycle = self.lock_lifecycle();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Created) {
            Lifecycle::Stopped => {
                *lifecycle = Lifecycle::Stopped;
                return Err(SchedulerError::AlreadyStopped);
            }
            Lifecycle::Running(worker) => {
                tracing::info!("Restarting sampler with new interval");
                worker.shutdown();
            }
            Lifecycle::Created => {}
        }

        let worker = self.spawn_worker(Duration::from_millis(interval_ms))?;
        *lifecycle = Lifecycle::Running(worker);
        tracing::info!(interval_ms, "Process I/O sampler started");
        Ok(())
    }

    fn start(&self) -> Result<(), SchedulerError> {
        self.start_with_interval(self.default_interval_ms)
    }

    fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_lifecycle(), Lifecycle::Stopped);
        // Shut down outside the lock so a tick calling stop() can't deadlock.
        if let Lifecycle::Running(worker) = previous {
            worker.shutdown();
            tracing::info!("Process I/O sampler stopped");
        }
    }
}

impl<R, P> Drop for ThreadScheduler<R, P> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Running(worker) = std::mem::replace(lifecycle, Lifecycle::Stopped) {
            worker.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::RawSample;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};

    struct StepReader(AtomicI64);

    impl IoReader for StepReader {
        fn read_sample(&self) -> RawSample {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            RawSample::new(n * 1000, n * 1024, n * 2048)
        }
    }

    struct Unreadable;

    impl IoReader for Unreadable {
        fn read_sample(&self) -> RawSample {
            RawSample::UNREADABLE
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Publisher for Counter {
        fn publish(&self, _sample: &RawSample) -> Result<(), PublishError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Stops the scheduler that drives it on its first publish.
    #[derive(Default)]
    struct StopsOwnScheduler {
        calls: AtomicUsize,
        scheduler: OnceLock<Weak<dyn Scheduler + Send + Sync>>,
    }

    impl Publisher for StopsOwnScheduler {
        fn publish(&self, _sample: &RawSample) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(scheduler) = self.scheduler.get().and_then(Weak::upgrade) {
                scheduler.stop();
            }
            Ok(())
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn first_tick_is_immediate() {
        let counter = Arc::new(Counter::default());
        let scheduler = ThreadScheduler::new(
            StepReader(AtomicI64::new(0)),
            Arc::clone(&counter),
            IoUsage::shared(),
            60_000,
        );
        scheduler.start().unwrap();

        assert!(wait_for(|| counter.0.load(Ordering::SeqCst) == 1));
        assert_eq!(scheduler.usage().window().current, RawSample::new(1000, 1024, 2048));
        scheduler.stop();
    }

    #[test]
    fn state_transitions() {
        let scheduler = ThreadScheduler::new(
            StepReader(AtomicI64::new(0)),
            Counter::default(),
            IoUsage::shared(),
            60_000,
        );
        assert_eq!(scheduler.state(), SchedulerState::Created);
        scheduler.start().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        scheduler.start_with_interval(30_000).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        scheduler.stop();
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyStopped)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let scheduler = ThreadScheduler::new(
            StepReader(AtomicI64::new(0)),
            Counter::default(),
            IoUsage::shared(),
            60_000,
        );
        assert!(matches!(
            scheduler.start_with_interval(0),
            Err(SchedulerError::InvalidInterval)
        ));
        assert_eq!(scheduler.state(), SchedulerState::Created);
    }

    #[test]
    fn unreadable_samples_are_not_published() {
        let counter = Arc::new(Counter::default());
        let usage = IoUsage::shared();
        let scheduler =
            ThreadScheduler::new(Unreadable, Arc::clone(&counter), Arc::clone(&usage), 10);
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        assert_eq!(usage.window(), Default::default());
    }

    #[test]
    fn stop_from_inside_a_tick_does_not_deadlock() {
        let publisher = Arc::new(StopsOwnScheduler::default());
        let scheduler = Arc::new(ThreadScheduler::new(
            StepReader(AtomicI64::new(0)),
            Arc::clone(&publisher),
            IoUsage::shared(),
            10,
        ));
        let weak: Weak<dyn Scheduler + Send + Sync> = Arc::downgrade(&scheduler) as Weak<_>;
        assert!(publisher.scheduler.set(weak).is_ok());

        scheduler.start().unwrap();
        assert!(wait_for(|| scheduler.state() == SchedulerState::Stopped));
        thread::sleep(Duration::from_millis(100));

        assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        scheduler.stop();
    }

    #[test]
    fn restart_leaves_a_single_worker() {
        let counter = Arc::new(Counter::default());
        let scheduler = ThreadScheduler::new(
            StepReader(AtomicI64::new(0)),
            Arc::clone(&counter),
            IoUsage::shared(),
            10,
        );
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        scheduler.start_with_interval(200).unwrap();
        let before = counter.0.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(500));
        scheduler.stop();

        // One 200 ms worker ticks at 0, 200 and 400 ms. A surviving 10 ms
        // worker would add dozens more.
        let ticks = counter.0.load(Ordering::SeqCst) - before;
        assert!((2..=4).contains(&ticks), "{ticks} ticks after restart");
    }
}
