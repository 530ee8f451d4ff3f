use std::{
    fs,
    io::Write,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use proc_io_monitor::{
    error::PublishError,
    publish::{JsonLinesPublisher, Publisher},
    reader::{IoReader, ProcIoReader},
    sample::RawSample,
    scheduler::{Scheduler, SchedulerState, ThreadScheduler},
    state::IoUsage,
};

struct FixedReader(RawSample);

impl IoReader for FixedReader {
    fn read_sample(&self) -> RawSample {
        self.0
    }
}

#[derive(Default)]
struct RecordingPublisher {
    calls: AtomicUsize,
    samples: Mutex<Vec<RawSample>>,
}

impl RecordingPublisher {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, sample: &RawSample) -> Result<(), PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.samples.lock().unwrap().push(*sample);
        Ok(())
    }
}

/// Fails every other call and panics on the third.
#[derive(Default)]
struct FlakyPublisher {
    calls: AtomicUsize,
}

impl Publisher for FlakyPublisher {
    fn publish(&self, _sample: &RawSample) -> Result<(), PublishError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 3 {
            panic!("publisher blew up");
        }
        if call % 2 == 1 {
            return Err(PublishError::Io(std::io::Error::other("sink unavailable")));
        }
        Ok(())
    }
}

fn write_proc_io(dir: &Path, read_bytes: i64, write_bytes: i64) {
    let mut file = fs::File::create(dir.join("io")).unwrap();
    write!(
        file,
        "rchar: 1\nwchar: 2\nsyscr: 3\nsyscw: 4\nread_bytes: {read_bytes}\nwrite_bytes: {write_bytes}\ncancelled_write_bytes: 0\n"
    )
    .unwrap();
}

#[test]
fn publishes_at_least_twice_in_five_seconds() {
    let publisher = Arc::new(RecordingPublisher::default());
    let scheduler = ThreadScheduler::new(
        FixedReader(RawSample::new(1000, 18_790_563_840, 2_250_752_000)),
        Arc::clone(&publisher),
        IoUsage::shared(),
        1000,
    );

    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(5000));
    scheduler.stop();

    assert!(publisher.calls() >= 2, "only {} publishes", publisher.calls());
    assert!(publisher
        .samples
        .lock()
        .unwrap()
        .iter()
        .all(|s| s.read_bytes == 18_790_563_840));
}

#[test]
fn no_publish_after_stop() {
    let publisher = Arc::new(RecordingPublisher::default());
    let scheduler = ThreadScheduler::new(
        FixedReader(RawSample::new(1, 1, 1)),
        Arc::clone(&publisher),
        IoUsage::shared(),
        20,
    );

    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(200));
    scheduler.stop();
    let after_stop = publisher.calls();
    assert!(after_stop > 0);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(publisher.calls(), after_stop);

    scheduler.stop();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(scheduler.start().is_err());
}

#[test]
fn failing_ticks_do_not_cancel_the_schedule() {
    let publisher = Arc::new(FlakyPublisher::default());
    let scheduler = ThreadScheduler::new(
        FixedReader(RawSample::new(1, 1, 1)),
        Arc::clone(&publisher),
        IoUsage::shared(),
        10,
    );

    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    scheduler.stop();

    assert!(publisher.calls.load(Ordering::SeqCst) > 4);
}

#[test]
fn dropping_a_running_scheduler_stops_it() {
    let publisher = Arc::new(RecordingPublisher::default());
    {
        let scheduler = ThreadScheduler::new(
            FixedReader(RawSample::new(1, 1, 1)),
            Arc::clone(&publisher),
            IoUsage::shared(),
            20,
        );
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(100));
    }
    let after_drop = publisher.calls();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(publisher.calls(), after_drop);
}

#[test]
fn proc_file_flows_into_published_snapshot() {
    let proc_dir = tempfile::tempdir().unwrap();
    write_proc_io(proc_dir.path(), 1024 * 1024, 0);

    let usage = Arc::new(IoUsage::with_start(0));
    let publisher = Arc::new(JsonLinesPublisher::new(Arc::clone(&usage), Vec::new()));
    let reader = ProcIoReader::new(proc_dir.path().join("io"));
    let scheduler = ThreadScheduler::new(reader, Arc::clone(&publisher), Arc::clone(&usage), 60_000);

    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(200));
    scheduler.stop();
    drop(scheduler);

    let window = usage.window();
    assert_eq!(window.current.read_bytes, 1024 * 1024);
    assert_eq!(window.current.write_bytes, 0);
    assert!(window.current.timestamp_ms > 0);

    let publisher = Arc::try_unwrap(publisher).ok().expect("scheduler released publisher");
    let out = String::from_utf8(publisher.into_inner()).unwrap();
    assert_eq!(out.lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    assert_eq!(value["window"]["current"]["read_bytes"], 1024 * 1024);
}

#[test]
fn vanished_proc_file_keeps_last_window() {
    let proc_dir = tempfile::tempdir().unwrap();
    write_proc_io(proc_dir.path(), 4096, 8192);

    let usage = IoUsage::shared();
    let publisher = Arc::new(RecordingPublisher::default());
    let reader = ProcIoReader::new(proc_dir.path().join("io"));
    let scheduler = ThreadScheduler::new(reader, Arc::clone(&publisher), Arc::clone(&usage), 20);

    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    fs::remove_file(proc_dir.path().join("io")).unwrap();
    thread::sleep(Duration::from_millis(60));
    let calls_after_removal = publisher.calls();
    let window = usage.window();
    thread::sleep(Duration::from_millis(100));
    scheduler.stop();

    assert_eq!(publisher.calls(), calls_after_removal);
    assert_eq!(usage.window(), window);
    assert_eq!(window.current.read_bytes, 4096);
}
