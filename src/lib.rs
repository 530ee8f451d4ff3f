//! Samples a process's cumulative disk I/O counters on a fixed schedule and
//! derives read/write throughput from them.
//!
//! A [`scheduler::ThreadScheduler`] pulls a [`sample::RawSample`] from an
//! [`reader::IoReader`] on every tick, slides it into the shared
//! [`state::IoUsage`], then hands it to a [`publish::Publisher`]. Rates are
//! recomputed from the held window whenever someone asks for them.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod publish;
pub mod rate;
pub mod reader;
pub mod sample;
pub mod scheduler;
pub mod state;
pub mod ui;
pub mod util;
