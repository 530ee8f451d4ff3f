use std::{
    fs::File,
    io,
    sync::{mpsc, Arc, Mutex},
};

use anyhow::{Context, Result};
use clap::Parser;

use proc_io_monitor::{
    config::{Cli, MonitorConfig},
    logging,
    publish::{JsonLinesPublisher, Publisher, TracingPublisher},
    reader::{resolve_pid, ProcIoReader},
    scheduler::{Scheduler, ThreadScheduler},
    state::IoUsage,
    ui,
};

// The dashboard owns the terminal, so without a log file its logs are dropped.
fn init_logging(config: &MonitorConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(logging::env_filter());

    match &config.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if config.headless => builder.with_writer(io::stderr).init(),
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

fn wait_for_ctrl_c() -> Result<()> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let _ = rx.recv();
    tracing::info!("Shutting down gracefully");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MonitorConfig::from_cli(&cli)?;
    init_logging(&config)?;

    let pid = resolve_pid(&config.proc_root, config.pid)?;
    let reader = ProcIoReader::for_pid(&config.proc_root, pid);
    tracing::info!(
        pid,
        path = %reader.path().display(),
        interval_ms = config.interval_ms,
        "proc_io_monitor starting"
    );

    let usage = IoUsage::shared();
    let mut publishers: Vec<Box<dyn Publisher>> =
        vec![Box::new(TracingPublisher::new(Arc::clone(&usage)))];
    if config.headless && config.json {
        publishers.push(Box::new(JsonLinesPublisher::new(Arc::clone(&usage), io::stdout())));
    }

    let scheduler = ThreadScheduler::new(reader, publishers, Arc::clone(&usage), config.interval_ms);
    scheduler.start()?;

    let outcome = if config.headless {
        wait_for_ctrl_c()
    } else {
        ui::run(Arc::clone(&usage), &config, pid).context("dashboard failed")
    };

    scheduler.stop();
    outcome
}
