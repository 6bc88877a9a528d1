//! Run log files.
//!
//! Each invocation writes its tracing events to a fresh log file named with
//! the run timestamp, e.g. `logs/dirsort_20240301_120000.log`. Terminal
//! output stays with [`crate::output::OutputFormatter`]; the log file is the
//! durable, greppable record of what a run did.

use chrono::Local;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber writing to a timestamped file
/// under `log_dir`.
///
/// Returns the appender guard that must stay alive for the duration of the
/// process, or `None` when the log file cannot be created or a subscriber is
/// already installed; logging failures never stop a run.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    if fs::create_dir_all(log_dir).is_err() {
        return None;
    }

    let file_name = format!("dirsort_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let file = fs::File::create(log_dir.join(file_name)).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok();

    installed.then_some(guard)
}
