//! Step progress for multi-output builds.
//!
//! The pipeline reports one unit per output file through
//! [`ProgressCallback`]. The CLI renders it as an `indicatif` bar,
//! [`LogProgress`] writes it to the log and [`NullProgress`] drops it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives step updates from a running build.
pub trait ProgressCallback: Send + Sync {
    /// Set the number of steps the build will run.
    fn set_total(&self, total: u64);

    /// Describe the step about to run.
    fn set_message(&self, msg: String);

    /// Mark `delta` steps as done.
    fn inc(&self, delta: u64);

    /// Mark the build as complete with a summary.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_message(&self, _msg: String) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Logs each step as `[done/total] message` at info level.
#[derive(Default)]
pub struct LogProgress {
    total: AtomicU64,
    done: AtomicU64,
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    fn set_message(&self, msg: String) {
        log::info!(
            "[{}/{}] {msg}",
            self.done.load(Ordering::Relaxed) + 1,
            self.total.load(Ordering::Relaxed)
        );
    }

    fn inc(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::Relaxed);
    }

    fn finish(&self, msg: String) {
        log::info!("{msg}");
    }
}
