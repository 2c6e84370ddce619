#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the Share2Care binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines are suspended while a build's [`StepsBar`] redraws.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use share2care_pipeline::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` bar counting pipeline steps (one per output file).
pub struct StepsBar {
    bar: ProgressBar,
}

impl StepsBar {
    /// Adds a step bar to `multi`. The length is set by the pipeline via
    /// [`ProgressCallback::set_total`].
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Arc<Self> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::with_template("{msg:<50} {wide_bar:.green/dim} {pos}/{len} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Arc::new(Self { bar })
    }
}

impl ProgressCallback for StepsBar {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes `pretty_env_logger` (filtered by `RUST_LOG`, defaulting to
/// `info`) behind `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    }
    let logger = builder.build();
    let level = logger.filter();

    // Already set in tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
