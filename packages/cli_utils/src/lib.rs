#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for `hazard_ingest`.
//!
//! Log lines go through `indicatif-log-bridge` so they print above the
//! progress bars instead of through them.

use std::sync::Arc;
use std::time::Duration;

use hazard_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SOURCES_TEMPLATE: &str = "{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]";
const WRITES_SPINNER_TEMPLATE: &str = "{spinner:.yellow} {msg}";
const WRITES_TEMPLATE: &str = "  {msg} {wide_bar:.yellow/dim} {pos}/{len}";

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// [`ProgressCallback`] rendered as an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied when the total becomes known.
    sized_style: ProgressStyle,
}

impl IndicatifProgress {
    /// One step per source attempted in the fallback chain.
    #[must_use]
    pub fn chain_bar(multi: &MultiProgress, sources: u64) -> Arc<dyn ProgressCallback> {
        let sized_style = bar_style(SOURCES_TEMPLATE);
        let bar = multi.add(ProgressBar::new(sources).with_style(sized_style.clone()));
        bar.set_message("Hazard sources");
        Arc::new(Self { bar, sized_style })
    }

    /// Spins until the router reports how many table writes it will make.
    #[must_use]
    pub fn writes_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let spinner = ProgressStyle::with_template(WRITES_SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = multi.add(ProgressBar::new_spinner().with_style(spinner));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message(message.to_string());

        Arc::new(Self {
            bar,
            sized_style: bar_style(WRITES_TEMPLATE),
        })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.sized_style.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind the
/// progress bridge and returns the [`MultiProgress`] that bars must join.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();
    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_env("RUST_LOG")
        .build();
    let max_level = logger.filter();

    if let Err(e) = indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("Logger already initialised: {e}");
    }
    log::set_max_level(max_level);

    multi
}
