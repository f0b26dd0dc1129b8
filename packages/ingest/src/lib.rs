#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Orchestration of the hazard forecast pipeline.
//!
//! Each run fetches one snapshot of warning data through the source
//! fallback chain, joins it against district reference geometry,
//! classifies and aggregates it into day-wise records, and hands the
//! records to the persistence router.

pub mod config;
pub mod pipeline;

use hazard_aggregate::AggregateError;
use hazard_classify::ClassifyError;
use hazard_database::DbError;
use hazard_source::SourceError;

pub use config::PipelineConfig;
pub use pipeline::{Engines, RunOptions, RunProgress, RunSummary, SourceChain};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source acquisition failed (including every source failing).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Classifier configuration is invalid.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// Aggregation could not proceed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Database error outside per-table writes.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration file is malformed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
