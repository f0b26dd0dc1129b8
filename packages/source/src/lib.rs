#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard source trait and the source acquisition layer.
//!
//! Each physical feed implements [`HazardSource`]. Sources are tried in
//! priority order by [`chain::fetch_first_available`]; the first one that
//! returns a non-empty set of [`HazardFeature`]s wins.

pub mod chain;
pub mod flood;
pub mod html_warning;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod wfs;

use std::time::Duration;

use async_trait::async_trait;
use hazard_models::HazardFeature;
use hazard_source_models::DEFAULT_TIMEOUT_SECS;

/// Errors that can occur while fetching from a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was fetched but is not usable.
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Description of what was wrong.
        message: String,
    },

    /// The source returned no features.
    #[error("Source returned no features")]
    Empty,

    /// The attempt exceeded its time budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Reading from a local table failed.
    #[error("Table read failed: {message}")]
    Table {
        /// Description of what went wrong.
        message: String,
    },

    /// Every source in the chain failed.
    #[error("All {} hazard sources failed: {}", failures.len(), summarize(failures))]
    AllSourcesFailed {
        /// One entry per failed attempt, in chain order.
        failures: Vec<SourceFailure>,
    },
}

/// One failed attempt in the fallback chain.
#[derive(Debug)]
pub struct SourceFailure {
    /// Identifier of the source that failed.
    pub source_id: String,
    /// Why it failed.
    pub error: SourceError,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_id, self.error)
    }
}

fn summarize(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Shared state passed to every fetch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// HTTP client reused across sources.
    pub client: reqwest::Client,
}

impl FetchContext {
    /// Creates a context with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be built.
    pub fn new() -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hazard-forecast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

/// Trait that all hazard sources must implement.
///
/// A source fetches its payload and normalises it into [`HazardFeature`]s.
/// Geometry, when present, is already a WGS84 `MultiPolygon`.
#[async_trait]
pub trait HazardSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"imd_wfs"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Upper bound for one attempt at this source.
    fn timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    /// Fetches and normalises the current warning features.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch or validation fails.
    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<HazardFeature>, SourceError>;
}
