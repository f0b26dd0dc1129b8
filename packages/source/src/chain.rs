//! Priority-ordered fallback across hazard sources.

use std::sync::Arc;

use hazard_models::HazardFeature;

use crate::progress::ProgressCallback;
use crate::{FetchContext, HazardSource, SourceError, SourceFailure};

/// Result of a successful chain run.
#[derive(Debug)]
pub struct ChainOutcome {
    /// Identifier of the source that produced the features.
    pub source_id: String,
    /// Features from the winning source.
    pub features: Vec<HazardFeature>,
    /// Failed attempts before the winner, in chain order.
    pub failures: Vec<SourceFailure>,
}

/// Tries each source in order and returns the first non-empty result.
///
/// Every attempt is bounded by the source's own timeout. Errors, timeouts,
/// and empty results are recorded as failures and the next source is tried.
///
/// # Errors
///
/// Returns [`SourceError::AllSourcesFailed`] carrying every recorded
/// failure if no source produced features.
pub async fn fetch_first_available(
    sources: &[Box<dyn HazardSource>],
    ctx: &FetchContext,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ChainOutcome, SourceError> {
    let mut failures = Vec::new();
    progress.set_total(sources.len() as u64);

    for (idx, source) in sources.iter().enumerate() {
        let id = source.id().to_string();
        let timeout = source.timeout();
        progress.set_message(format!("trying {id}"));
        log::info!(
            "Trying hazard source {}/{} | id={id} | {}",
            idx + 1,
            sources.len(),
            source.name()
        );

        let error = match tokio::time::timeout(timeout, source.fetch(ctx)).await {
            Ok(Ok(features)) if !features.is_empty() => {
                log::info!("[{id}] succeeded with {} features", features.len());
                progress.finish(format!("{id}: {} features", features.len()));
                return Ok(ChainOutcome {
                    source_id: id,
                    features,
                    failures,
                });
            }
            Ok(Ok(_)) => SourceError::Empty,
            Ok(Err(e)) => e,
            Err(_) => SourceError::Timeout(timeout),
        };

        log::warn!("[{id}] failed: {error}");
        failures.push(SourceFailure {
            source_id: id,
            error,
        });
        progress.inc(1);
    }

    let error = SourceError::AllSourcesFailed { failures };
    log::error!("{error}");
    progress.finish_and_clear();
    Err(error)
}
