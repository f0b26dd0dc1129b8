#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Day-wise aggregation into [`HazardTypeRecord`]s.
//!
//! Classified rows are grouped by an explicit key and folded into an
//! accumulator per group. Output is ordered by key so repeated runs over
//! the same input produce identical batches. Every record of one run shares
//! a single `insert_at` timestamp.

pub mod cyclone;
pub mod daywise;
pub mod flood;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hazard_models::{DistrictHazardAssignment, HazardType, HazardTypeRecord};

pub use cyclone::aggregate_cyclone;
pub use daywise::aggregate_daywise;
pub use flood::aggregate_flood;

/// Errors raised during aggregation.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// No assignment carries a parseable observation date.
    #[error("No valid date values found in {rows} assigned rows")]
    NoValidDates {
        /// Number of assignments inspected.
        rows: usize,
    },
}

/// Day-1 date of a batch: the observation date of the first assignment
/// that has one.
///
/// # Errors
///
/// Returns [`AggregateError::NoValidDates`] if no assignment has a date.
pub fn base_date(assignments: &[DistrictHazardAssignment]) -> Result<NaiveDate, AggregateError> {
    assignments
        .iter()
        .find_map(|a| a.warning.as_ref().and_then(|w| w.date))
        .ok_or(AggregateError::NoValidDates {
            rows: assignments.len(),
        })
}

/// Groups records by hazard type, preserving record order within a type.
#[must_use]
pub fn by_hazard_type(records: Vec<HazardTypeRecord>) -> BTreeMap<HazardType, Vec<HazardTypeRecord>> {
    let mut map: BTreeMap<HazardType, Vec<HazardTypeRecord>> = BTreeMap::new();
    for record in records {
        map.entry(record.hazard_type).or_default().push(record);
    }
    map
}
