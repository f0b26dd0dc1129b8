//! Text classification path.
//!
//! Each assignment's day slots are exploded into phrases; a phrase becomes
//! a [`ClassifiedPhrase`] only if the day has both text and a colour and
//! the phrase matches the keyword table.

use chrono::NaiveDate;
use hazard_models::{DaySlot, DistrictHazardAssignment, HazardType, Severity, TEXT_FORECAST_DAYS};

use crate::config::ClassifierConfig;
use crate::keywords::KeywordTable;

/// One phrase of one district's day slot, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPhrase {
    pub indus_circle: String,
    pub district: String,
    pub day: DaySlot,
    /// Observation date of the warning (day 1).
    pub date: Option<NaiveDate>,
    pub hazard_type: HazardType,
    /// The trimmed phrase that matched.
    pub phrase: String,
    pub color: u8,
    /// Severity resolved from `color`.
    pub severity: Severity,
}

/// Explodes and classifies every day slot of every assignment.
///
/// Output preserves assignment order, then day order, then phrase order.
#[must_use]
pub fn classify_assignments(
    assignments: &[DistrictHazardAssignment],
    config: &ClassifierConfig,
) -> Vec<ClassifiedPhrase> {
    let table = KeywordTable::new(&config.hazards);
    let mut out = Vec::new();
    let mut dropped = 0usize;

    for assignment in assignments {
        let Some(warning) = assignment.warning.as_ref() else {
            continue;
        };

        for slot in DaySlot::range(TEXT_FORECAST_DAYS) {
            let Some(day) = warning.day(slot) else {
                continue;
            };
            let (Some(text), Some(color)) = (day.condition_text(), day.color) else {
                continue;
            };

            for phrase in config.separator.split(text) {
                let Some(hazard_type) = table.detect(&phrase) else {
                    dropped += 1;
                    continue;
                };
                out.push(ClassifiedPhrase {
                    indus_circle: assignment.indus_circle.clone(),
                    district: assignment.district.clone(),
                    day: slot,
                    date: warning.date,
                    hazard_type,
                    phrase,
                    color,
                    severity: config.severity_for_color(color),
                });
            }
        }
    }

    log::debug!(
        "Classified {} phrases from {} assignments ({dropped} unmatched)",
        out.len(),
        assignments.len()
    );
    out
}

/// Re-runs classification over already-exploded phrases.
///
/// Atomic phrases split into themselves and detect the same hazard, so
/// this returns its input unchanged.
#[must_use]
pub fn reclassify(phrases: &[ClassifiedPhrase], config: &ClassifierConfig) -> Vec<ClassifiedPhrase> {
    let table = KeywordTable::new(&config.hazards);

    phrases
        .iter()
        .flat_map(|p| {
            config
                .separator
                .split(&p.phrase)
                .into_iter()
                .filter_map(|phrase| {
                    let hazard_type = table.detect(&phrase)?;
                    Some(ClassifiedPhrase {
                        hazard_type,
                        phrase,
                        severity: config.severity_for_color(p.color),
                        ..p.clone()
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
