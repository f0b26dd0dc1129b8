//! Text-hazard aggregation per (circle, day, hazard type).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use hazard_classify::{ClassifiedPhrase, SeverityPolicy};
use hazard_models::{DaySlot, HazardType, HazardTypeRecord, Severity};

type GroupKey = (String, DaySlot, HazardType);

#[derive(Default)]
struct Accumulator {
    districts: BTreeSet<String>,
    phrases: BTreeSet<String>,
    /// Severities in encounter order.
    severities: Vec<Severity>,
}

/// Aggregates classified phrases into one record per
/// (circle, day, hazard type).
///
/// Phrases without an observation date are dropped. The record date is
/// `base_date + (day - 1)`; `hazard_value` and `description` are the
/// group's unique phrases, sorted and comma-joined.
#[must_use]
pub fn aggregate_daywise(
    phrases: &[ClassifiedPhrase],
    base_date: NaiveDate,
    policy: SeverityPolicy,
    insert_at: NaiveDateTime,
) -> Vec<HazardTypeRecord> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

    for phrase in phrases.iter().filter(|p| p.date.is_some()) {
        let acc = groups
            .entry((phrase.indus_circle.clone(), phrase.day, phrase.hazard_type))
            .or_default();
        if !phrase.district.trim().is_empty() {
            acc.districts.insert(phrase.district.clone());
        }
        acc.phrases.insert(phrase.phrase.clone());
        acc.severities.push(phrase.severity);
    }

    let records: Vec<HazardTypeRecord> = groups
        .into_iter()
        .filter(|(_, acc)| !acc.districts.is_empty())
        .map(|((indus_circle, day, hazard_type), acc)| {
            let value = acc.phrases.into_iter().collect::<Vec<_>>().join(", ");
            HazardTypeRecord {
                hazard_type,
                indus_circle,
                day,
                date: day.date_from(base_date),
                districts: acc.districts.into_iter().collect(),
                hazard_value: Some(value.clone()),
                description: Some(value),
                severity: policy.pick(acc.severities),
                insert_at,
            }
        })
        .collect();

    log::info!(
        "Aggregated {} phrases into {} day-wise records ({policy})",
        phrases.len(),
        records.len()
    );
    records
}
