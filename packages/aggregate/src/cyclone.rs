//! Cyclone table aggregation per (circle, day, phrase).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use hazard_classify::ClassifierConfig;
use hazard_classify::cyclone::CyclonePhrase;
use hazard_models::{DaySlot, HazardType, HazardTypeRecord, Severity};

#[derive(Default)]
struct Accumulator {
    districts: BTreeSet<String>,
    first_admitted_color: Option<u8>,
}

/// Aggregates cyclone phrases into one record per (circle, day, phrase).
///
/// Rows without a forecast date are dropped before grouping. Only admitted
/// phrases contribute districts and colour. A phrase with no
/// admitted rows still yields a record, with no severity and an empty
/// district list. Null-hazard sentinels yield no hazard value or
/// description.
#[must_use]
pub fn aggregate_cyclone(
    phrases: &[CyclonePhrase],
    base_date: NaiveDate,
    config: &ClassifierConfig,
    insert_at: NaiveDateTime,
) -> Vec<HazardTypeRecord> {
    let mut groups: BTreeMap<(String, DaySlot, String), Accumulator> = BTreeMap::new();
    let mut undated = 0usize;

    for row in phrases {
        if row.date.is_none() {
            undated += 1;
            continue;
        }

        let acc = groups
            .entry((row.indus_circle.clone(), row.day, row.phrase.clone()))
            .or_default();
        if !row.admitted {
            continue;
        }
        acc.districts.insert(row.district.clone());
        if acc.first_admitted_color.is_none() {
            acc.first_admitted_color = row.color;
        }
    }

    let records: Vec<HazardTypeRecord> = groups
        .into_iter()
        .map(|((indus_circle, day, phrase), acc)| {
            let value = (!config.is_null_hazard(&phrase)).then_some(phrase);
            HazardTypeRecord {
                hazard_type: HazardType::Cyclone,
                indus_circle,
                day,
                date: day.date_from(base_date),
                districts: acc.districts.into_iter().collect(),
                hazard_value: value.clone(),
                description: value,
                severity: acc
                    .first_admitted_color
                    .and_then(|c| Severity::from_color_code(c).ok()),
                insert_at,
            }
        })
        .collect();

    if undated > 0 {
        log::debug!("Dropped {undated} cyclone phrases without a forecast date");
    }
    log::info!(
        "Aggregated {} cyclone phrases into {} records",
        phrases.len() - undated,
        records.len()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    fn now() -> NaiveDateTime {
        base().and_hms_opt(3, 0, 0).unwrap()
    }

    fn row(district: &str, day: u8, phrase: &str, color: Option<u8>, admitted: bool) -> CyclonePhrase {
        CyclonePhrase {
            indus_circle: "AP".to_string(),
            district: district.to_string(),
            day: DaySlot::new(day).unwrap(),
            date: Some(base()),
            phrase: phrase.to_string(),
            color,
            admitted,
        }
    }

    #[test]
    fn admitted_rows_contribute_districts_and_first_colour() {
        let config = ClassifierConfig::embedded();
        let rows = vec![
            row("Visakhapatnam", 1, "Heavy Rain", Some(2), true),
            row("East Godavari", 1, "Heavy Rain", Some(1), true),
            row("Krishna", 1, "Heavy Rain", Some(4), false),
        ];
        let records = aggregate_cyclone(&rows, base(), &config, now());

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.hazard_type, HazardType::Cyclone);
        assert_eq!(
            r.districts,
            vec!["East Godavari".to_string(), "Visakhapatnam".to_string()]
        );
        assert_eq!(r.severity, Some(Severity::High));
        assert_eq!(r.hazard_value.as_deref(), Some("Heavy Rain"));
    }

    #[test]
    fn non_admitted_phrase_still_yields_a_record() {
        let config = ClassifierConfig::embedded();
        let rows = vec![row("Krishna", 2, "Fog", Some(1), false)];
        let records = aggregate_cyclone(&rows, base(), &config, now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, None);
        assert!(records[0].districts.is_empty());
        assert_eq!(records[0].district_list(), None);
        assert_eq!(records[0].hazard_value.as_deref(), Some("Fog"));
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 10, 21).unwrap());
    }

    #[test]
    fn undated_rows_are_dropped_before_grouping() {
        let config = ClassifierConfig::embedded();
        let mut undated = row("Guntur", 1, "Heavy Rain", Some(1), true);
        undated.date = None;
        let mut undated_only = row("Guntur", 1, "Squall", Some(1), true);
        undated_only.date = None;
        let rows = vec![
            undated,
            row("Visakhapatnam", 1, "Heavy Rain", Some(2), true),
            undated_only,
        ];
        let records = aggregate_cyclone(&rows, base(), &config, now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].districts, vec!["Visakhapatnam".to_string()]);
        assert_eq!(records[0].severity, Some(Severity::High));
    }

    #[test]
    fn null_hazard_sentinel_has_no_value() {
        let config = ClassifierConfig::embedded();
        let rows = vec![row("Krishna", 1, "No Warning", Some(4), false)];
        let records = aggregate_cyclone(&rows, base(), &config, now());

        assert_eq!(records[0].hazard_value, None);
        assert_eq!(records[0].description, None);
    }
}
