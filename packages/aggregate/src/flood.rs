//! Flood aggregation with circle × day matrix completion.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use hazard_classify::flood::FloodAlert;
use hazard_models::{DaySlot, FLOOD_FORECAST_DAYS, HazardType, HazardTypeRecord, Severity};

/// Aggregates flood alerts per (circle, day, severity), then walks every
/// known circle × day 1..7 and emits one record where an alert group
/// exists.
///
/// When several severities alert for the same circle and day, the most
/// severe group is emitted. Record dates are `run_date + (day - 1)`.
#[must_use]
pub fn aggregate_flood(
    alerts: &[FloodAlert],
    circles: &[String],
    run_date: NaiveDate,
    insert_at: NaiveDateTime,
) -> Vec<HazardTypeRecord> {
    let mut groups: BTreeMap<(String, DaySlot, Severity), BTreeSet<String>> = BTreeMap::new();
    for alert in alerts {
        groups
            .entry((alert.indus_circle.clone(), alert.day, alert.severity))
            .or_default()
            .insert(alert.district.clone());
    }

    let known: BTreeSet<&String> = circles.iter().collect();
    for circle in groups.keys().map(|(c, _, _)| c) {
        if !known.contains(circle) {
            log::warn!("Flood alert for circle {circle} outside the district reference; skipped");
        }
    }

    let mut records = Vec::new();
    for circle in known {
        for day in DaySlot::range(FLOOD_FORECAST_DAYS) {
            let worst = Severity::all().iter().find_map(|&severity| {
                groups
                    .get(&(circle.clone(), day, severity))
                    .map(|districts| (severity, districts))
            });
            let Some((severity, districts)) = worst else {
                continue;
            };

            let label = severity.to_string();
            records.push(HazardTypeRecord {
                hazard_type: HazardType::Flood,
                indus_circle: circle.clone(),
                day,
                date: day.date_from(run_date),
                districts: districts.iter().cloned().collect(),
                description: Some(format!("{label} flood/inflow risk")),
                hazard_value: Some(label),
                severity: Some(severity),
                insert_at,
            });
        }
    }

    log::info!(
        "Flood matrix: {} alerts over {} circles produced {} records",
        alerts.len(),
        circles.len(),
        records.len()
    );
    records
}
