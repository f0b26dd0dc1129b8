//! District warning assignment snapshot (`act_warning_assigned`).

use duckdb::Connection;
use hazard_models::{DaySlot, DistrictHazardAssignment, TEXT_FORECAST_DAYS};
use hazard_spatial::normalize::point_to_geojson;

use crate::{DbError, with_transaction};

const CHUNK_SIZE: usize = 1_000;

struct AssignedRow<'a> {
    assignment: &'a DistrictHazardAssignment,
    day: DaySlot,
    condition: Option<&'a str>,
    color: Option<u8>,
}

/// Replaces the assignment snapshot with one row per (district, day slot)
/// of the given assignments. Assignments without a warning contribute
/// nothing.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the previous snapshot is
/// kept.
pub fn replace_assigned_snapshot(
    conn: &Connection,
    assignments: &[DistrictHazardAssignment],
) -> Result<u64, DbError> {
    let rows: Vec<AssignedRow<'_>> = assignments
        .iter()
        .filter_map(|a| a.warning.as_ref().map(|w| (a, w)))
        .flat_map(|(assignment, warning)| {
            DaySlot::range(TEXT_FORECAST_DAYS).filter_map(move |day| {
                warning.day(day).map(|d| AssignedRow {
                    assignment,
                    day,
                    condition: d.condition_text(),
                    color: d.color,
                })
            })
        })
        .collect();

    with_transaction(conn, |conn| {
        conn.execute_batch("DELETE FROM act_warning_assigned;")?;
        let mut total = 0u64;

        for chunk in rows.chunks(CHUNK_SIZE) {
            let values = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO act_warning_assigned (
                    district, indus_circle, indus_circle_name, date, days,
                    condition, color, severity, point
                ) VALUES {values}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut idx = 1usize;

            for row in chunk {
                let a = row.assignment;
                let date = a
                    .warning
                    .as_ref()
                    .and_then(|w| w.date)
                    .map(|d| d.format("%Y-%m-%d").to_string());
                let severity = row
                    .color
                    .and_then(|c| hazard_models::Severity::from_color_code(c).ok())
                    .map(|s| s.to_string());

                stmt.raw_bind_parameter(idx, &a.district)?;
                stmt.raw_bind_parameter(idx + 1, &a.indus_circle)?;
                stmt.raw_bind_parameter(idx + 2, a.circle_name.as_deref())?;
                stmt.raw_bind_parameter(idx + 3, date)?;
                stmt.raw_bind_parameter(idx + 4, row.day.label())?;
                stmt.raw_bind_parameter(idx + 5, row.condition)?;
                stmt.raw_bind_parameter(idx + 6, row.color.map(i16::from))?;
                stmt.raw_bind_parameter(idx + 7, severity)?;
                stmt.raw_bind_parameter(idx + 8, point_to_geojson(&a.point))?;
                idx += 9;
            }

            let inserted = stmt.raw_execute()?;
            total += u64::try_from(inserted).unwrap_or(0);
        }

        log::info!(
            "act_warning_assigned: {total} rows from {} assignments",
            assignments.len()
        );
        Ok(total)
    })
}
