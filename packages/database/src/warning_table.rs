//! Raw warning snapshot (`act_warning`).
//!
//! After the fallback chain succeeds, the winning features are written
//! here with truncate-then-insert. The table doubles as the last-resort
//! source of the chain ([`WarningTableSource`]).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::Connection;
use hazard_models::{DayWarning, DistrictWarning, HazardFeature, TEXT_FORECAST_DAYS};
use hazard_source::{FetchContext, HazardSource, SourceError};
use hazard_source_models::{FetcherConfig, SourceDefinition};
use hazard_spatial::normalize::{multipolygon_to_geojson, parse_geojson_to_multipolygon};

use crate::schema::act_warning_ddl;
use crate::{DbError, check_identifier, with_transaction};

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 500;

#[allow(clippy::cast_lossless)]
const COLUMNS_PER_ROW: usize = 3 + 3 * TEXT_FORECAST_DAYS as usize + 1;

fn column_list() -> String {
    let n = TEXT_FORECAST_DAYS;
    let mut cols = vec!["district_id".to_string(), "district".to_string(), "date".to_string()];
    cols.extend((1..=n).map(|i| format!("day_{i}")));
    cols.extend((1..=n).map(|i| format!("day{i}_text")));
    cols.extend((1..=n).map(|i| format!("day{i}_color")));
    cols.push("geom".to_string());
    cols.join(", ")
}

/// Replaces the contents of a warning snapshot table with `features`.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the table is left as it
/// was.
pub fn replace_warning_snapshot(
    conn: &Connection,
    table: &str,
    features: &[HazardFeature],
) -> Result<u64, DbError> {
    let table = check_identifier(table)?;
    conn.execute_batch(&act_warning_ddl(table))?;

    with_transaction(conn, |conn| {
        conn.execute_batch(&format!("DELETE FROM {table};"))?;

        let placeholders = format!("({})", vec!["?"; COLUMNS_PER_ROW].join(", "));
        let mut total = 0u64;

        for chunk in features.chunks(CHUNK_SIZE) {
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES {}",
                column_list(),
                vec![placeholders.as_str(); chunk.len()].join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut idx = 1usize;

            for feature in chunk {
                let w = &feature.warning;
                stmt.raw_bind_parameter(idx, w.district_id)?;
                stmt.raw_bind_parameter(idx + 1, w.district.as_deref())?;
                stmt.raw_bind_parameter(idx + 2, w.date.map(|d| d.format("%Y-%m-%d").to_string()))?;
                idx += 3;

                let days: Vec<DayWarning> = (0..usize::from(TEXT_FORECAST_DAYS))
                    .map(|i| w.days.get(i).cloned().unwrap_or_default())
                    .collect();
                for day in &days {
                    stmt.raw_bind_parameter(idx, day.condition.as_deref())?;
                    idx += 1;
                }
                for day in &days {
                    stmt.raw_bind_parameter(idx, day.text.as_deref())?;
                    idx += 1;
                }
                for day in &days {
                    stmt.raw_bind_parameter(idx, day.color.map(i16::from))?;
                    idx += 1;
                }

                stmt.raw_bind_parameter(idx, feature.geometry.as_ref().map(multipolygon_to_geojson))?;
                idx += 1;
            }

            let rows = stmt.raw_execute()?;
            total += u64::try_from(rows).unwrap_or(0);
        }

        log::info!("{table}: replaced snapshot with {total} rows");
        Ok(total)
    })
}

/// Reads a warning snapshot table back into features, one per district
/// id. Rows without their own geometry take the `imd_district` boundary.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn read_warning_snapshot(conn: &Connection, table: &str) -> Result<Vec<HazardFeature>, DbError> {
    let table = check_identifier(table)?;
    let n = TEXT_FORECAST_DAYS;
    let day_cols = (1..=n)
        .map(|i| format!("hw.day_{i}"))
        .chain((1..=n).map(|i| format!("hw.day{i}_text")))
        .chain((1..=n).map(|i| format!("hw.day{i}_color")))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT DISTINCT ON (hw.district_id)
            hw.district_id, hw.district, CAST(hw.date AS VARCHAR), {day_cols},
            COALESCE(hw.geom, d.geom)
         FROM {table} hw
         LEFT JOIN imd_district d ON hw.district_id = d.district_id
         WHERE hw.district_id <> 0
         ORDER BY hw.district_id"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let days = usize::from(n);
    let mut features = Vec::new();

    while let Some(row) = rows.next()? {
        let district_id: Option<i64> = row.get(0)?;
        let district: Option<String> = row.get(1)?;
        let date: Option<String> = row.get(2)?;

        let mut day_warnings = Vec::with_capacity(days);
        for i in 0..days {
            let condition: Option<String> = row.get(3 + i)?;
            let text: Option<String> = row.get(3 + days + i)?;
            let color: Option<i16> = row.get(3 + 2 * days + i)?;
            day_warnings.push(DayWarning {
                condition,
                text,
                color: color.and_then(|c| u8::try_from(c).ok()),
            });
        }

        let geom: Option<String> = row.get(3 + 3 * days)?;

        features.push(HazardFeature {
            warning: DistrictWarning {
                district_id,
                district,
                date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                days: day_warnings,
            },
            geometry: geom.as_deref().and_then(parse_geojson_to_multipolygon),
        });
    }

    log::debug!("{table}: read {} snapshot rows", features.len());
    Ok(features)
}

/// Fallback source backed by the snapshot table of the primary engine.
///
/// Reads through a cloned handle of the primary connection.
pub struct WarningTableSource {
    pub id: String,
    pub name: String,
    pub table: String,
    pub timeout: Duration,
    conn: Arc<Mutex<Connection>>,
}

impl WarningTableSource {
    /// Builds the source for a `warning_table` definition; `None` for any
    /// other kind.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection cannot be cloned.
    pub fn from_definition(def: &SourceDefinition, conn: &Connection) -> Result<Option<Self>, DbError> {
        let FetcherConfig::WarningTable { table } = &def.fetcher else {
            return Ok(None);
        };
        Ok(Some(Self {
            id: def.id.clone(),
            name: def.name.clone(),
            table: table.clone(),
            timeout: Duration::from_secs(def.timeout_secs),
            conn: Arc::new(Mutex::new(conn.try_clone()?)),
        }))
    }
}

#[async_trait]
impl HazardSource for WarningTableSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _ctx: &FetchContext) -> Result<Vec<HazardFeature>, SourceError> {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();

        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| DbError::Conversion {
                message: format!("connection lock poisoned: {e}"),
            })?;
            read_warning_snapshot(&conn, &table)
        })
        .await
        .map_err(|e| SourceError::Table {
            message: format!("read task failed: {e}"),
        })?;

        let features = result.map_err(|e| SourceError::Table {
            message: e.to_string(),
        })?;
        log::info!("{}: {} features from {}", self.id, features.len(), self.table);
        Ok(features)
    }
}
