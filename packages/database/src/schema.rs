//! Table definitions.
//!
//! Every engine carries the same schema. Geometry columns hold `GeoJSON`
//! text in EPSG:4326.

use duckdb::Connection;
use hazard_models::TEXT_FORECAST_DAYS;

use crate::router::TableMap;
use crate::{DbError, check_identifier};

/// Raw warning snapshot written after every successful fetch.
pub const RAW_WARNING_TABLE: &str = "act_warning";

/// District warning assignment snapshot.
pub const ASSIGNED_TABLE: &str = "act_warning_assigned";

/// Creates every reference, snapshot, and hazard table that does not yet
/// exist. Hazard tables follow the embedded table map.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS district_geometry (
            district TEXT NOT NULL,
            indus_circle TEXT,
            indus_circle_name TEXT,
            state_ut TEXT,
            geometry TEXT
        );

        CREATE TABLE IF NOT EXISTS imd_district (
            district_id BIGINT PRIMARY KEY,
            district TEXT,
            geom TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cyclone_impacted_circles (
            name TEXT,
            inserted_at TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS act_warning_assigned (
            district TEXT NOT NULL,
            indus_circle TEXT NOT NULL,
            indus_circle_name TEXT,
            date DATE,
            days TEXT NOT NULL,
            condition TEXT,
            color SMALLINT,
            severity TEXT,
            point TEXT NOT NULL
        );",
    )?;

    conn.execute_batch(&act_warning_ddl(RAW_WARNING_TABLE))?;

    for route in TableMap::embedded().routes() {
        create_hazard_table(conn, &route.table)?;
    }

    Ok(())
}

/// DDL for a raw warning snapshot table: one row per source feature with
/// the five day slots spread over columns.
#[must_use]
pub fn act_warning_ddl(table: &str) -> String {
    let mut columns = vec![
        "district_id BIGINT".to_string(),
        "district TEXT".to_string(),
        "date DATE".to_string(),
    ];
    for n in 1..=TEXT_FORECAST_DAYS {
        columns.push(format!("day_{n} TEXT"));
    }
    for n in 1..=TEXT_FORECAST_DAYS {
        columns.push(format!("day{n}_text TEXT"));
    }
    for n in 1..=TEXT_FORECAST_DAYS {
        columns.push(format!("day{n}_color SMALLINT"));
    }
    columns.push("geom TEXT".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n);",
        columns.join(",\n    ")
    )
}

/// Creates a day-wise hazard table if it does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the name is not a plain identifier or the DDL
/// fails.
pub fn create_hazard_table(conn: &Connection, table: &str) -> Result<(), DbError> {
    let table = check_identifier(table)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            days TEXT NOT NULL,
            date DATE NOT NULL,
            indus_circle TEXT NOT NULL,
            district TEXT,
            hazard_value TEXT,
            description TEXT,
            severity TEXT,
            insert_at TIMESTAMP NOT NULL
        );"
    ))?;
    Ok(())
}
