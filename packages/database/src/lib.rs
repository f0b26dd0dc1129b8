#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for the hazard pipeline.
//!
//! One database file per engine (primary and optional mirror). Each file
//! holds the district reference tables, the raw warning snapshots, and one
//! day-wise table per hazard type. Geometries are stored as `GeoJSON` TEXT.
//! [`router::PersistenceRouter`] fans a run's records out to every engine.

pub mod assigned;
pub mod paths;
pub mod reference;
pub mod router;
pub mod schema;
pub mod warning_table;

use std::path::Path;

use duckdb::Connection;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error while preparing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Table map configuration is malformed.
    #[error("Table map parse error: {0}")]
    TableMap(#[from] toml::de::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) an engine database and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(
        "SET threads = 4;
         SET memory_limit = '512MB';",
    )?;
    schema::create_schema(&conn)?;

    Ok(conn)
}

/// Opens an in-memory engine with the schema applied.
///
/// # Errors
///
/// Returns [`DbError`] if schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    schema::create_schema(&conn)?;
    Ok(conn)
}

/// Rejects identifiers that cannot be interpolated into SQL as-is.
///
/// Table names come from configuration and are formatted into statements,
/// so only `[A-Za-z0-9_]` is accepted.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] for anything else.
pub fn check_identifier(name: &str) -> Result<&str, DbError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(DbError::Conversion {
            message: format!("invalid table name {name:?}"),
        })
    }
}

/// Runs `f` inside a transaction, rolling back if it fails.
///
/// # Errors
///
/// Returns whatever `f` returns, or [`DbError`] if `BEGIN`/`COMMIT` fail.
pub fn with_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    conn.execute_batch("BEGIN TRANSACTION;")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT;")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK;") {
                log::error!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(check_identifier("hazard_rainfall").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("x; DROP TABLE y").is_err());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let conn = open_in_memory().unwrap();
        let result: Result<(), DbError> = with_transaction(&conn, |c| {
            c.execute_batch("INSERT INTO cyclone_impacted_circles VALUES ('AP', TIMESTAMP '2024-10-20 00:00:00');")?;
            Err(DbError::Conversion {
                message: "boom".to_string(),
            })
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cyclone_impacted_circles", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
