//! Persistence router.
//!
//! Maps hazard keys to destination tables and writes each table to every
//! configured engine. Engines are independent: a failure on one is logged
//! and recorded, and the others still receive their writes.

use std::collections::BTreeMap;
use std::path::Path;

use duckdb::Connection;
use hazard_models::{DistrictHazardAssignment, HazardFeature, HazardType, HazardTypeRecord};
use hazard_source::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{DbError, check_identifier, with_transaction};

const DEFAULT_TABLE_MAP: &str = include_str!("../config/tables.toml");

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 1_000;

/// How a table's previous contents are treated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WritePolicy {
    /// Keep existing rows; readers filter on `insert_at`.
    Append,
    /// Delete every row before inserting, in the same transaction.
    TruncateThenInsert,
}

/// Destination of one hazard key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRoute {
    pub table: String,
    pub policy: WritePolicy,
}

/// Hazard key to table routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMap {
    tables: BTreeMap<String, TableRoute>,
}

impl TableMap {
    /// Parses a table map from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the TOML is malformed or a table name is
    /// not a plain identifier.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        let map: Self = toml::from_str(s)?;
        for route in map.tables.values() {
            check_identifier(&route.table)?;
        }
        Ok(map)
    }

    /// The built-in table map.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table map is invalid.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_TABLE_MAP)
            .unwrap_or_else(|e| panic!("Failed to parse embedded table map: {e}"))
    }

    /// Looks up the route for a hazard key.
    #[must_use]
    pub fn route(&self, key: &str) -> Option<&TableRoute> {
        self.tables.get(key)
    }

    /// All routes in key order.
    pub fn routes(&self) -> impl Iterator<Item = &TableRoute> {
        self.tables.values()
    }

    /// Drops the route for a key.
    pub fn remove(&mut self, key: &str) -> Option<TableRoute> {
        self.tables.remove(key)
    }
}

impl Default for TableMap {
    fn default() -> Self {
        Self::embedded()
    }
}

/// A database engine the router can write to.
pub trait HazardStore {
    /// Name used in logs and reports (e.g. `"primary"`).
    fn name(&self) -> &str;

    /// Creates a day-wise hazard table if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the DDL fails.
    fn ensure_table(&self, table: &str) -> Result<(), DbError>;

    /// Writes day-wise records to `table` under `policy`, in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails; nothing is committed.
    fn write_records(
        &self,
        table: &str,
        policy: WritePolicy,
        records: &[HazardTypeRecord],
    ) -> Result<u64, DbError>;

    /// Replaces a raw warning snapshot table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn replace_warning_snapshot(&self, table: &str, features: &[HazardFeature]) -> Result<u64, DbError>;

    /// Replaces the district warning assignment snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn replace_assigned_snapshot(&self, assignments: &[DistrictHazardAssignment]) -> Result<u64, DbError>;
}

/// A `DuckDB` file (or in-memory database) acting as one engine.
pub struct DuckDbStore {
    name: String,
    conn: Connection,
}

impl DuckDbStore {
    /// Opens the engine at `path`, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened.
    pub fn open(name: &str, path: &Path) -> Result<Self, DbError> {
        log::info!("Opening {name} engine at {}", path.display());
        Ok(Self {
            name: name.to_string(),
            conn: crate::open(path)?,
        })
    }

    /// Opens an in-memory engine.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema creation fails.
    pub fn in_memory(name: &str) -> Result<Self, DbError> {
        Ok(Self {
            name: name.to_string(),
            conn: crate::open_in_memory()?,
        })
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl HazardStore for DuckDbStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_table(&self, table: &str) -> Result<(), DbError> {
        crate::schema::create_hazard_table(&self.conn, table)
    }

    fn write_records(
        &self,
        table: &str,
        policy: WritePolicy,
        records: &[HazardTypeRecord],
    ) -> Result<u64, DbError> {
        crate::schema::create_hazard_table(&self.conn, table)?;
        with_transaction(&self.conn, |conn| {
            if policy == WritePolicy::TruncateThenInsert {
                conn.execute_batch(&format!("DELETE FROM {table};"))?;
            }
            insert_records(conn, table, records)
        })
    }

    fn replace_warning_snapshot(&self, table: &str, features: &[HazardFeature]) -> Result<u64, DbError> {
        crate::warning_table::replace_warning_snapshot(&self.conn, table, features)
    }

    fn replace_assigned_snapshot(&self, assignments: &[DistrictHazardAssignment]) -> Result<u64, DbError> {
        crate::assigned::replace_assigned_snapshot(&self.conn, assignments)
    }
}

/// Multi-row INSERT of day-wise records.
fn insert_records(conn: &Connection, table: &str, records: &[HazardTypeRecord]) -> Result<u64, DbError> {
    let mut total = 0u64;

    for chunk in records.chunks(CHUNK_SIZE) {
        let values = vec!["(?, ?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} (
                days, date, indus_circle, district, hazard_value,
                description, severity, insert_at
            ) VALUES {values}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut idx = 1usize;

        for record in chunk {
            stmt.raw_bind_parameter(idx, record.day.label())?;
            stmt.raw_bind_parameter(idx + 1, record.date.format("%Y-%m-%d").to_string())?;
            stmt.raw_bind_parameter(idx + 2, &record.indus_circle)?;
            stmt.raw_bind_parameter(idx + 3, record.district_list())?;
            stmt.raw_bind_parameter(idx + 4, record.hazard_value.as_deref())?;
            stmt.raw_bind_parameter(idx + 5, record.description.as_deref())?;
            stmt.raw_bind_parameter(idx + 6, record.severity.map(|s| s.to_string()))?;
            stmt.raw_bind_parameter(
                idx + 7,
                record.insert_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            )?;
            idx += 8;
        }

        let rows = stmt.raw_execute()?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total)
}

/// One successful table write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub engine: String,
    pub table: String,
    pub rows: u64,
}

/// One failed table write.
#[derive(Debug)]
pub struct PersistFailure {
    pub engine: String,
    pub table: String,
    pub error: DbError,
}

/// Outcome of one router call across every engine.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<TableWrite>,
    pub failures: Vec<PersistFailure>,
    /// Hazard keys with no route.
    pub skipped: Vec<String>,
}

impl PersistReport {
    /// Total rows written across engines.
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.written.iter().map(|w| w.rows).sum()
    }

    /// Rows written to one engine.
    #[must_use]
    pub fn rows_written_to(&self, engine: &str) -> u64 {
        self.written
            .iter()
            .filter(|w| w.engine == engine)
            .map(|w| w.rows)
            .sum()
    }
}

/// Writes record batches to a primary engine and an optional mirror.
pub struct PersistenceRouter {
    tables: TableMap,
    engines: Vec<Box<dyn HazardStore>>,
}

impl PersistenceRouter {
    /// Creates a router writing to `primary` only.
    #[must_use]
    pub fn new(tables: TableMap, primary: Box<dyn HazardStore>) -> Self {
        Self {
            tables,
            engines: vec![primary],
        }
    }

    /// Adds a mirror engine.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Box<dyn HazardStore>) -> Self {
        self.engines.push(mirror);
        self
    }

    /// Names of the configured engines, primary first.
    #[must_use]
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Routes each hazard type's records to its table on every engine.
    ///
    /// Unrouted hazard keys are logged and skipped. Per-engine, per-table
    /// failures are logged and recorded; they never stop other writes.
    pub fn persist(
        &self,
        records: &BTreeMap<HazardType, Vec<HazardTypeRecord>>,
        progress: &dyn ProgressCallback,
    ) -> PersistReport {
        let mut report = PersistReport::default();
        let mut routed: Vec<(&TableRoute, &[HazardTypeRecord])> = Vec::new();

        for (hazard_type, batch) in records {
            let key = hazard_type.as_ref();
            match self.tables.route(key) {
                Some(route) => routed.push((route, batch.as_slice())),
                None => {
                    log::warn!("No table mapped for hazard key {key:?}; {} records skipped", batch.len());
                    report.skipped.push(key.to_string());
                }
            }
        }

        progress.set_total(u64::try_from(routed.len() * self.engines.len()).unwrap_or(u64::MAX));

        for engine in &self.engines {
            for (route, batch) in &routed {
                progress.set_message(format!("{} -> {}", route.table, engine.name()));
                match engine.write_records(&route.table, route.policy, batch) {
                    Ok(rows) => {
                        log::info!("{}: {rows} rows written to {}", engine.name(), route.table);
                        report.written.push(TableWrite {
                            engine: engine.name().to_string(),
                            table: route.table.clone(),
                            rows,
                        });
                    }
                    Err(e) => {
                        log::error!("{}: write to {} failed: {e}", engine.name(), route.table);
                        report.failures.push(PersistFailure {
                            engine: engine.name().to_string(),
                            table: route.table.clone(),
                            error: e,
                        });
                    }
                }
                progress.inc(1);
            }
        }

        progress.finish(format!(
            "{} rows written, {} failed writes",
            report.rows_written(),
            report.failures.len()
        ));
        report
    }

    /// Runs a snapshot write against every engine independently.
    pub fn on_every_engine<F>(&self, table: &str, write: F) -> PersistReport
    where
        F: Fn(&dyn HazardStore) -> Result<u64, DbError>,
    {
        let mut report = PersistReport::default();
        for engine in &self.engines {
            match write(engine.as_ref()) {
                Ok(rows) => report.written.push(TableWrite {
                    engine: engine.name().to_string(),
                    table: table.to_string(),
                    rows,
                }),
                Err(e) => {
                    log::error!("{}: snapshot write to {table} failed: {e}", engine.name());
                    report.failures.push(PersistFailure {
                        engine: engine.name().to_string(),
                        table: table.to_string(),
                        error: e,
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use hazard_models::{DaySlot, Severity};
    use hazard_source::progress::NullProgress;

    use super::*;

    struct FailingStore;

    impl HazardStore for FailingStore {
        fn name(&self) -> &str {
            "mirror"
        }

        fn ensure_table(&self, _: &str) -> Result<(), DbError> {
            Err(DbError::Conversion {
                message: "mirror unavailable".to_string(),
            })
        }

        fn write_records(&self, _: &str, _: WritePolicy, _: &[HazardTypeRecord]) -> Result<u64, DbError> {
            Err(DbError::Conversion {
                message: "mirror unavailable".to_string(),
            })
        }

        fn replace_warning_snapshot(&self, _: &str, _: &[HazardFeature]) -> Result<u64, DbError> {
            Err(DbError::Conversion {
                message: "mirror unavailable".to_string(),
            })
        }

        fn replace_assigned_snapshot(&self, _: &[DistrictHazardAssignment]) -> Result<u64, DbError> {
            Err(DbError::Conversion {
                message: "mirror unavailable".to_string(),
            })
        }
    }

    fn insert_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn record(hazard_type: HazardType, circle: &str) -> HazardTypeRecord {
        HazardTypeRecord {
            hazard_type,
            indus_circle: circle.to_string(),
            day: DaySlot::new(1).unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            districts: vec!["Nashik".to_string(), "Pune".to_string()],
            hazard_value: Some("Heavy Rain".to_string()),
            description: Some("Heavy Rain".to_string()),
            severity: Some(Severity::High),
            insert_at: insert_at(),
        }
    }

    fn batch(items: Vec<HazardTypeRecord>) -> BTreeMap<HazardType, Vec<HazardTypeRecord>> {
        let mut map: BTreeMap<HazardType, Vec<HazardTypeRecord>> = BTreeMap::new();
        for r in items {
            map.entry(r.hazard_type).or_default().push(r);
        }
        map
    }

    fn count(store: &DuckDbStore, table: &str) -> i64 {
        store
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn embedded_map_routes_every_hazard_type() {
        let map = TableMap::embedded();
        for hazard_type in HazardType::all() {
            assert!(map.route(hazard_type.as_ref()).is_some(), "{hazard_type} unrouted");
        }
        assert_eq!(map.route("coldhot").unwrap().table, "hazard_coldwave_hotwave");
        assert_eq!(map.route("rainfall").unwrap().policy, WritePolicy::Append);
    }

    #[test]
    fn appends_records_with_joined_districts() {
        let store = DuckDbStore::in_memory("primary").unwrap();
        let reader = store.connection().try_clone().unwrap();
        let router = PersistenceRouter::new(TableMap::embedded(), Box::new(store));

        let rainfall = record(HazardType::Rainfall, "MH");
        let records = batch(vec![rainfall.clone()]);
        router.persist(&records, &NullProgress);
        let report = router.persist(&records, &NullProgress);
        assert_eq!(report.rows_written(), 1);
        assert!(report.failures.is_empty());

        let rows: i64 = reader
            .query_row("SELECT COUNT(*) FROM hazard_rainfall", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);

        let mut stmt = reader.prepare("SELECT district FROM hazard_rainfall").unwrap();
        let districts = stmt
            .query_map([], |r| r.get::<_, Option<String>>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(districts, vec![rainfall.district_list(); 2]);
    }

    #[test]
    fn stored_row_matches_record() {
        let store = DuckDbStore::in_memory("primary").unwrap();
        store
            .write_records(
                "hazard_rainfall",
                WritePolicy::Append,
                &[record(HazardType::Rainfall, "MH")],
            )
            .unwrap();

        let (days, date, district, severity): (String, String, String, String) = store
            .connection()
            .query_row(
                "SELECT days, CAST(date AS VARCHAR), district, severity FROM hazard_rainfall",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(days, "Day1");
        assert_eq!(date, "2024-06-01");
        assert_eq!(district, "Nashik, Pune");
        assert_eq!(severity, "High");
    }

    #[test]
    fn truncate_policy_replaces_rows() {
        let store = DuckDbStore::in_memory("primary").unwrap();
        let rows = [record(HazardType::Fog, "MH"), record(HazardType::Fog, "TN")];
        store
            .write_records("hazard_fog", WritePolicy::Append, &rows)
            .unwrap();
        store
            .write_records("hazard_fog", WritePolicy::TruncateThenInsert, &rows[..1])
            .unwrap();
        assert_eq!(count(&store, "hazard_fog"), 1);
    }

    #[test]
    fn unknown_hazard_key_is_skipped() {
        let mut map = TableMap::embedded();
        map.remove("fog");
        let router = PersistenceRouter::new(map, Box::new(DuckDbStore::in_memory("primary").unwrap()));

        let report = router.persist(
            &batch(vec![record(HazardType::Fog, "MH"), record(HazardType::Wind, "MH")]),
            &NullProgress,
        );
        assert_eq!(report.skipped, vec!["fog".to_string()]);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].table, "hazard_wind");
    }

    #[test]
    fn mirror_failure_does_not_affect_primary() {
        let router = PersistenceRouter::new(
            TableMap::embedded(),
            Box::new(DuckDbStore::in_memory("primary").unwrap()),
        )
        .with_mirror(Box::new(FailingStore));

        let report = router.persist(
            &batch(vec![record(HazardType::Rainfall, "MH"), record(HazardType::Flood, "AP")]),
            &NullProgress,
        );
        assert_eq!(report.rows_written_to("primary"), 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.engine == "mirror"));
        assert_eq!(router.engine_names(), vec!["primary", "mirror"]);

        let snapshot = router.on_every_engine("act_warning", |s| s.replace_warning_snapshot("act_warning", &[]));
        assert_eq!(snapshot.written.len(), 1);
        assert_eq!(snapshot.failures.len(), 1);
    }

    #[test]
    fn table_map_rejects_bad_table_names() {
        let toml = r#"
            [rainfall]
            table = "hazard rainfall"
            policy = "append"
        "#;
        assert!(TableMap::from_toml_str(toml).is_err());
    }
}
