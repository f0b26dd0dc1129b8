//! Pipeline runs.
//!
//! The record builders (`text_records`, `cyclone_records`,
//! `flood_records`) are pure and work on already-fetched data. The `run_*`
//! functions wire them to the source chain and the engines.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::Connection;
use hazard_aggregate::{aggregate_cyclone, aggregate_daywise, aggregate_flood, base_date, by_hazard_type};
use hazard_classify::cyclone::classify_cyclone;
use hazard_classify::flood::classify_flood;
use hazard_classify::{ClassifierConfig, CyclonePolicy, classify_assignments};
use hazard_database::reference::{cyclone_impacted_circles, load_district_geometry, resolve_missing_geometry};
use hazard_database::router::{DuckDbStore, PersistReport, PersistenceRouter};
use hazard_database::schema::{ASSIGNED_TABLE, RAW_WARNING_TABLE};
use hazard_database::warning_table::WarningTableSource;
use hazard_models::{DistrictGeometry, FloodObservation, HazardFeature, HazardTypeRecord};
use hazard_source::chain::{ChainOutcome, fetch_first_available};
use hazard_source::flood::fetch_flood_observations;
use hazard_source::progress::{ProgressCallback, null_progress};
use hazard_source::registry::build_http_source;
use hazard_source::{FetchContext, HazardSource};
use hazard_source_models::SourceDefinition;
use hazard_spatial::{DistrictIndex, JoinKind, assign_contains, assign_within};
use serde::Serialize;

use crate::{PipelineConfig, PipelineError};

/// Primary engine (plus optional mirror) behind the persistence router.
pub struct Engines {
    router: PersistenceRouter,
    reader: Connection,
}

impl Engines {
    /// Opens the configured engines, creating their schema.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if an engine cannot be opened.
    pub fn open(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let primary = DuckDbStore::open("primary", &config.primary_db)?;
        let reader = primary.connection().try_clone().map_err(hazard_database::DbError::from)?;
        let mut router = PersistenceRouter::new(config.tables.clone(), Box::new(primary));

        if let Some(path) = &config.mirror_db {
            router = router.with_mirror(Box::new(DuckDbStore::open("mirror", path)?));
        }

        log::info!("Engines: {}", router.engine_names().join(", "));
        Ok(Self { router, reader })
    }

    /// In-memory primary and mirror engines.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if schema creation fails.
    pub fn in_memory(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let primary = DuckDbStore::in_memory("primary")?;
        let reader = primary.connection().try_clone().map_err(hazard_database::DbError::from)?;
        let router = PersistenceRouter::new(config.tables.clone(), Box::new(primary))
            .with_mirror(Box::new(DuckDbStore::in_memory("mirror")?));
        Ok(Self { router, reader })
    }

    /// Read handle on the primary engine (reference tables, warning
    /// snapshot).
    #[must_use]
    pub const fn primary(&self) -> &Connection {
        &self.reader
    }

    #[must_use]
    pub const fn router(&self) -> &PersistenceRouter {
        &self.router
    }
}

/// Live fallback chain.
pub struct SourceChain {
    pub sources: Vec<Box<dyn HazardSource>>,
    /// Ids of sources that read back the raw snapshot; their output is not
    /// re-snapshotted.
    pub table_backed: BTreeSet<String>,
}

impl SourceChain {
    /// Chain of arbitrary sources, none table-backed.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn HazardSource>>) -> Self {
        Self {
            sources,
            table_backed: BTreeSet::new(),
        }
    }

    /// Builds the live chain for `defs`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if a table-backed source cannot get a
    /// connection.
    pub fn build(defs: &[SourceDefinition], primary: &Connection) -> Result<Self, PipelineError> {
        let mut chain = Self::new(Vec::with_capacity(defs.len()));

        for def in defs {
            if let Some(source) = build_http_source(def) {
                chain.sources.push(source);
            } else if let Some(source) = WarningTableSource::from_definition(def, primary)? {
                chain.table_backed.insert(def.id.clone());
                chain.sources.push(Box::new(source));
            } else {
                log::warn!("{}: no fetcher for kind {}", def.id, def.kind());
            }
        }

        Ok(chain)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Flags shared by the `run_*` functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave the flood feed out of a text run.
    pub skip_flood: bool,
    /// Build records without writing anything.
    pub dry_run: bool,
}

/// Progress sinks for one run.
#[derive(Clone)]
pub struct RunProgress {
    pub chain: Arc<dyn ProgressCallback>,
    pub writes: Arc<dyn ProgressCallback>,
}

impl RunProgress {
    #[must_use]
    pub fn silent() -> Self {
        Self {
            chain: null_progress(),
            writes: null_progress(),
        }
    }
}

/// What one run produced.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Source that supplied the warning snapshot, if the run used the chain.
    pub source_id: Option<String>,
    pub records: Vec<HazardTypeRecord>,
    /// Router outcome; `None` on a dry run.
    #[serde(skip)]
    pub report: Option<PersistReport>,
}

impl RunSummary {
    fn empty(source_id: Option<String>) -> Self {
        Self {
            source_id,
            records: Vec::new(),
            report: None,
        }
    }
}

/// Run timestamp shared by every record of a run.
#[must_use]
pub fn run_timestamp() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Text hazards: left join, phrase classification, day-wise aggregation.
///
/// # Errors
///
/// Returns [`PipelineError::Aggregate`] if phrases were classified but no
/// assignment carries an observation date.
pub fn text_records(
    features: &[HazardFeature],
    districts: &[DistrictGeometry],
    classifier: &ClassifierConfig,
    insert_at: NaiveDateTime,
) -> Result<Vec<HazardTypeRecord>, PipelineError> {
    let assignments = assign_within(features, districts, JoinKind::Left);
    let phrases = classify_assignments(&assignments, classifier);
    if phrases.is_empty() {
        log::info!("No hazard phrases in {} assignments", assignments.len());
        return Ok(Vec::new());
    }

    let base = base_date(&assignments)?;
    Ok(aggregate_daywise(&phrases, base, classifier.severity_policy, insert_at))
}

/// Cyclone records: inner join, comma-split phrases gated by `policy`.
///
/// # Errors
///
/// Returns [`PipelineError::Aggregate`] if phrases were found but no
/// assignment carries an observation date.
pub fn cyclone_records(
    features: &[HazardFeature],
    districts: &[DistrictGeometry],
    classifier: &ClassifierConfig,
    policy: CyclonePolicy,
    insert_at: NaiveDateTime,
) -> Result<Vec<HazardTypeRecord>, PipelineError> {
    let assignments = assign_within(features, districts, JoinKind::Inner);
    let phrases = classify_cyclone(&assignments, classifier, policy);
    if phrases.is_empty() {
        log::info!("No cyclone phrases in {} assignments", assignments.len());
        return Ok(Vec::new());
    }

    let base = base_date(&assignments)?;
    Ok(aggregate_cyclone(&phrases, base, classifier, insert_at))
}

/// Flood records over every circle of `districts`.
#[must_use]
pub fn flood_records(
    observations: Vec<FloodObservation>,
    districts: Vec<DistrictGeometry>,
    classifier: &ClassifierConfig,
    run_date: NaiveDate,
    insert_at: NaiveDateTime,
) -> Vec<HazardTypeRecord> {
    let index = DistrictIndex::new(districts);
    let circles = index.circles();
    let located = index.locate_sites(observations);
    let alerts = classify_flood(&located, &classifier.flood);
    aggregate_flood(&alerts, &circles, run_date, insert_at)
}

/// Runs the chain, snapshots the winner, and fills in missing geometry.
#[allow(clippy::future_not_send)]
async fn acquire(
    engines: &Engines,
    chain: &SourceChain,
    ctx: &FetchContext,
    options: RunOptions,
    progress: &RunProgress,
) -> Result<(String, Vec<HazardFeature>), PipelineError> {
    let ChainOutcome {
        source_id,
        features,
        failures,
    } = fetch_first_available(&chain.sources, ctx, &progress.chain).await?;

    if !failures.is_empty() {
        log::warn!(
            "{source_id} won after {} failed sources: {}",
            failures.len(),
            failures.iter().map(|f| f.source_id.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    if options.dry_run || chain.table_backed.contains(&source_id) {
        log::debug!("Not snapshotting {source_id} features");
    } else {
        let report = engines.router.on_every_engine(RAW_WARNING_TABLE, |store| {
            store.replace_warning_snapshot(RAW_WARNING_TABLE, &features)
        });
        log::info!(
            "{RAW_WARNING_TABLE}: {} rows written, {} engines failed",
            report.rows_written(),
            report.failures.len()
        );
    }

    let features = resolve_missing_geometry(&engines.reader, features)?;
    Ok((source_id, features))
}

fn persist(
    engines: &Engines,
    records: &[HazardTypeRecord],
    options: RunOptions,
    progress: &RunProgress,
) -> Option<PersistReport> {
    if options.dry_run {
        log::info!("Dry run: {} records not persisted", records.len());
        return None;
    }
    let grouped = by_hazard_type(records.to_vec());
    Some(engines.router.persist(&grouped, progress.writes.as_ref()))
}

/// Text hazards, plus flood unless `options.skip_flood`.
///
/// # Errors
///
/// Returns [`PipelineError`] if every source fails or reference reads
/// fail. Per-table write failures are reported, not returned.
#[allow(clippy::future_not_send)]
pub async fn run_text(
    config: &PipelineConfig,
    engines: &Engines,
    chain: &SourceChain,
    ctx: &FetchContext,
    options: RunOptions,
    progress: &RunProgress,
) -> Result<RunSummary, PipelineError> {
    let (source_id, features) = acquire(engines, chain, ctx, options, progress).await?;
    let districts = load_district_geometry(&engines.reader, None)?;
    let insert_at = run_timestamp();

    let mut records = text_records(&features, &districts, &config.classifier, insert_at)?;
    log::info!("{} text hazard records from {source_id}", records.len());

    if !options.skip_flood {
        let observations = fetch_flood_observations(&config.flood, ctx).await;
        let run_date = chrono::Utc::now().date_naive();
        let flood = flood_records(observations, districts, &config.classifier, run_date, insert_at);
        log::info!("{} flood records", flood.len());
        records.extend(flood);
    }

    let report = persist(engines, &records, options, progress);
    Ok(RunSummary {
        source_id: Some(source_id),
        records,
        report,
    })
}

/// Cyclone hazards, restricted to the latest impacted circles unless
/// `all_circles`.
///
/// # Errors
///
/// Returns [`PipelineError`] if every source fails or reference reads
/// fail.
#[allow(clippy::too_many_arguments, clippy::future_not_send)]
pub async fn run_cyclone(
    config: &PipelineConfig,
    engines: &Engines,
    chain: &SourceChain,
    ctx: &FetchContext,
    policy: CyclonePolicy,
    all_circles: bool,
    options: RunOptions,
    progress: &RunProgress,
) -> Result<RunSummary, PipelineError> {
    let circles = if all_circles {
        None
    } else {
        let circles = cyclone_impacted_circles(&engines.reader)?;
        if circles.is_empty() {
            log::info!("No cyclone-impacted circles; nothing to do");
            return Ok(RunSummary::empty(None));
        }
        log::info!("Cyclone-impacted circles: {}", circles.join(", "));
        Some(circles)
    };

    let (source_id, features) = acquire(engines, chain, ctx, options, progress).await?;
    let districts = load_district_geometry(&engines.reader, circles.as_deref())?;

    let records = cyclone_records(&features, &districts, &config.classifier, policy, run_timestamp())?;
    log::info!("{} cyclone records ({policy}) from {source_id}", records.len());

    let report = persist(engines, &records, options, progress);
    Ok(RunSummary {
        source_id: Some(source_id),
        records,
        report,
    })
}

/// Flood feed only.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the district reference cannot be read.
#[allow(clippy::future_not_send)]
pub async fn run_flood(
    config: &PipelineConfig,
    engines: &Engines,
    ctx: &FetchContext,
    options: RunOptions,
    progress: &RunProgress,
) -> Result<RunSummary, PipelineError> {
    let observations = fetch_flood_observations(&config.flood, ctx).await;
    let districts = load_district_geometry(&engines.reader, None)?;
    let records = flood_records(
        observations,
        districts,
        &config.classifier,
        chrono::Utc::now().date_naive(),
        run_timestamp(),
    );

    let report = persist(engines, &records, options, progress);
    Ok(RunSummary {
        source_id: None,
        records,
        report,
    })
}

/// Replaces the district warning assignment snapshot on every engine.
///
/// # Errors
///
/// Returns [`PipelineError`] if every source fails or reference reads
/// fail.
#[allow(clippy::future_not_send)]
pub async fn assign_warnings(
    engines: &Engines,
    chain: &SourceChain,
    ctx: &FetchContext,
    progress: &RunProgress,
) -> Result<PersistReport, PipelineError> {
    let (source_id, features) = acquire(engines, chain, ctx, RunOptions::default(), progress).await?;
    let districts = load_district_geometry(&engines.reader, None)?;
    let assignments = assign_contains(&features, &districts);
    log::info!("{} district assignments from {source_id}", assignments.len());

    Ok(engines
        .router
        .on_every_engine(ASSIGNED_TABLE, |store| store.replace_assigned_snapshot(&assignments)))
}

/// Creates every routed table on every engine.
#[must_use]
pub fn migrate(config: &PipelineConfig, engines: &Engines) -> PersistReport {
    let mut report = PersistReport::default();
    for route in config.tables.routes() {
        let outcome = engines
            .router
            .on_every_engine(&route.table, |store| store.ensure_table(&route.table).map(|()| 0));
        report.written.extend(outcome.written);
        report.failures.extend(outcome.failures);
    }
    report
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use geo::{MultiPolygon, Point, polygon};
    use hazard_models::{DaySlot, FloodDataType, HazardType, Severity, TEXT_FORECAST_DAYS};
    use hazard_source::SourceError;
    use hazard_source::wfs::parse_feature_collection;
    use hazard_source_models::{SourceKind, WfsSchema};
    use hazard_spatial::normalize::multipolygon_to_geojson;
    use serde_json::json;

    use super::*;

    struct FixedSource {
        id: &'static str,
        result: fn() -> Result<Vec<HazardFeature>, SourceError>,
    }

    #[async_trait]
    impl HazardSource for FixedSource {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn fetch(&self, _ctx: &FetchContext) -> Result<Vec<HazardFeature>, SourceError> {
            (self.result)()
        }
    }

    fn pune_features() -> Result<Vec<HazardFeature>, SourceError> {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[73.0, 18.0], [74.5, 18.0], [74.5, 19.0], [73.0, 19.0], [73.0, 18.0]]]
                },
                "properties": {
                    "Obj_id": 521,
                    "District": "Pune",
                    "Date": "2024-06-01",
                    "Day_1": "Heavy Rain,Fog",
                    "day1_color": 2
                }
            }]
        });
        parse_feature_collection("wfs", &body, WfsSchema::Named, 1)
    }

    fn pune_boundary() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 73.5, y: 18.3),
            (x: 74.0, y: 18.3),
            (x: 74.0, y: 18.8),
            (x: 73.5, y: 18.8),
            (x: 73.5, y: 18.3),
        ]])
    }

    fn pune_district() -> DistrictGeometry {
        DistrictGeometry {
            district: "Pune".to_string(),
            indus_circle: "MH".to_string(),
            circle_name: Some("Maharashtra".to_string()),
            boundary: Some(pune_boundary()),
            point: Point::new(73.75, 18.55),
        }
    }

    fn seed_reference(engines: &Engines) {
        engines
            .primary()
            .execute(
                "INSERT INTO district_geometry (district, indus_circle, indus_circle_name, geometry)
                 VALUES ('Pune', 'MH', 'Maharashtra', ?)",
                [multipolygon_to_geojson(&pune_boundary())],
            )
            .unwrap();
    }

    fn insert_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn count(engines: &Engines, table: &str) -> i64 {
        engines
            .primary()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn heavy_rain_and_fog_yield_two_high_records() {
        let features = pune_features().unwrap();
        let records = text_records(
            &features,
            &[pune_district()],
            &ClassifierConfig::embedded(),
            insert_at(),
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        let types: Vec<HazardType> = records.iter().map(|r| r.hazard_type).collect();
        assert!(types.contains(&HazardType::Rainfall));
        assert!(types.contains(&HazardType::Fog));
        for record in &records {
            assert_eq!(record.indus_circle, "MH");
            assert_eq!(record.day, DaySlot::new(1).unwrap());
            assert_eq!(record.districts, vec!["Pune".to_string()]);
            assert_eq!(record.severity, Some(Severity::High));
        }
    }

    #[test]
    fn no_phrases_means_no_records() {
        let records = text_records(&[], &[pune_district()], &ClassifierConfig::embedded(), insert_at())
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn cyclone_rows_gate_on_colour() {
        let features = pune_features().unwrap();
        let records = cyclone_records(
            &features,
            &[pune_district()],
            &ClassifierConfig::embedded(),
            CyclonePolicy::Strict,
            insert_at(),
        )
        .unwrap();

        let rain = records
            .iter()
            .find(|r| r.hazard_value.as_deref() == Some("Heavy Rain"))
            .unwrap();
        assert_eq!(rain.hazard_type, HazardType::Cyclone);
        assert_eq!(rain.severity, Some(Severity::High));
        assert_eq!(rain.districts, vec!["Pune".to_string()]);

        let fog = records
            .iter()
            .find(|r| r.hazard_value.as_deref() == Some("Fog"))
            .unwrap();
        assert!(fog.severity.is_none());
        assert!(fog.districts.is_empty());
    }

    #[test]
    fn flood_sites_outside_districts_are_ignored() {
        let observation = |day: u8, location: Point<f64>| FloodObservation {
            site_id: None,
            site_name: None,
            river: None,
            district: None,
            state: None,
            forecast_day: DaySlot::new(day).unwrap(),
            data_type: FloodDataType::Inflow,
            flood_condition: None,
            inflow: Some(600.0),
            location: Some(location),
        };

        let records = flood_records(
            vec![
                observation(2, Point::new(73.6, 18.4)),
                observation(3, Point::new(10.0, 10.0)),
            ],
            vec![pune_district()],
            &ClassifierConfig::embedded(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            insert_at(),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hazard_type, HazardType::Flood);
        assert_eq!(records[0].day, DaySlot::new(2).unwrap());
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(records[0].severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn text_run_falls_back_and_persists_to_both_engines() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        seed_reference(&engines);

        let chain = SourceChain::new(vec![
            Box::new(FixedSource {
                id: "empty",
                result: || Ok(Vec::new()),
            }),
            Box::new(FixedSource {
                id: "wfs",
                result: pune_features,
            }),
        ]);
        let options = RunOptions {
            skip_flood: true,
            dry_run: false,
        };

        let summary = run_text(
            &config,
            &engines,
            &chain,
            &FetchContext::new().unwrap(),
            options,
            &RunProgress::silent(),
        )
        .await
        .unwrap();

        assert_eq!(summary.source_id.as_deref(), Some("wfs"));
        assert_eq!(summary.records.len(), 2);

        let report = summary.report.unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.rows_written_to("primary"), 2);
        assert_eq!(report.rows_written_to("mirror"), 2);
        assert_eq!(count(&engines, "hazard_rainfall"), 1);
        assert_eq!(count(&engines, "hazard_fog"), 1);
        assert_eq!(count(&engines, RAW_WARNING_TABLE), 1);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        seed_reference(&engines);

        let chain = SourceChain::new(vec![Box::new(FixedSource {
            id: "wfs",
            result: pune_features,
        })]);
        let options = RunOptions {
            skip_flood: true,
            dry_run: true,
        };

        let summary = run_text(
            &config,
            &engines,
            &chain,
            &FetchContext::new().unwrap(),
            options,
            &RunProgress::silent(),
        )
        .await
        .unwrap();

        assert_eq!(summary.records.len(), 2);
        assert!(summary.report.is_none());
        assert_eq!(count(&engines, "hazard_rainfall"), 0);
        assert_eq!(count(&engines, RAW_WARNING_TABLE), 0);
    }

    #[tokio::test]
    async fn all_sources_failing_aborts_the_run() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        let chain = SourceChain::new(vec![Box::new(FixedSource {
            id: "broken",
            result: || Err(SourceError::Empty),
        })]);

        let result = run_text(
            &config,
            &engines,
            &chain,
            &FetchContext::new().unwrap(),
            RunOptions::default(),
            &RunProgress::silent(),
        )
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::Source(SourceError::AllSourcesFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn cyclone_run_without_impacted_circles_is_empty() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        seed_reference(&engines);
        let chain = SourceChain::new(vec![Box::new(FixedSource {
            id: "wfs",
            result: pune_features,
        })]);

        let summary = run_cyclone(
            &config,
            &engines,
            &chain,
            &FetchContext::new().unwrap(),
            CyclonePolicy::Strict,
            false,
            RunOptions::default(),
            &RunProgress::silent(),
        )
        .await
        .unwrap();

        assert!(summary.source_id.is_none());
        assert!(summary.records.is_empty());
        assert_eq!(count(&engines, "hazard_cyclone"), 0);
    }

    #[tokio::test]
    async fn assignment_snapshot_reaches_every_engine() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        seed_reference(&engines);
        let chain = SourceChain::new(vec![Box::new(FixedSource {
            id: "wfs",
            result: pune_features,
        })]);

        let report = assign_warnings(
            &engines,
            &chain,
            &FetchContext::new().unwrap(),
            &RunProgress::silent(),
        )
        .await
        .unwrap();

        // One row per forecast day of the single covered district.
        let days = u64::from(TEXT_FORECAST_DAYS);
        assert!(report.failures.is_empty());
        assert_eq!(report.rows_written_to("primary"), days);
        assert_eq!(report.rows_written_to("mirror"), days);
    }

    #[test]
    fn migrate_touches_every_route_on_every_engine() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        let report = migrate(&config, &engines);
        assert!(report.failures.is_empty());
        assert_eq!(report.written.len(), config.tables.routes().count() * 2);
    }

    #[test]
    fn table_definitions_become_table_sources() {
        let config = PipelineConfig::default();
        let engines = Engines::in_memory(&config).unwrap();
        let defs: Vec<SourceDefinition> = config
            .enabled_sources()
            .into_iter()
            .filter(|d| d.kind() == SourceKind::WarningTable)
            .collect();

        let chain = SourceChain::build(&defs, engines.primary()).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain.table_backed.contains("act_warning_table"));
    }
}
