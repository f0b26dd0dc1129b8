//! Pipeline configuration.
//!
//! Built-in defaults, optionally overridden section by section from a TOML
//! file (`--config` or `HAZARD_CONFIG`), then by environment variables,
//! then by CLI flags.

use std::path::{Path, PathBuf};

use hazard_classify::ClassifierConfig;
use hazard_database::router::TableMap;
use hazard_source::flood::FloodFeedConfig;
use hazard_source_models::SourceDefinition;
use serde::Deserialize;

use crate::PipelineError;

/// Path of an override TOML file.
pub const CONFIG_ENV: &str = "HAZARD_CONFIG";
/// Primary engine database file.
pub const PRIMARY_DB_ENV: &str = "HAZARD_PRIMARY_DB";
/// Mirror engine database file.
pub const MIRROR_DB_ENV: &str = "HAZARD_MIRROR_DB";
/// Comma-separated source id filter.
pub const SOURCES_ENV: &str = "HAZARD_SOURCES";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    primary_db: Option<PathBuf>,
    mirror_db: Option<PathBuf>,
    sources: Option<Vec<String>>,
    classifier: Option<ClassifierConfig>,
    tables: Option<TableMap>,
    flood: Option<FloodFeedConfig>,
}

/// Everything a pipeline run needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub primary_db: PathBuf,
    pub mirror_db: Option<PathBuf>,
    /// Source id filter; `None` runs the whole chain.
    pub sources: Option<Vec<String>>,
    pub classifier: ClassifierConfig,
    pub tables: TableMap,
    pub flood: FloodFeedConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_db: hazard_database::paths::primary_db_path(),
            mirror_db: None,
            sources: None,
            classifier: ClassifierConfig::embedded(),
            tables: TableMap::embedded(),
            flood: FloodFeedConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Applies an override file on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigParse`] if the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, PipelineError> {
        let file: ConfigFile = toml::from_str(s)?;
        let mut config = Self::default();

        if let Some(path) = file.primary_db {
            config.primary_db = path;
        }
        if file.mirror_db.is_some() {
            config.mirror_db = file.mirror_db;
        }
        if file.sources.is_some() {
            config.sources = file.sources;
        }
        if let Some(classifier) = file.classifier {
            config.classifier = classifier;
        }
        if let Some(tables) = file.tables {
            config.tables = tables;
        }
        if let Some(flood) = file.flood {
            config.flood = flood;
        }

        Ok(config)
    }

    /// Resolves the configuration for this process.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the override file cannot be read or
    /// parsed, or the classifier configuration is inconsistent.
    pub fn load(path: Option<&Path>, cli_sources: Option<&str>) -> Result<Self, PipelineError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                log::info!("Loading pipeline config from {}", path.display());
                let contents =
                    std::fs::read_to_string(&path).map_err(|source| PipelineError::ConfigRead {
                        path: path.display().to_string(),
                        source,
                    })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        if let Some(filter) = cli_sources {
            config.sources = Some(parse_source_list(filter));
        }

        config.classifier.validate()?;
        Ok(config)
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(PRIMARY_DB_ENV) {
            self.primary_db = PathBuf::from(path);
        }
        if let Some(path) = lookup(MIRROR_DB_ENV).filter(|p| !p.trim().is_empty()) {
            self.mirror_db = Some(PathBuf::from(path));
        }
        if let Some(filter) = lookup(SOURCES_ENV) {
            self.sources = Some(parse_source_list(&filter));
        }
    }

    /// The fallback chain for this run, in priority order.
    #[must_use]
    pub fn enabled_sources(&self) -> Vec<SourceDefinition> {
        let defs = hazard_source::registry::select_sources(
            hazard_source::registry::all_sources(),
            self.sources.as_deref(),
        );
        if defs.is_empty() {
            log::warn!("No matching sources found for filter {:?}", self.sources);
        }
        defs
    }
}

/// Splits a comma-separated id list, dropping blanks.
#[must_use]
pub fn parse_source_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}
