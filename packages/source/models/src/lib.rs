#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard source definitions.
//!
//! A [`SourceDefinition`] is the serialisable description of one entry in
//! the fallback chain: where it lives, how its payload is shaped, how long
//! an attempt may take, and where it sits in the priority order. The
//! definitions are embedded as TOML and turned into live sources by
//! `hazard_source`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default per-attempt timeout when a definition does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of HTTP retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// The kind of physical source behind a definition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// `GeoServer` WFS `GetFeature` returning GeoJSON.
    Wfs,
    /// District-wise warning web page with an embedded `"areas"` array.
    HtmlWarning,
    /// Previously materialised raw warning table.
    WarningTable,
}

/// A complete hazard source definition, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"imd_wfs"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Position in the fallback chain. Lower values are tried first.
    pub priority: u32,
    /// Upper bound for one attempt at this source, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// HTTP retries for transient failures inside one attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Whether the source takes part in the chain.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How to fetch the payload.
    pub fetcher: FetcherConfig,
}

impl SourceDefinition {
    /// Returns the kind of physical source this definition describes.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self.fetcher {
            FetcherConfig::Wfs { .. } => SourceKind::Wfs,
            FetcherConfig::HtmlWarning { .. } => SourceKind::HtmlWarning,
            FetcherConfig::WarningTable { .. } => SourceKind::WarningTable,
        }
    }
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_enabled() -> bool {
    true
}

/// How to fetch the raw payload of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// WFS `GetFeature` with `outputFormat=application/json`.
    Wfs {
        /// Full `GetFeature` URL.
        url: String,
        /// Property layout of the layer.
        schema: WfsSchema,
        /// Minimum number of features for the response to count as valid.
        #[serde(default = "default_min_features")]
        min_features: usize,
    },
    /// District-wise warning page, fetched once per forecast day.
    HtmlWarning {
        /// Page URL; `?day=Day_N` is appended per day.
        url: String,
        /// Number of forecast days to scrape.
        #[serde(default = "default_html_days")]
        days: u8,
    },
    /// Raw warning snapshot table in the primary database.
    WarningTable {
        /// Table name.
        table: String,
    },
}

const fn default_min_features() -> usize {
    1
}

const fn default_html_days() -> u8 {
    5
}

/// Property layout of a WFS warning layer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WfsSchema {
    /// `Day_N` holds comma-separated numeric category codes, colours in
    /// `DayN_Color`.
    CategoryCodes,
    /// `Day_N` / `DayN_text` hold free text, colours in `dayN_color`.
    Named,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wfs_definition_with_defaults() {
        let def: SourceDefinition = toml::from_str(
            r#"
            id = "imd_wfs"
            name = "IMD district warnings"
            priority = 1

            [fetcher]
            type = "wfs"
            url = "https://example.test/wfs"
            schema = "category_codes"
            "#,
        )
        .unwrap();

        assert_eq!(def.kind(), SourceKind::Wfs);
        assert_eq!(def.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(def.max_retries, DEFAULT_MAX_RETRIES);
        assert!(def.enabled);
        assert_eq!(
            def.fetcher,
            FetcherConfig::Wfs {
                url: "https://example.test/wfs".to_string(),
                schema: WfsSchema::CategoryCodes,
                min_features: 1,
            }
        );
    }

    #[test]
    fn parses_html_definition() {
        let def: SourceDefinition = toml::from_str(
            r#"
            id = "imd_html"
            name = "IMD district-wise warning page"
            priority = 3
            timeout_secs = 120

            [fetcher]
            type = "html_warning"
            url = "https://example.test/districtWiseWarning.php"
            "#,
        )
        .unwrap();

        assert_eq!(def.kind(), SourceKind::HtmlWarning);
        assert_eq!(def.timeout_secs, 120);
        assert!(matches!(def.fetcher, FetcherConfig::HtmlWarning { days: 5, .. }));
    }

    #[test]
    fn rejects_unknown_fetcher() {
        let result: Result<SourceDefinition, _> = toml::from_str(
            r#"
            id = "x"
            name = "x"
            priority = 1

            [fetcher]
            type = "ftp"
            "#,
        );
        assert!(result.is_err());
    }
}
