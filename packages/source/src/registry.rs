//! Source registry: loads the fallback chain from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. The chain order is the `priority`
//! field, not the order of this list.

use std::time::Duration;

use hazard_source_models::{FetcherConfig, SourceDefinition};

use crate::HazardSource;
use crate::html_warning::HtmlWarningSource;
use crate::wfs::WfsSource;

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("imd_wfs", include_str!("../sources/imd_wfs.toml")),
    ("cite_wfs", include_str!("../sources/cite_wfs.toml")),
    ("imd_html", include_str!("../sources/imd_html.toml")),
    (
        "act_warning_table",
        include_str!("../sources/act_warning_table.toml"),
    ),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 4;

/// Parses a source definition from a TOML string.
///
/// # Errors
///
/// Returns the TOML error message if the string is not a valid definition.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

/// Returns all configured source definitions in priority order.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this is a development error).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    let mut defs: Vec<SourceDefinition> = SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect();
    defs.sort_by_key(|d| d.priority);
    defs
}

/// Keeps enabled definitions, optionally restricted to the given ids.
///
/// Unknown ids in the filter are logged and ignored. Priority order is
/// preserved regardless of filter order.
#[must_use]
pub fn select_sources(defs: Vec<SourceDefinition>, ids: Option<&[String]>) -> Vec<SourceDefinition> {
    if let Some(ids) = ids {
        for id in ids {
            if !defs.iter().any(|d| &d.id == id) {
                log::warn!("Unknown source id in filter: {id}");
            }
        }
    }

    defs.into_iter()
        .filter(|d| d.enabled)
        .filter(|d| ids.is_none_or(|ids| ids.iter().any(|id| id == &d.id)))
        .collect()
}

/// Builds the live source for an HTTP-backed definition.
///
/// Returns `None` for table-backed definitions, which need a database
/// handle and are built by the storage layer.
#[must_use]
pub fn build_http_source(def: &SourceDefinition) -> Option<Box<dyn HazardSource>> {
    let timeout = Duration::from_secs(def.timeout_secs);
    match &def.fetcher {
        FetcherConfig::Wfs {
            url,
            schema,
            min_features,
        } => Some(Box::new(WfsSource {
            id: def.id.clone(),
            name: def.name.clone(),
            url: url.clone(),
            schema: *schema,
            min_features: *min_features,
            timeout,
            max_retries: def.max_retries,
        })),
        FetcherConfig::HtmlWarning { url, days } => Some(Box::new(HtmlWarningSource {
            id: def.id.clone(),
            name: def.name.clone(),
            url: url.clone(),
            days: *days,
            timeout,
            max_retries: def.max_retries,
        })),
        FetcherConfig::WarningTable { .. } => None,
    }
}
