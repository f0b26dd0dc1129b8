//! Flood forecast site feeds.
//!
//! Each forecast day has two GeoJSON point layers: `Floodday{N}.geojson`
//! (flood-level condition per gauge) and `Floodday{N}I.geojson` (reservoir
//! inflow per site). A failing URL is logged and skipped; the flood
//! pipeline works with whatever days are available.

use std::time::Duration;

use hazard_models::{DaySlot, FloodDataType, FloodObservation};
use hazard_spatial::{Crs, normalize_point};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parsing::clean_text;
use crate::{FetchContext, SourceError, retry};

/// Where and how to fetch the flood layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodFeedConfig {
    /// Directory URL holding the `Floodday*.geojson` files.
    pub base_url: String,
    /// Number of forecast days to fetch.
    #[serde(default = "default_days")]
    pub days: u8,
    /// Per-URL timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// HTTP retries for transient failures.
    #[serde(default)]
    pub max_retries: u32,
}

const fn default_days() -> u8 {
    hazard_models::FLOOD_FORECAST_DAYS
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for FloodFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aff.india-water.gov.in/textdata".to_string(),
            days: default_days(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl FloodFeedConfig {
    /// URL of one day's layer.
    #[must_use]
    pub fn url(&self, day: DaySlot, data_type: FloodDataType) -> String {
        let suffix = match data_type {
            FloodDataType::FloodLevel => "",
            FloodDataType::Inflow => "I",
        };
        format!(
            "{}/Floodday{}{suffix}.geojson",
            self.base_url.trim_end_matches('/'),
            day.number()
        )
    }
}

/// Fetches every configured flood layer, skipping the ones that fail.
pub async fn fetch_flood_observations(
    config: &FloodFeedConfig,
    ctx: &FetchContext,
) -> Vec<FloodObservation> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut observations = Vec::new();

    for day in DaySlot::range(config.days) {
        for data_type in [FloodDataType::FloodLevel, FloodDataType::Inflow] {
            let url = config.url(day, data_type);

            let body = match tokio::time::timeout(
                timeout,
                retry::send_json(|| ctx.client.get(&url), config.max_retries),
            )
            .await
            {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    log::warn!("Skipping flood layer {url}: {e}");
                    continue;
                }
                Err(_) => {
                    log::warn!("Skipping flood layer {url}: {}", SourceError::Timeout(timeout));
                    continue;
                }
            };

            let parsed = parse_flood_layer(&body, day, data_type);
            log::debug!("{url}: {} sites", parsed.len());
            observations.extend(parsed);
        }
    }

    log::info!("Fetched {} flood site observations", observations.len());
    observations
}

/// Parses one flood layer into observations.
///
/// Sites without a usable point keep `location: None` and are dropped later
/// by the district join.
#[must_use]
pub fn parse_flood_layer(body: &Value, day: DaySlot, data_type: FloodDataType) -> Vec<FloodObservation> {
    let Some(features) = body.get("features").and_then(Value::as_array) else {
        return Vec::new();
    };

    features
        .iter()
        .map(|feature| {
            let props = feature.get("properties").unwrap_or(&Value::Null);
            let location = feature
                .get("geometry")
                .and_then(|g| normalize_point(g, Crs::Wgs84).ok());

            FloodObservation {
                site_id: clean_text(props.get("id")),
                site_name: clean_text(props.get("SiteName")),
                river: clean_text(props.get("river")),
                district: clean_text(props.get("District")),
                state: clean_text(props.get("State")),
                forecast_day: day,
                data_type,
                flood_condition: match data_type {
                    FloodDataType::FloodLevel => clean_text(props.get("FloodCondition")),
                    FloodDataType::Inflow => None,
                },
                inflow: match data_type {
                    FloodDataType::FloodLevel => None,
                    FloodDataType::Inflow => clean_float(props.get("Inflow")),
                },
                location,
            }
        })
        .collect()
}

fn clean_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
