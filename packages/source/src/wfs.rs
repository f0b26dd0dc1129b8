//! `GeoServer` WFS `GetFeature` source.
//!
//! Fetches a GeoJSON feature collection and maps each feature's properties
//! onto a [`DistrictWarning`] according to the layer's [`WfsSchema`].
//! Features whose geometry cannot be built are skipped; the source only
//! fails when the payload itself is unusable.

use std::time::Duration;

use async_trait::async_trait;
use hazard_models::{DayWarning, DistrictWarning, HazardFeature, TEXT_FORECAST_DAYS};
use hazard_source_models::WfsSchema;
use hazard_spatial::{Crs, normalize_geometry};
use serde_json::Value;

use crate::parsing::{category_text, clean_color, clean_int, clean_text, parse_date_value};
use crate::{FetchContext, HazardSource, SourceError, retry};

/// A WFS layer publishing district warnings.
#[derive(Debug, Clone)]
pub struct WfsSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub schema: WfsSchema,
    pub min_features: usize,
    pub timeout: Duration,
    pub max_retries: u32,
}

#[async_trait]
impl HazardSource for WfsSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<HazardFeature>, SourceError> {
        log::info!("[{}] Fetching WFS layer {}", self.id, self.url);
        let body = retry::send_json(|| ctx.client.get(&self.url), self.max_retries).await?;
        parse_feature_collection(&self.id, &body, self.schema, self.min_features)
    }
}

/// Validates a GeoJSON feature collection and converts its features.
///
/// # Errors
///
/// Returns [`SourceError::InvalidPayload`] if the body is not a JSON object
/// with a `features` array or names an unsupported CRS, and
/// [`SourceError::Empty`] if the array holds fewer than `min_features`
/// entries.
pub fn parse_feature_collection(
    source_id: &str,
    body: &Value,
    schema: WfsSchema,
    min_features: usize,
) -> Result<Vec<HazardFeature>, SourceError> {
    let Some(object) = body.as_object() else {
        return Err(SourceError::InvalidPayload {
            message: "response is not a JSON object".to_string(),
        });
    };

    let Some(raw_features) = object.get("features").and_then(Value::as_array) else {
        return Err(SourceError::InvalidPayload {
            message: "'features' key missing or invalid".to_string(),
        });
    };

    if raw_features.len() < min_features.max(1) {
        return Err(SourceError::Empty);
    }

    let crs = Crs::from_crs_member(object.get("crs")).map_err(|e| SourceError::InvalidPayload {
        message: e.to_string(),
    })?;

    let mut features = Vec::with_capacity(raw_features.len());
    let mut skipped = 0usize;

    for raw in raw_features {
        let geometry = raw.get("geometry").unwrap_or(&Value::Null);
        let geometry = match normalize_geometry(geometry, crs) {
            Ok(mp) => mp,
            Err(e) => {
                skipped += 1;
                log::debug!("[{source_id}] skipping feature: {e}");
                continue;
            }
        };

        let props = raw.get("properties").unwrap_or(&Value::Null);
        features.push(HazardFeature {
            warning: parse_properties(props, schema),
            geometry: Some(geometry),
        });
    }

    log::info!(
        "[{source_id}] Parsed {} features ({skipped} skipped without usable geometry)",
        features.len()
    );

    Ok(features)
}

/// Maps one feature's properties onto a [`DistrictWarning`].
#[must_use]
pub fn parse_properties(props: &Value, schema: WfsSchema) -> DistrictWarning {
    let days = (1..=TEXT_FORECAST_DAYS)
        .map(|n| match schema {
            WfsSchema::CategoryCodes => {
                let text = category_text(props.get(format!("Day_{n}")));
                DayWarning {
                    condition: text.clone(),
                    text,
                    color: clean_color(props.get(format!("Day{n}_Color"))),
                }
            }
            WfsSchema::Named => DayWarning {
                condition: clean_text(props.get(format!("Day_{n}"))),
                text: clean_text(props.get(format!("Day{n}_text"))),
                color: clean_color(props.get(format!("day{n}_color"))),
            },
        })
        .collect();

    DistrictWarning {
        district_id: clean_int(props.get("Obj_id")),
        district: clean_text(props.get("District")),
        date: parse_date_value(props.get("Date")),
        days,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn pune_polygon() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[73.0, 18.0], [74.5, 18.0], [74.5, 19.0], [73.0, 19.0], [73.0, 18.0]]]
        })
    }

    #[test]
    fn parses_named_schema() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": pune_polygon(),
                "properties": {
                    "Obj_id": "521",
                    "District": "Pune",
                    "Date": "2024-06-01",
                    "Day_1": "Heavy Rain,Fog",
                    "Day1_text": "Heavy rain at isolated places",
                    "day1_color": 2,
                    "Day_2": "",
                    "day2_color": null
                }
            }]
        });

        let features = parse_feature_collection("test", &body, WfsSchema::Named, 1).unwrap();
        assert_eq!(features.len(), 1);

        let warning = &features[0].warning;
        assert_eq!(warning.district_id, Some(521));
        assert_eq!(warning.district.as_deref(), Some("Pune"));
        assert_eq!(warning.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(warning.days.len(), 5);
        assert_eq!(warning.days[0].condition.as_deref(), Some("Heavy Rain,Fog"));
        assert_eq!(warning.days[0].color, Some(2));
        assert!(warning.days[1].condition.is_none());
        assert!(warning.days[1].color.is_none());
        assert_eq!(features[0].geometry.as_ref().unwrap().0.len(), 1);
    }

    #[test]
    fn parses_category_code_schema() {
        let props = json!({
            "Obj_id": 7,
            "District": "Leh",
            "Day_1": "3,12",
            "Day1_Color": "1",
            "Day_2": "1",
            "Day2_Color": "4"
        });
        let warning = parse_properties(&props, WfsSchema::CategoryCodes);
        assert_eq!(
            warning.days[0].condition.as_deref(),
            Some("Heavy Snow + Cold Wave")
        );
        assert_eq!(warning.days[0].color, Some(1));
        assert_eq!(warning.days[1].condition.as_deref(), Some("No Warning"));
        assert!(warning.days[2].condition.is_none());
    }

    #[test]
    fn skips_features_without_coordinates() {
        let body = json!({
            "features": [
                {"geometry": {"type": "Polygon", "coordinates": [[[]]]}, "properties": {"District": "A"}},
                {"geometry": null, "properties": {"District": "B"}},
                {"properties": {"District": "C"}},
                {"geometry": pune_polygon(), "properties": {"District": "D"}}
            ]
        });
        let features = parse_feature_collection("test", &body, WfsSchema::Named, 1).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].warning.district.as_deref(), Some("D"));
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            parse_feature_collection("t", &json!([1, 2]), WfsSchema::Named, 1),
            Err(SourceError::InvalidPayload { .. })
        ));
        assert!(matches!(
            parse_feature_collection("t", &json!({"type": "FeatureCollection"}), WfsSchema::Named, 1),
            Err(SourceError::InvalidPayload { .. })
        ));
        assert!(matches!(
            parse_feature_collection("t", &json!({"features": []}), WfsSchema::Named, 1),
            Err(SourceError::Empty)
        ));
        assert!(matches!(
            parse_feature_collection(
                "t",
                &json!({
                    "crs": {"type": "name", "properties": {"name": "LOCAL_GRID"}},
                    "features": [{"geometry": pune_polygon(), "properties": {}}]
                }),
                WfsSchema::Named,
                1
            ),
            Err(SourceError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn reprojects_utm_collection_to_lon_lat() {
        let payload = json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:32643"}},
            "features": [{
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [370_000.0, 2_040_000.0],
                        [390_000.0, 2_040_000.0],
                        [390_000.0, 2_060_000.0],
                        [370_000.0, 2_060_000.0],
                        [370_000.0, 2_040_000.0]
                    ]]
                },
                "properties": {"District": "Pune"}
            }]
        });

        let features = parse_feature_collection("t", &payload, WfsSchema::Named, 1).unwrap();
        assert_eq!(features.len(), 1);
        let geometry = features[0].geometry.as_ref().unwrap();
        for c in &geometry.0[0].exterior().0 {
            assert!((73.0..75.0).contains(&c.x), "lon {}", c.x);
            assert!((18.0..19.0).contains(&c.y), "lat {}", c.y);
        }
    }
}
