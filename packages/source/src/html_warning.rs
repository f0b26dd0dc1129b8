//! District-wise warning page scraper.
//!
//! The page is fetched once per forecast day (`?day=Day_N`). Each response
//! embeds a JavaScript `"areas": [...]` array with one object per district
//! carrying its title, id, fill colour, and an HTML balloon holding the
//! date and warning lines. Per-day rows are merged into one
//! [`HazardFeature`] per (district, district id); scraped features carry no
//! geometry.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use hazard_models::{DayWarning, DistrictWarning, HazardFeature};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::parsing::{clean_int, parse_date};
use crate::{FetchContext, HazardSource, SourceError, retry};

static AREAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"areas"\s*:\s*(\[\s*\{.*?\}\s*\])\s*,"#).expect("valid regex")
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date:\s*([0-9\-]+)").expect("valid regex"));

static P_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").unwrap_or_else(|_| unreachable!()));

/// Map fill colours to IMD colour codes.
const HEX_COLOR_CODES: &[(&str, u8)] = &[
    ("#FF0000", 1),
    ("#FFA500", 2),
    ("#FFFF00", 3),
    ("#7CFC00", 4),
];

/// The district-wise warning page.
#[derive(Debug, Clone)]
pub struct HtmlWarningSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub days: u8,
    pub timeout: Duration,
    pub max_retries: u32,
}

#[async_trait]
impl HazardSource for HtmlWarningSource {
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
        let mut rows = Vec::new();

        for day in 1..=self.days {
            let param = format!("Day_{day}");
            log::info!("[{}] Scraping {}?day={param}", self.id, self.url);

            let html = retry::send_text(
                || ctx.client.get(&self.url).query(&[("day", param.as_str())]),
                self.max_retries,
            )
            .await?;

            rows.extend(parse_day_page(&html, day)?);
        }

        let features = merge_by_district(rows, self.days);
        if features.is_empty() {
            return Err(SourceError::Empty);
        }

        log::info!("[{}] Scraped {} districts", self.id, features.len());
        Ok(features)
    }
}

/// One area object of the embedded map config.
#[derive(Debug, Deserialize)]
struct Area {
    title: Option<String>,
    id: Option<Value>,
    color: Option<String>,
    #[serde(rename = "balloonText", default)]
    balloon_text: String,
}

/// One district on one day's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedRow {
    pub day: u8,
    pub district: Option<String>,
    pub district_key: String,
    pub date: Option<String>,
    pub warning: String,
    pub color: Option<u8>,
}

/// Extracts every district row from one day's page.
///
/// # Errors
///
/// Returns [`SourceError::InvalidPayload`] if the page has no `"areas"`
/// array, and [`SourceError::Json`] if the array is not valid JSON.
pub fn parse_day_page(html: &str, day: u8) -> Result<Vec<ScrapedRow>, SourceError> {
    let Some(captures) = AREAS_RE.captures(html) else {
        return Err(SourceError::InvalidPayload {
            message: format!("could not find areas JSON for Day_{day}"),
        });
    };

    let raw = captures[1].replace('\n', "");
    let areas: Vec<Area> = serde_json::from_str(&raw)?;

    Ok(areas
        .into_iter()
        .map(|area| {
            let district_key = match &area.id {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            ScrapedRow {
                day,
                district: area.title,
                district_key,
                date: DATE_RE
                    .captures(&area.balloon_text)
                    .map(|c| c[1].to_string()),
                warning: balloon_warning(&area.balloon_text),
                color: area.color.as_deref().and_then(color_code),
            }
        })
        .collect())
}

/// Warning text from a balloon: `"No warning"` when the balloon says so,
/// otherwise the non-empty paragraphs (minus the "Updated" stamp) joined by
/// `", "`.
#[must_use]
pub fn balloon_warning(balloon: &str) -> String {
    if balloon.contains("No warning") {
        return "No warning".to_string();
    }

    let fragment = Html::parse_fragment(balloon);
    fragment
        .select(&P_SELECTOR)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty() && !t.contains("Updated"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps a hex fill colour to a colour code.
#[must_use]
pub fn color_code(hex: &str) -> Option<u8> {
    HEX_COLOR_CODES
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(hex.trim()))
        .map(|(_, code)| *code)
}

/// Merges per-day rows into one feature per (district, district id),
/// keeping first-seen order and the first-seen date.
#[must_use]
pub fn merge_by_district(rows: Vec<ScrapedRow>, days: u8) -> Vec<HazardFeature> {
    let mut index: BTreeMap<(Option<String>, String), usize> = BTreeMap::new();
    let mut merged: Vec<DistrictWarning> = Vec::new();

    for row in rows {
        let key = (row.district.clone(), row.district_key.clone());
        let idx = *index.entry(key).or_insert_with(|| {
            merged.push(DistrictWarning {
                district_id: clean_int(Some(&Value::String(row.district_key.clone()))),
                district: row.district.clone(),
                date: row.date.as_deref().and_then(parse_date),
                days: vec![DayWarning::default(); usize::from(days)],
            });
            merged.len() - 1
        });

        let Some(slot) = merged[idx].days.get_mut(usize::from(row.day.saturating_sub(1))) else {
            continue;
        };
        let text = if row.warning.is_empty() {
            None
        } else {
            Some(row.warning)
        };
        *slot = DayWarning {
            condition: text.clone(),
            text,
            color: row.color,
        };
    }

    merged
        .into_iter()
        .map(|warning| HazardFeature {
            warning,
            geometry: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const PAGE: &str = r##"
        <script>
        var map = AmCharts.makeChart("mapdiv", {
            "type": "map",
            "dataProvider": {
                "map": "indiaLow",
                "areas": [
                    {"title": "Pune", "id": "521", "color": "#FFA500",
                     "balloonText": "<b>Pune</b><br>Date: 2024-06-01<p>Heavy Rain</p><p> Thunderstorm &amp; Lightning </p><p>Updated: 08:00 IST</p>"},
                    {"title": "Leh", "id": 7, "color": "#7CFC00",
                     "balloonText": "Date: 2024-06-01 No warning"}
                ],
                "getAreasFromMap": true
            }
        });
        </script>
    "##;

    #[test]
    fn parses_areas_array() {
        let rows = parse_day_page(PAGE, 1).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].district.as_deref(), Some("Pune"));
        assert_eq!(rows[0].district_key, "521");
        assert_eq!(rows[0].date.as_deref(), Some("2024-06-01"));
        assert_eq!(rows[0].warning, "Heavy Rain, Thunderstorm & Lightning");
        assert_eq!(rows[0].color, Some(2));

        assert_eq!(rows[1].district_key, "7");
        assert_eq!(rows[1].warning, "No warning");
        assert_eq!(rows[1].color, Some(4));
    }

    #[test]
    fn missing_areas_is_invalid_payload() {
        assert!(matches!(
            parse_day_page("<html><body>maintenance</body></html>", 1),
            Err(SourceError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn merges_days_per_district() {
        let mut rows = parse_day_page(PAGE, 1).unwrap();
        rows.extend(parse_day_page(&PAGE.replace("#FFA500", "#FF0000"), 2).unwrap());

        let features = merge_by_district(rows, 5);
        assert_eq!(features.len(), 2);

        let pune = &features[0].warning;
        assert_eq!(pune.district_id, Some(521));
        assert_eq!(pune.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(pune.days[0].color, Some(2));
        assert_eq!(pune.days[1].color, Some(1));
        assert!(pune.days[2].condition.is_none());
        assert!(features[0].geometry.is_none());
    }

    #[test]
    fn hex_colours_are_case_insensitive() {
        assert_eq!(color_code("#ff0000"), Some(1));
        assert_eq!(color_code("#123456"), None);
    }
}
