#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard taxonomy, severity ranks, and the canonical record types.
//!
//! Every stage of the pipeline speaks in these types: sources produce
//! [`HazardFeature`]s, the spatial engine produces
//! [`DistrictHazardAssignment`]s, and the aggregators produce
//! [`HazardTypeRecord`]s ready for storage. All geometries are WGS84
//! (EPSG:4326).

use chrono::{NaiveDate, NaiveDateTime};
use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of forecast day slots carried by text-based warning feeds.
pub const TEXT_FORECAST_DAYS: u8 = 5;

/// Number of forecast day slots carried by the flood feeds.
pub const FLOOD_FORECAST_DAYS: u8 = 7;

/// Severity rank of a hazard.
///
/// Variants are declared from least to most severe so the derived
/// ordering gives `Extreme > High > Moderate > Low`.
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
pub enum Severity {
    /// Colour code 4 (green).
    Low,
    /// Colour code 3 (yellow).
    Moderate,
    /// Colour code 2 (orange).
    High,
    /// Colour code 1 (red).
    Extreme,
}

impl Severity {
    /// Maps a feed colour code (1 = Extreme .. 4 = Low) to a severity.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not in the range 1-4.
    pub const fn from_color_code(code: u8) -> Result<Self, InvalidColorCodeError> {
        match code {
            1 => Ok(Self::Extreme),
            2 => Ok(Self::High),
            3 => Ok(Self::Moderate),
            4 => Ok(Self::Low),
            _ => Err(InvalidColorCodeError { code }),
        }
    }

    /// Returns the feed colour code for this severity.
    #[must_use]
    pub const fn color_code(self) -> u8 {
        match self {
            Self::Extreme => 1,
            Self::High => 2,
            Self::Moderate => 3,
            Self::Low => 4,
        }
    }

    /// Returns all severities from most to least severe.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Extreme, Self::High, Self::Moderate, Self::Low]
    }
}

/// Error returned when a colour code has no severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color code: {code}")]
pub struct InvalidColorCodeError {
    /// The colour code that was provided.
    pub code: u8,
}

/// Canonical hazard categories.
///
/// The string form (`"rainfall"`, `"coldhot"`, ...) is the hazard key used
/// in configuration and for table routing.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HazardType {
    Lightning,
    Rainfall,
    Wind,
    Fog,
    /// Cold wave, heat wave, cold day and hot day conditions.
    #[serde(rename = "coldhot")]
    #[strum(serialize = "coldhot")]
    ColdHot,
    Snowfall,
    Flood,
    Cyclone,
    Avalanche,
    Cloudburst,
    Landslide,
}

impl HazardType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Lightning,
            Self::Rainfall,
            Self::Wind,
            Self::Fog,
            Self::ColdHot,
            Self::Snowfall,
            Self::Flood,
            Self::Cyclone,
            Self::Avalanche,
            Self::Cloudburst,
            Self::Landslide,
        ]
    }
}

/// A 1-based forecast day slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DaySlot(u8);

impl DaySlot {
    /// Creates a day slot. Returns `None` for day 0.
    #[must_use]
    pub const fn new(day: u8) -> Option<Self> {
        if day == 0 { None } else { Some(Self(day)) }
    }

    /// Iterates day slots `1..=count`.
    pub fn range(count: u8) -> impl Iterator<Item = Self> {
        (1..=count).map(Self)
    }

    /// The 1-based day number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into a per-day array.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The storage label (`"Day1"` .. `"Day7"`).
    #[must_use]
    pub fn label(self) -> String {
        format!("Day{}", self.0)
    }

    /// Returns the calendar date of this slot given the day-1 date.
    #[must_use]
    pub fn date_from(self, base: NaiveDate) -> NaiveDate {
        base + chrono::Days::new(u64::from(self.0 - 1))
    }
}

impl std::fmt::Display for DaySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Day{}", self.0)
    }
}

/// One forecast day of a district warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWarning {
    /// Hazard condition text (possibly multi-valued, comma/plus separated).
    pub condition: Option<String>,
    /// Free-text description published alongside the condition.
    pub text: Option<String>,
    /// Colour code (1 = Extreme .. 4 = Low).
    pub color: Option<u8>,
}

impl DayWarning {
    /// Severity implied by the colour code, if any.
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        self.color
            .and_then(|code| Severity::from_color_code(code).ok())
    }

    /// Returns the condition text if it is present and non-blank.
    #[must_use]
    pub fn condition_text(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Per-district warning attributes, independent of geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictWarning {
    /// Feed-side district identifier.
    pub district_id: Option<i64>,
    /// Feed-side district name.
    pub district: Option<String>,
    /// Observation (issue) date; day 1 of the forecast.
    pub date: Option<NaiveDate>,
    /// Forecast days, index 0 = day 1.
    pub days: Vec<DayWarning>,
}

impl DistrictWarning {
    /// Returns the warning for a day slot, if the feed carries it.
    #[must_use]
    pub fn day(&self, slot: DaySlot) -> Option<&DayWarning> {
        self.days.get(slot.index())
    }
}

/// One feature from a hazard source.
///
/// Scraped sources carry no geometry; it is resolved from the district
/// boundary reference before spatial assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardFeature {
    /// Warning attributes.
    pub warning: DistrictWarning,
    /// Hazard coverage, always a `MultiPolygon` once normalized.
    pub geometry: Option<MultiPolygon<f64>>,
}

/// Reference geometry for one district.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictGeometry {
    /// District name.
    pub district: String,
    /// Operator circle identifier.
    pub indus_circle: String,
    /// Human-readable circle name.
    pub circle_name: Option<String>,
    /// District boundary, when the reference carries polygons.
    pub boundary: Option<MultiPolygon<f64>>,
    /// District centroid (or the reference point itself).
    pub point: Point<f64>,
}

/// A district paired with the hazard feature covering it.
///
/// The geometry kept is always the district point.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictHazardAssignment {
    /// District name from the reference geometry.
    pub district: String,
    /// Operator circle identifier.
    pub indus_circle: String,
    /// Human-readable circle name.
    pub circle_name: Option<String>,
    /// District point.
    pub point: Point<f64>,
    /// Warning of the covering hazard feature. `None` for districts kept
    /// by a left join with no covering feature.
    pub warning: Option<DistrictWarning>,
}

/// Which flood feed an observation came from.
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
pub enum FloodDataType {
    /// Discrete flood-level condition per gauge site.
    FloodLevel,
    /// Continuous reservoir inflow per site.
    Inflow,
}

/// One flood forecast site reading for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodObservation {
    pub site_id: Option<String>,
    pub site_name: Option<String>,
    pub river: Option<String>,
    /// District as published by the flood feed (informational).
    pub district: Option<String>,
    pub state: Option<String>,
    pub forecast_day: DaySlot,
    pub data_type: FloodDataType,
    /// `FloodCondition` property of flood-level readings.
    pub flood_condition: Option<String>,
    /// `Inflow` property of inflow readings.
    pub inflow: Option<f64>,
    /// Site location.
    pub location: Option<Point<f64>>,
}

/// A flood observation located inside a reference district.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedFloodObservation {
    pub observation: FloodObservation,
    /// Reference district containing the site.
    pub district: String,
    pub indus_circle: String,
}

/// The canonical output row for one (hazard type, circle, day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardTypeRecord {
    pub hazard_type: HazardType,
    pub indus_circle: String,
    pub day: DaySlot,
    pub date: NaiveDate,
    /// Deduplicated, sorted district names.
    pub districts: Vec<String>,
    pub hazard_value: Option<String>,
    pub description: Option<String>,
    pub severity: Option<Severity>,
    pub insert_at: NaiveDateTime,
}

impl HazardTypeRecord {
    /// Comma-joined district list, or `None` when no district qualified.
    #[must_use]
    pub fn district_list(&self) -> Option<String> {
        if self.districts.is_empty() {
            None
        } else {
            Some(self.districts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Extreme > Severity::High);
        assert!(Severity::High > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Low);
        assert_eq!(
            Severity::all().iter().max().copied(),
            Some(Severity::Extreme)
        );
    }

    #[test]
    fn severity_color_codes() {
        assert_eq!(Severity::from_color_code(1), Ok(Severity::Extreme));
        assert_eq!(Severity::from_color_code(2), Ok(Severity::High));
        assert_eq!(Severity::from_color_code(3), Ok(Severity::Moderate));
        assert_eq!(Severity::from_color_code(4), Ok(Severity::Low));
        assert!(Severity::from_color_code(0).is_err());
        assert_eq!(
            Severity::from_color_code(5).unwrap_err().to_string(),
            "Invalid color code: 5"
        );
        for severity in Severity::all() {
            assert_eq!(
                Severity::from_color_code(severity.color_code()),
                Ok(*severity)
            );
        }
    }

    #[test]
    fn hazard_keys() {
        assert_eq!(HazardType::ColdHot.as_ref(), "coldhot");
        assert_eq!(HazardType::Rainfall.to_string(), "rainfall");
        assert_eq!(HazardType::from_str("coldhot"), Ok(HazardType::ColdHot));
        assert_eq!(HazardType::from_str("Fog"), Ok(HazardType::Fog));
        assert!(HazardType::from_str("tsunami").is_err());
        assert_eq!(
            serde_json::to_string(&HazardType::ColdHot).unwrap(),
            "\"coldhot\""
        );
    }

    #[test]
    fn day_slot_labels_and_dates() {
        assert!(DaySlot::new(0).is_none());
        let day3 = DaySlot::new(3).unwrap();
        assert_eq!(day3.label(), "Day3");
        assert_eq!(day3.index(), 2);
        let base = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(
            day3.date_from(base),
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap()
        );
        assert_eq!(DaySlot::range(FLOOD_FORECAST_DAYS).count(), 7);
    }

    #[test]
    fn blank_condition_is_absent() {
        let day = DayWarning {
            condition: Some("   ".to_string()),
            text: None,
            color: Some(2),
        };
        assert!(day.condition_text().is_none());
        assert_eq!(day.severity(), Some(Severity::High));
    }

    #[test]
    fn empty_district_list_is_null() {
        let record = HazardTypeRecord {
            hazard_type: HazardType::Cyclone,
            indus_circle: "AP".to_string(),
            day: DaySlot::new(1).unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            districts: Vec::new(),
            hazard_value: None,
            description: None,
            severity: None,
            insert_at: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
        };
        assert!(record.district_list().is_none());
    }
}
