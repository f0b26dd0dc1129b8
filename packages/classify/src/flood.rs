//! Flood numeric threshold path.
//!
//! Flood sites are not classified by text. A flood-level reading carries a
//! published condition; an inflow reading is bucketed by thresholds. The
//! (condition, data type) pair then decides the severity.

use hazard_models::{DaySlot, FloodDataType, LocatedFloodObservation, Severity};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::FloodThresholds;

/// Condition of a flood site on a forecast day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum FloodCondition {
    Extreme,
    Severe,
    #[strum(serialize = "Above Normal")]
    AboveNormal,
    Normal,
    Unknown,
}

impl FloodCondition {
    /// Parses a published condition; anything unrecognised is `Unknown`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Unknown)
    }

    /// Buckets an inflow value. Missing or zero inflow is `Unknown`.
    #[must_use]
    pub fn from_inflow(inflow: Option<f64>, thresholds: &FloodThresholds) -> Self {
        match inflow {
            None => Self::Unknown,
            Some(v) if v == 0.0 || v.is_nan() => Self::Unknown,
            Some(v) if v > thresholds.extreme_above => Self::Extreme,
            Some(v) if v >= thresholds.severe_at_least => Self::Severe,
            Some(v) if v >= thresholds.above_normal_at_least => Self::AboveNormal,
            Some(_) => Self::Normal,
        }
    }
}

/// Maps a (condition, data type) pair to a severity.
///
/// `Normal` and `Unknown` raise no alert.
#[must_use]
pub const fn flood_severity(condition: FloodCondition, data_type: FloodDataType) -> Option<Severity> {
    match (condition, data_type) {
        (FloodCondition::Extreme, FloodDataType::FloodLevel) => Some(Severity::Extreme),
        (FloodCondition::Extreme, FloodDataType::Inflow)
        | (FloodCondition::Severe, FloodDataType::FloodLevel) => Some(Severity::High),
        (FloodCondition::Severe, FloodDataType::Inflow) => Some(Severity::Moderate),
        (FloodCondition::AboveNormal, _) => Some(Severity::Low),
        (FloodCondition::Normal | FloodCondition::Unknown, _) => None,
    }
}

/// An alerting flood site located in a district.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodAlert {
    pub indus_circle: String,
    pub district: String,
    pub day: DaySlot,
    pub data_type: FloodDataType,
    pub condition: FloodCondition,
    pub severity: Severity,
}

/// Condition of one observation.
#[must_use]
pub fn observation_condition(
    obs: &LocatedFloodObservation,
    thresholds: &FloodThresholds,
) -> FloodCondition {
    match obs.observation.data_type {
        FloodDataType::FloodLevel => FloodCondition::parse(obs.observation.flood_condition.as_deref()),
        FloodDataType::Inflow => FloodCondition::from_inflow(obs.observation.inflow, thresholds),
    }
}

/// Classifies located observations, keeping only those that alert.
#[must_use]
pub fn classify_flood(
    observations: &[LocatedFloodObservation],
    thresholds: &FloodThresholds,
) -> Vec<FloodAlert> {
    let alerts: Vec<FloodAlert> = observations
        .iter()
        .filter_map(|obs| {
            let condition = observation_condition(obs, thresholds);
            let data_type = obs.observation.data_type;
            let severity = flood_severity(condition, data_type)?;
            Some(FloodAlert {
                indus_circle: obs.indus_circle.clone(),
                district: obs.district.clone(),
                day: obs.observation.forecast_day,
                data_type,
                condition,
                severity,
            })
        })
        .collect();

    log::info!(
        "{} of {} located flood observations raise an alert",
        alerts.len(),
        observations.len()
    );
    alerts
}
