//! Classifier configuration.
//!
//! Loaded once at startup (embedded default or an override file) and
//! passed by reference into every classification call.

use hazard_models::{HazardType, Severity};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::ClassifyError;

const DEFAULT_CONFIG: &str = include_str!("../config/classifier.toml");

/// How a day's multi-value text is split into phrases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeparatorPolicy {
    /// Split on `,` only.
    Comma,
    /// Split on `,` and `+`.
    CommaOrPlus,
}

impl SeparatorPolicy {
    /// Splits text into trimmed, non-empty phrases.
    #[must_use]
    pub fn split(self, text: &str) -> Vec<String> {
        let is_sep = |c: char| match self {
            Self::Comma => c == ',',
            Self::CommaOrPlus => c == ',' || c == '+',
        };
        text.split(is_sep)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Which row's severity represents a (circle, day, hazard type) group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeverityPolicy {
    /// The first row encountered in the group.
    FirstSeen,
    /// The worst severity in the group.
    MostSevere,
}

impl SeverityPolicy {
    /// Picks the representative severity from severities in encounter
    /// order.
    pub fn pick<I>(self, severities: I) -> Option<Severity>
    where
        I: IntoIterator<Item = Severity>,
    {
        let mut iter = severities.into_iter();
        match self {
            Self::FirstSeen => iter.next(),
            Self::MostSevere => iter.max(),
        }
    }
}

/// Whether cyclone records require a warning colour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CyclonePolicy {
    /// Keyword match and colour in the gated set.
    Strict,
    /// Keyword match with any colour.
    Lenient,
}

/// One entry of the ordered keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardKeywords {
    pub hazard: HazardType,
    pub keywords: Vec<String>,
}

/// One entry of the colour table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSeverity {
    pub code: u8,
    pub severity: Severity,
}

/// Cyclone-adjacency settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycloneConfig {
    pub keywords: Vec<String>,
    pub separator: SeparatorPolicy,
    pub policy: CyclonePolicy,
    /// Colours admitted under [`CyclonePolicy::Strict`].
    pub gated_colors: Vec<u8>,
}

/// Inflow thresholds in cumecs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloodThresholds {
    /// Inflow strictly above this is `Extreme`.
    pub extreme_above: f64,
    /// Inflow at or above this is `Severe`.
    pub severe_at_least: f64,
    /// Inflow at or above this is `Above Normal`.
    pub above_normal_at_least: f64,
}

impl Default for FloodThresholds {
    fn default() -> Self {
        Self {
            extreme_above: 500.0,
            severe_at_least: 350.0,
            above_normal_at_least: 200.0,
        }
    }
}

/// The complete classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub separator: SeparatorPolicy,
    pub severity_policy: SeverityPolicy,
    /// Severity for colour codes missing from `colors`.
    pub fallback_severity: Severity,
    /// Phrases emitted with a null hazard value (compared lowercase).
    pub null_hazard_phrases: Vec<String>,
    pub hazards: Vec<HazardKeywords>,
    pub colors: Vec<ColorSeverity>,
    pub cyclone: CycloneConfig,
    #[serde(default)]
    pub flood: FloodThresholds,
}

impl ClassifierConfig {
    /// Parses and validates a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the TOML is malformed or fails
    /// validation.
    pub fn from_toml_str(s: &str) -> Result<Self, ClassifyError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (a development error).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG)
            .unwrap_or_else(|e| panic!("Failed to parse classifier.toml: {e}"))
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidConfig`] if the keyword table is
    /// empty, a hazard has no keywords, or a colour code is duplicated.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.hazards.is_empty() {
            return Err(ClassifyError::InvalidConfig {
                message: "keyword table is empty".to_string(),
            });
        }
        if let Some(entry) = self.hazards.iter().find(|h| h.keywords.is_empty()) {
            return Err(ClassifyError::InvalidConfig {
                message: format!("hazard {} has no keywords", entry.hazard),
            });
        }
        for (i, c) in self.colors.iter().enumerate() {
            if self.colors[..i].iter().any(|o| o.code == c.code) {
                return Err(ClassifyError::InvalidConfig {
                    message: format!("colour code {} is mapped twice", c.code),
                });
            }
        }
        Ok(())
    }

    /// Resolves a colour code through the colour table.
    ///
    /// Codes not in the table fall back to `fallback_severity`.
    #[must_use]
    pub fn severity_for_color(&self, code: u8) -> Severity {
        self.colors
            .iter()
            .find(|c| c.code == code)
            .map_or(self.fallback_severity, |c| c.severity)
    }

    /// Whether a phrase is a null-hazard sentinel.
    #[must_use]
    pub fn is_null_hazard(&self, phrase: &str) -> bool {
        let lower = phrase.trim().to_lowercase();
        self.null_hazard_phrases
            .iter()
            .any(|p| p.to_lowercase() == lower)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::embedded()
    }
}
