//! Cyclone-adjacency classification.
//!
//! Unlike the text path, every phrase yields a row: admitted phrases carry
//! their district and colour, the rest are kept so the cyclone table still
//! shows what was forecast for the circle.

use chrono::NaiveDate;
use hazard_models::{DaySlot, DistrictHazardAssignment, TEXT_FORECAST_DAYS};

use crate::config::{ClassifierConfig, CyclonePolicy};
use crate::keywords::contains_any;

/// One phrase of one district's day slot for the cyclone table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclonePhrase {
    pub indus_circle: String,
    pub district: String,
    pub day: DaySlot,
    pub date: Option<NaiveDate>,
    pub phrase: String,
    pub color: Option<u8>,
    /// Whether the phrase passed the cyclone keyword and colour gate.
    pub admitted: bool,
}

impl CyclonePolicy {
    /// Whether a phrase with the given colour is admitted.
    #[must_use]
    pub fn admits(self, keyword_match: bool, color: Option<u8>, gated_colors: &[u8]) -> bool {
        let Some(color) = color else {
            return false;
        };
        keyword_match
            && match self {
                Self::Strict => gated_colors.contains(&color),
                Self::Lenient => true,
            }
    }
}

/// Explodes every day slot on the cyclone separator and applies the
/// cyclone gate under `policy`.
#[must_use]
pub fn classify_cyclone(
    assignments: &[DistrictHazardAssignment],
    config: &ClassifierConfig,
    policy: CyclonePolicy,
) -> Vec<CyclonePhrase> {
    let keywords: Vec<String> = config
        .cyclone
        .keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();

    let mut out = Vec::new();
    for assignment in assignments {
        let Some(warning) = assignment.warning.as_ref() else {
            continue;
        };

        for slot in DaySlot::range(TEXT_FORECAST_DAYS) {
            let Some(day) = warning.day(slot) else {
                continue;
            };
            let Some(text) = day.condition_text() else {
                continue;
            };

            for phrase in config.cyclone.separator.split(text) {
                let keyword_match = contains_any(&phrase.to_lowercase(), &keywords);
                out.push(CyclonePhrase {
                    indus_circle: assignment.indus_circle.clone(),
                    district: assignment.district.clone(),
                    day: slot,
                    date: warning.date,
                    admitted: policy.admits(keyword_match, day.color, &config.cyclone.gated_colors),
                    phrase,
                    color: day.color,
                });
            }
        }
    }

    log::debug!(
        "Cyclone classification ({policy}): {} phrases, {} admitted",
        out.len(),
        out.iter().filter(|p| p.admitted).count()
    );
    out
}

#[cfg(test)]
mod tests {
    use geo::Point;
    use hazard_models::{DayWarning, DistrictWarning};

    use super::*;

    fn assignment(text: &str, color: Option<u8>) -> DistrictHazardAssignment {
        DistrictHazardAssignment {
            district: "Visakhapatnam".to_string(),
            indus_circle: "AP".to_string(),
            circle_name: None,
            point: Point::new(83.2, 17.7),
            warning: Some(DistrictWarning {
                date: NaiveDate::from_ymd_opt(2024, 10, 20),
                days: vec![DayWarning {
                    condition: Some(text.to_string()),
                    text: None,
                    color,
                }],
                ..DistrictWarning::default()
            }),
        }
    }

    #[test]
    fn strict_gate_requires_warning_colour() {
        let config = ClassifierConfig::embedded();
        let rows = classify_cyclone(
            &[assignment("Heavy Rain, Squall", Some(4))],
            &config,
            CyclonePolicy::Strict,
        );
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.admitted));

        let rows = classify_cyclone(
            &[assignment("Heavy Rain, Squall", Some(2))],
            &config,
            CyclonePolicy::Strict,
        );
        assert!(rows.iter().all(|r| r.admitted));
    }

    #[test]
    fn lenient_gate_accepts_any_colour() {
        let config = ClassifierConfig::embedded();
        let rows = classify_cyclone(
            &[assignment("Strong Surface Winds", Some(4))],
            &config,
            CyclonePolicy::Lenient,
        );
        assert_eq!(rows.len(), 1);
        assert!(rows[0].admitted);
    }

    #[test]
    fn non_cyclone_phrases_are_kept_but_not_admitted() {
        let config = ClassifierConfig::embedded();
        let rows = classify_cyclone(
            &[assignment("Fog, No Warning", Some(1))],
            &config,
            CyclonePolicy::Lenient,
        );
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.admitted));
    }

    #[test]
    fn comma_only_split_keeps_plus_phrases_whole() {
        let config = ClassifierConfig::embedded();
        let rows = classify_cyclone(
            &[assignment("Heavy Rain + Fog", Some(1))],
            &config,
            CyclonePolicy::Strict,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phrase, "Heavy Rain + Fog");
    }

    #[test]
    fn missing_colour_is_never_admitted() {
        assert!(!CyclonePolicy::Lenient.admits(true, None, &[1, 2, 3]));
        assert!(!CyclonePolicy::Strict.admits(false, Some(1), &[1, 2, 3]));
    }
}
