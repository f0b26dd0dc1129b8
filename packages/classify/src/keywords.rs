//! Ordered keyword table.

use hazard_models::HazardType;

use crate::config::HazardKeywords;

/// Lowercased, ordered hazard-type → keyword table.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(HazardType, Vec<String>)>,
}

impl KeywordTable {
    /// Builds a table, preserving configuration order.
    #[must_use]
    pub fn new(hazards: &[HazardKeywords]) -> Self {
        Self {
            entries: hazards
                .iter()
                .map(|h| {
                    (
                        h.hazard,
                        h.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Returns the first hazard type with a keyword occurring in the
    /// phrase (case-insensitive substring), or `None`.
    #[must_use]
    pub fn detect(&self, phrase: &str) -> Option<HazardType> {
        if phrase.trim().is_empty() {
            return None;
        }
        let lower = phrase.to_lowercase();

        self.entries
            .iter()
            .find(|(_, keywords)| contains_any(&lower, keywords))
            .map(|(hazard, _)| *hazard)
    }
}

/// Returns `true` if `haystack` contains any of the given needles.
pub fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_ref()))
}
