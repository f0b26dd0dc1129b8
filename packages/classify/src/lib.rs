#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard classification and severity resolution.
//!
//! Two paths share this crate:
//!
//! * text: day-slot warning text is split into phrases, each phrase is
//!   matched against an ordered keyword table, and the day's colour code
//!   is resolved to a [`Severity`](hazard_models::Severity)
//!   ([`text`], [`cyclone`]);
//! * numeric: flood-level conditions and reservoir inflow values are mapped
//!   to severities through fixed thresholds ([`flood`]).

pub mod config;
pub mod cyclone;
pub mod flood;
pub mod keywords;
pub mod text;

pub use config::{ClassifierConfig, CyclonePolicy, SeparatorPolicy, SeverityPolicy};
pub use keywords::KeywordTable;
pub use text::{ClassifiedPhrase, classify_assignments};

/// Errors raised while loading classifier configuration.
///
/// Unclassifiable phrases are not errors; they are dropped.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The configuration TOML is malformed.
    #[error("Classifier config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration parsed but is inconsistent.
    #[error("Invalid classifier config: {message}")]
    InvalidConfig {
        /// Description of what is wrong.
        message: String,
    },
}
