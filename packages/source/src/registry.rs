//! Study registry — loads all study definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/studies/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new city study is as
//! simple as creating a new TOML file and adding it to the list below.

use crate::study_def::{StudyDefinition, parse_study_toml};

/// TOML configs embedded at compile time.
const STUDY_TOMLS: &[(&str, &str)] = &[(
    "tokyo_arakawa",
    include_str!("../studies/tokyo_arakawa.toml"),
)];

/// Total number of configured studies (used in tests).
#[cfg(test)]
const EXPECTED_STUDY_COUNT: usize = 1;

/// Returns all configured study definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_studies() -> Vec<StudyDefinition> {
    STUDY_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_study_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a study definition by id.
#[must_use]
pub fn find_study(id: &str) -> Option<StudyDefinition> {
    all_studies().into_iter().find(|study| study.id == id)
}
