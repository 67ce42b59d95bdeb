#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ward assembly and ranking.
//!
//! Joins the ward density and land-price tables by normalized name and
//! ranks wards by their density/price ratio. The density table defines
//! the ward universe; price rows that match no ward (city-level
//! aggregates, regional averages) are excluded rather than treated as
//! extra wards.

use std::collections::BTreeMap;

use thiserror::Error;
use venue_map_source::{
    ErrorPolicy, SourceError,
    parsing::{normalize_name, parse_decimal, parse_price},
    tables::TableRow,
};
use venue_map_ward_models::{ScoredWard, Ward};

/// Errors from ward assembly and scoring.
#[derive(Debug, Error)]
pub enum WardError {
    /// A precondition on the input data was violated.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the violated precondition.
        message: String,
    },

    /// A density or price cell could not be coerced to a number.
    #[error(transparent)]
    Parse(#[from] SourceError),

    /// A ward from the density table has no matching price row.
    #[error("no price row for ward '{ward}'")]
    MissingPrice {
        /// The ward missing from the price table.
        ward: String,
    },
}

/// Joins the density and price tables into [`Ward`] records, in density
/// table order.
///
/// Rows are matched by [`normalize_name`]. Price rows that match no
/// density row are logged at debug level and dropped; the price sources
/// typically carry city-level aggregate rows that are not wards.
///
/// # Errors
///
/// Under [`ErrorPolicy::Abort`], a non-numeric cell fails with
/// [`WardError::Parse`] and a ward without a price row fails with
/// [`WardError::MissingPrice`]. Under [`ErrorPolicy::Skip`] both drop
/// the ward with a warning.
pub fn assemble_wards(
    density_rows: &[TableRow],
    price_rows: &[TableRow],
    price_suffixes: &[String],
    policy: ErrorPolicy,
) -> Result<Vec<Ward>, WardError> {
    let mut price_by_name: BTreeMap<String, &TableRow> = price_rows
        .iter()
        .map(|row| (normalize_name(&row.name), row))
        .collect();

    let mut wards = Vec::with_capacity(density_rows.len());
    for row in density_rows {
        let price_row = price_by_name.remove(&normalize_name(&row.name));

        let density = match parse_decimal(&row.value) {
            Ok(value) => value,
            Err(error) => match policy {
                ErrorPolicy::Abort => return Err(error.into()),
                ErrorPolicy::Skip => {
                    log::warn!("Skipping ward '{}': {error}", row.name);
                    continue;
                }
            },
        };

        let Some(price_row) = price_row else {
            match policy {
                ErrorPolicy::Abort => {
                    return Err(WardError::MissingPrice {
                        ward: row.name.clone(),
                    });
                }
                ErrorPolicy::Skip => {
                    log::warn!("Skipping ward '{}': no price row", row.name);
                    continue;
                }
            }
        };

        let price = match parse_price(&price_row.value, price_suffixes) {
            Ok(value) => value,
            Err(error) => match policy {
                ErrorPolicy::Abort => return Err(error.into()),
                ErrorPolicy::Skip => {
                    log::warn!("Skipping ward '{}': {error}", row.name);
                    continue;
                }
            },
        };

        wards.push(Ward {
            name: row.name.clone(),
            density,
            price,
        });
    }

    for leftover in price_by_name.values() {
        log::debug!("Ignoring price row '{}': not a ward", leftover.name);
    }

    Ok(wards)
}

/// Ranks wards by density/price ratio, descending, and keeps the top
/// `top_n`.
///
/// The sort is stable, so wards with equal ratios keep their input
/// order. Pure; selecting which ward to drill into is left to the
/// caller.
///
/// # Errors
///
/// Returns [`WardError::InvalidInput`] naming the offending ward when
/// any ward has a non-positive density or price. No partial ranking is
/// produced in that case.
pub fn score_wards(wards: &[Ward], top_n: usize) -> Result<Vec<ScoredWard>, WardError> {
    for ward in wards {
        if ward.density <= 0.0 {
            return Err(WardError::InvalidInput {
                message: format!("ward '{}' has non-positive density {}", ward.name, ward.density),
            });
        }
        if ward.price <= 0.0 {
            return Err(WardError::InvalidInput {
                message: format!("ward '{}' has non-positive price {}", ward.name, ward.price),
            });
        }
    }

    let mut scored: Vec<ScoredWard> = wards
        .iter()
        .map(|ward| ScoredWard {
            ward: ward.clone(),
            ratio: ward.density / ward.price,
        })
        .collect();

    scored.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    scored.truncate(top_n);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, value: &str) -> TableRow {
        TableRow {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn ward(name: &str, density: f64, price: f64) -> Ward {
        Ward {
            name: name.to_string(),
            density,
            price,
        }
    }

    fn suffixes() -> Vec<String> {
        vec!["円/m²".to_string()]
    }

    #[test]
    fn joins_by_normalized_name_and_drops_aggregates() {
        let density_rows = vec![row("Arakawa", "9,416"), row("Taito", "19,506")];
        let price_rows = vec![
            row("Tokyo 23 wards average", "1,084,000円/m²"),
            row("taito ", "1,213,000円/m²"),
            row("ARAKAWA", "540,000円/m²"),
        ];

        let wards =
            assemble_wards(&density_rows, &price_rows, &suffixes(), ErrorPolicy::Abort).unwrap();

        assert_eq!(wards.len(), 2);
        assert_eq!(wards[0].name, "Arakawa");
        assert!((wards[0].density - 9416.0).abs() < f64::EPSILON);
        assert!((wards[0].price - 540_000.0).abs() < f64::EPSILON);
        assert_eq!(wards[1].name, "Taito");
    }

    #[test]
    fn missing_price_row_aborts_by_default() {
        let density_rows = vec![row("Arakawa", "9,416")];
        let price_rows = vec![row("Taito", "1,213,000円/m²")];

        let error = assemble_wards(&density_rows, &price_rows, &suffixes(), ErrorPolicy::Abort)
            .unwrap_err();
        assert!(matches!(error, WardError::MissingPrice { ward } if ward == "Arakawa"));
    }

    #[test]
    fn missing_price_row_skips_under_skip() {
        let density_rows = vec![row("Arakawa", "9,416"), row("Taito", "19,506")];
        let price_rows = vec![row("Taito", "1,213,000円/m²")];

        let wards =
            assemble_wards(&density_rows, &price_rows, &suffixes(), ErrorPolicy::Skip).unwrap();
        assert_eq!(wards.len(), 1);
        assert_eq!(wards[0].name, "Taito");
    }

    #[test]
    fn non_numeric_density_respects_the_policy() {
        let density_rows = vec![row("Arakawa", "n/a"), row("Taito", "19,506")];
        let price_rows = vec![
            row("Arakawa", "540,000円/m²"),
            row("Taito", "1,213,000円/m²"),
        ];

        let result = assemble_wards(&density_rows, &price_rows, &suffixes(), ErrorPolicy::Abort);
        assert!(matches!(result, Err(WardError::Parse(_))));

        let wards =
            assemble_wards(&density_rows, &price_rows, &suffixes(), ErrorPolicy::Skip).unwrap();
        assert_eq!(wards.len(), 1);
        assert_eq!(wards[0].name, "Taito");
    }

    #[test]
    fn ranks_by_ratio_with_stable_ties() {
        let wards = vec![
            ward("w0", 100.0, 10.0),
            ward("w1", 50.0, 5.0),
            ward("w2", 200.0, 50.0),
            ward("w3", 10.0, 2.0),
            ward("w4", 80.0, 40.0),
        ];

        let scored = score_wards(&wards, 10).unwrap();
        let names: Vec<&str> = scored
            .iter()
            .map(|scored| scored.ward.name.as_str())
            .collect();

        assert_eq!(names, vec!["w0", "w1", "w3", "w2", "w4"]);
        assert!((scored[0].ratio - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn truncates_to_top_n() {
        let wards = vec![
            ward("w0", 100.0, 10.0),
            ward("w1", 50.0, 5.0),
            ward("w2", 200.0, 50.0),
        ];

        let scored = score_wards(&wards, 2).unwrap();
        assert_eq!(scored.len(), 2);
    }

    #[test]
    fn non_positive_price_names_the_ward() {
        let wards = vec![ward("w0", 100.0, 10.0), ward("w1", 50.0, 0.0)];

        let error = score_wards(&wards, 10).unwrap_err();
        assert!(matches!(error, WardError::InvalidInput { message } if message.contains("w1")));
    }
}
