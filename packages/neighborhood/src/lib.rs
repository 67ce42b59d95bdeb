#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood assembly from three independently sourced tables.
//!
//! The id table (name + postal code), the land-price table, and the
//! geocoded coordinate table arrive as separate row sequences that are
//! only meaningful when they describe the same neighborhoods in the same
//! order. [`assemble_neighborhoods`] joins them positionally, but every
//! index is cross-checked by normalized name before anything is combined:
//! a silent ordering drift in one source surfaces as
//! [`AssembleError::Alignment`] instead of a scrambled dataset.

use thiserror::Error;
use venue_map_neighborhood_models::{
    Neighborhood, NeighborhoodCoordRow, NeighborhoodIdRow, NeighborhoodPriceRow,
};
use venue_map_source::{
    ErrorPolicy, SourceError,
    parsing::{normalize_name, parse_price},
};

/// Errors from neighborhood assembly.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The three input tables disagree on how many neighborhoods exist.
    #[error("table lengths differ: {ids} id rows, {prices} price rows, {coords} coordinate rows")]
    LengthMismatch {
        /// Number of id rows.
        ids: usize,
        /// Number of price rows.
        prices: usize,
        /// Number of coordinate rows.
        coords: usize,
    },

    /// Two tables name different neighborhoods at the same position.
    #[error("row {index} of the {column} table is '{right}', expected '{left}'")]
    Alignment {
        /// Zero-based row index where the tables disagree.
        index: usize,
        /// Which table disagrees with the id table.
        column: String,
        /// Name from the id table.
        left: String,
        /// Conflicting name from the other table.
        right: String,
    },

    /// A price cell could not be coerced to a number.
    #[error(transparent)]
    Parse(#[from] SourceError),
}

/// Joins the id, price, and coordinate tables into assembled
/// [`Neighborhood`] records, in input order.
///
/// All three tables must have equal length, and at every index the price
/// and coordinate rows must name the same neighborhood as the id row
/// (compared after [`normalize_name`]). Price cells are coerced with
/// [`parse_price`] using the study's unit suffixes.
///
/// # Errors
///
/// * [`AssembleError::LengthMismatch`] when the tables differ in length.
/// * [`AssembleError::Alignment`] when rows at the same index name
///   different neighborhoods. Alignment is structural and never skipped,
///   regardless of `policy`.
/// * [`AssembleError::Parse`] when a price cell is not numeric and
///   `policy` is [`ErrorPolicy::Abort`]; under [`ErrorPolicy::Skip`] the
///   record is dropped with a warning instead.
pub fn assemble_neighborhoods(
    ids: &[NeighborhoodIdRow],
    prices: &[NeighborhoodPriceRow],
    coords: &[NeighborhoodCoordRow],
    price_suffixes: &[String],
    policy: ErrorPolicy,
) -> Result<Vec<Neighborhood>, AssembleError> {
    if ids.len() != prices.len() || ids.len() != coords.len() {
        return Err(AssembleError::LengthMismatch {
            ids: ids.len(),
            prices: prices.len(),
            coords: coords.len(),
        });
    }

    let mut neighborhoods = Vec::with_capacity(ids.len());
    for (index, ((id, price), coord)) in ids.iter().zip(prices).zip(coords).enumerate() {
        check_alignment(index, &id.name, &price.name, "price")?;
        check_alignment(index, &id.name, &coord.name, "coordinate")?;

        let price_value = match parse_price(&price.price, price_suffixes) {
            Ok(value) => value,
            Err(error) => match policy {
                ErrorPolicy::Abort => return Err(error.into()),
                ErrorPolicy::Skip => {
                    log::warn!("Skipping neighborhood '{}': {error}", id.name);
                    continue;
                }
            },
        };

        neighborhoods.push(Neighborhood {
            name: id.name.clone(),
            postal_code: id.postal_code.clone(),
            latitude: coord.latitude,
            longitude: coord.longitude,
            price: price_value,
        });
    }

    Ok(neighborhoods)
}

/// Cross-checks that two tables name the same neighborhood at `index`.
fn check_alignment(
    index: usize,
    id_name: &str,
    other_name: &str,
    column: &str,
) -> Result<(), AssembleError> {
    if normalize_name(id_name) == normalize_name(other_name) {
        Ok(())
    } else {
        Err(AssembleError::Alignment {
            index,
            column: column.to_string(),
            left: id_name.to_string(),
            right: other_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, postal_code: &str) -> NeighborhoodIdRow {
        NeighborhoodIdRow {
            name: name.to_string(),
            postal_code: postal_code.to_string(),
        }
    }

    fn price(name: &str, price: &str) -> NeighborhoodPriceRow {
        NeighborhoodPriceRow {
            name: name.to_string(),
            price: price.to_string(),
        }
    }

    fn coord(name: &str, latitude: f64, longitude: f64) -> NeighborhoodCoordRow {
        NeighborhoodCoordRow {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }

    fn suffixes() -> Vec<String> {
        vec!["円/m²".to_string()]
    }

    #[test]
    fn assembles_aligned_tables_in_order() {
        let ids = vec![id("Machiya", "116-0001"), id("Minami-Senju", "116-0003")];
        let prices = vec![
            price("machiya", "305,000円/m²"),
            price("MINAMI-SENJU", "412,500円/m²"),
        ];
        let coords = vec![
            coord("Machiya ", 35.742, 139.779),
            coord("Minami-Senju", 35.733, 139.799),
        ];

        let neighborhoods =
            assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Abort)
                .unwrap();

        assert_eq!(neighborhoods.len(), 2);
        assert_eq!(neighborhoods[0].name, "Machiya");
        assert_eq!(neighborhoods[0].postal_code, "116-0001");
        assert!((neighborhoods[0].price - 305_000.0).abs() < f64::EPSILON);
        assert!((neighborhoods[1].latitude - 35.733).abs() < f64::EPSILON);
    }

    #[test]
    fn misaligned_row_names_the_index_and_both_names() {
        let ids = vec![
            id("Machiya", "116-0001"),
            id("Minami-Senju", "116-0003"),
            id("Nishi-Ogu", "116-0011"),
        ];
        let prices = vec![
            price("Machiya", "305,000円/m²"),
            price("Minami-Senju", "412,500円/m²"),
            price("Higashi-Ogu", "287,000円/m²"),
        ];
        let coords = vec![
            coord("Machiya", 35.742, 139.779),
            coord("Minami-Senju", 35.733, 139.799),
            coord("Nishi-Ogu", 35.747, 139.766),
        ];

        let error =
            assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Abort)
                .unwrap_err();

        match error {
            AssembleError::Alignment {
                index,
                column,
                left,
                right,
            } => {
                assert_eq!(index, 2);
                assert_eq!(column, "price");
                assert_eq!(left, "Nishi-Ogu");
                assert_eq!(right, "Higashi-Ogu");
            }
            other => panic!("expected Alignment, got {other:?}"),
        }
    }

    #[test]
    fn alignment_is_checked_even_under_skip() {
        let ids = vec![id("Machiya", "116-0001")];
        let prices = vec![price("Arakawa", "305,000円/m²")];
        let coords = vec![coord("Machiya", 35.742, 139.779)];

        let result = assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Skip);
        assert!(matches!(result, Err(AssembleError::Alignment { .. })));
    }

    #[test]
    fn length_mismatch_reports_all_three_counts() {
        let ids = vec![id("Machiya", "116-0001"), id("Minami-Senju", "116-0003")];
        let prices = vec![price("Machiya", "305,000円/m²")];
        let coords = vec![coord("Machiya", 35.742, 139.779)];

        let error =
            assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Abort)
                .unwrap_err();

        match error {
            AssembleError::LengthMismatch {
                ids: 2,
                prices: 1,
                coords: 1,
            } => {}
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_price_aborts_under_abort() {
        let ids = vec![id("Machiya", "116-0001")];
        let prices = vec![price("Machiya", "ask the agent")];
        let coords = vec![coord("Machiya", 35.742, 139.779)];

        let result =
            assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Abort);
        assert!(matches!(result, Err(AssembleError::Parse(_))));
    }

    #[test]
    fn unparsable_price_drops_the_record_under_skip() {
        let ids = vec![id("Machiya", "116-0001"), id("Minami-Senju", "116-0003")];
        let prices = vec![
            price("Machiya", "ask the agent"),
            price("Minami-Senju", "412,500円/m²"),
        ];
        let coords = vec![
            coord("Machiya", 35.742, 139.779),
            coord("Minami-Senju", 35.733, 139.799),
        ];

        let neighborhoods =
            assemble_neighborhoods(&ids, &prices, &coords, &suffixes(), ErrorPolicy::Skip)
                .unwrap();

        assert_eq!(neighborhoods.len(), 1);
        assert_eq!(neighborhoods[0].name, "Minami-Senju");
    }
}
