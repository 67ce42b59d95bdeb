#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Venue discovery around neighborhood centres.
//!
//! Queries a Foursquare-style explore endpoint for venues near each
//! neighborhood's coordinates. Lookups run sequentially with a pause
//! between requests and a bounded attempt budget per neighborhood; a
//! neighborhood whose lookup ultimately fails is recorded as
//! [`NeighborhoodLookup::Failed`](venue_map_discovery_models::NeighborhoodLookup)
//! and never aborts the rest of the batch.

pub mod explore;

use thiserror::Error;

/// Environment variable holding the discovery API client id.
pub const CLIENT_ID_VAR: &str = "VENUE_MAP_CLIENT_ID";

/// Environment variable holding the discovery API client secret.
pub const CLIENT_SECRET_VAR: &str = "VENUE_MAP_CLIENT_SECRET";

/// Discovery API credentials, resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    /// API client id.
    pub client_id: String,
    /// API client secret.
    pub client_secret: String,
}

impl Credentials {
    /// Reads credentials from [`CLIENT_ID_VAR`] and [`CLIENT_SECRET_VAR`].
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::MissingCredentials`] naming the first
    /// variable that is not set.
    pub fn from_env() -> Result<Self, DiscoveryError> {
        let client_id = std::env::var(CLIENT_ID_VAR).map_err(|_| {
            DiscoveryError::MissingCredentials {
                variable: CLIENT_ID_VAR.to_string(),
            }
        })?;
        let client_secret = std::env::var(CLIENT_SECRET_VAR).map_err(|_| {
            DiscoveryError::MissingCredentials {
                variable: CLIENT_SECRET_VAR.to_string(),
            }
        })?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

/// Errors from venue discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// A required credential environment variable is not set.
    #[error("{variable} environment variable not set")]
    MissingCredentials {
        /// Name of the missing environment variable.
        variable: String,
    },

    /// A neighborhood lookup produced no usable result within the
    /// attempt budget.
    #[error("venue lookup for '{neighborhood}' failed after {attempts} attempts")]
    Exhausted {
        /// The neighborhood whose lookup failed.
        neighborhood: String,
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}
