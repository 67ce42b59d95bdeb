//! Explore-endpoint client for venue lookups.
//!
//! Response shape follows the Foursquare v2 `venues/explore` API:
//! `response.groups[].items[].venue` with a `location` object and a
//! `categories` array where one entry may be flagged `primary`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use venue_map_discovery_models::{NeighborhoodLookup, Venue};
use venue_map_neighborhood_models::Neighborhood;
use venue_map_source::{progress::ProgressCallback, study_def::DiscoveryConfig};

use crate::{Credentials, DiscoveryError};

/// Fetches venues near one coordinate pair.
///
/// Returns an empty list when the area genuinely has no venues; that is
/// a valid result, not an error.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the HTTP request or response parsing
/// fails.
pub async fn explore_nearby(
    client: &reqwest::Client,
    config: &DiscoveryConfig,
    credentials: &Credentials,
    latitude: f64,
    longitude: f64,
) -> Result<Vec<Venue>, DiscoveryError> {
    let url = format!("{}/venues/explore", config.base_url);
    let ll = format!("{latitude},{longitude}");
    let radius = config.radius_m.to_string();
    let limit = config.limit.to_string();

    let resp = client
        .get(&url)
        .query(&[
            ("ll", ll.as_str()),
            ("radius", radius.as_str()),
            ("limit", limit.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("v", config.api_version.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Fetches venues for one neighborhood with a bounded attempt budget.
///
/// Transient failures (timeouts, connection errors, rate limits, server
/// errors) consume an attempt and back off exponentially; permanent
/// failures abort immediately.
///
/// # Errors
///
/// Returns [`DiscoveryError::Exhausted`] when `max_attempts` lookups all
/// fail transiently, or the underlying [`DiscoveryError`] for permanent
/// failures.
pub async fn explore_with_retry(
    client: &reqwest::Client,
    config: &DiscoveryConfig,
    credentials: &Credentials,
    neighborhood: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Vec<Venue>, DiscoveryError> {
    for attempt in 1..=config.max_attempts {
        match explore_nearby(client, config, credentials, latitude, longitude).await {
            Ok(venues) => return Ok(venues),
            Err(error) if is_transient(&error) => {
                log::warn!(
                    "Transient venue lookup failure for '{neighborhood}' \
                     (attempt {attempt}/{}): {error}",
                    config.max_attempts
                );
            }
            Err(error) => return Err(error),
        }

        if attempt < config.max_attempts {
            let backoff = Duration::from_secs(1_u64 << attempt);
            log::debug!("Retrying '{neighborhood}' in {}s", backoff.as_secs());
            tokio::time::sleep(backoff).await;
        }
    }

    Err(DiscoveryError::Exhausted {
        neighborhood: neighborhood.to_string(),
        attempts: config.max_attempts,
    })
}

/// Looks up venues for every neighborhood sequentially, pausing
/// `rate_limit_ms` between lookups.
///
/// A lookup that ultimately fails is recorded as
/// [`NeighborhoodLookup::Failed`] with a warning and the loop continues;
/// one unreachable neighborhood never costs the others their data.
///
/// # Errors
///
/// Returns [`DiscoveryError::Http`] only if the HTTP client itself
/// cannot be built. Per-neighborhood failures are captured in the
/// returned map.
pub async fn fetch_for_neighborhoods(
    config: &DiscoveryConfig,
    credentials: &Credentials,
    neighborhoods: &[Neighborhood],
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<BTreeMap<String, NeighborhoodLookup>, DiscoveryError> {
    let progress = progress.unwrap_or_else(venue_map_source::progress::null_progress);
    let client = venue_map_source::build_http_client()?;
    let pause = Duration::from_millis(config.rate_limit_ms);

    progress.set_total(neighborhoods.len() as u64);

    let mut lookups = BTreeMap::new();
    for (index, neighborhood) in neighborhoods.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pause).await;
        }
        progress.set_message(format!("Exploring {}", neighborhood.name));

        let lookup = match explore_with_retry(
            &client,
            config,
            credentials,
            &neighborhood.name,
            neighborhood.latitude,
            neighborhood.longitude,
        )
        .await
        {
            Ok(venues) => {
                log::debug!(
                    "Found {} venues near '{}'",
                    venues.len(),
                    neighborhood.name
                );
                NeighborhoodLookup::Fetched(venues)
            }
            Err(error) => {
                log::warn!("Venue lookup failed for '{}': {error}", neighborhood.name);
                NeighborhoodLookup::Failed {
                    message: error.to_string(),
                }
            }
        };

        lookups.insert(neighborhood.name.clone(), lookup);
        progress.inc(1);
    }

    progress.finish(format!(
        "Looked up venues for {} neighborhoods",
        neighborhoods.len()
    ));
    Ok(lookups)
}

/// Whether a failure is worth another attempt.
fn is_transient(error: &DiscoveryError) -> bool {
    match error {
        DiscoveryError::Http(error) => {
            error.is_timeout()
                || error.is_connect()
                || error.is_body()
                || error.is_decode()
                || error.status().is_some_and(|status| {
                    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                })
        }
        DiscoveryError::Parse { .. }
        | DiscoveryError::MissingCredentials { .. }
        | DiscoveryError::Exhausted { .. } => false,
    }
}

/// Parses an explore response body into venues.
fn parse_response(body: &serde_json::Value) -> Result<Vec<Venue>, DiscoveryError> {
    let groups = body
        .pointer("/response/groups")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| DiscoveryError::Parse {
            message: "missing response.groups in explore response".to_string(),
        })?;

    let mut venues = Vec::new();
    for group in groups {
        let Some(items) = group.get("items").and_then(serde_json::Value::as_array) else {
            continue;
        };
        for item in items {
            let Some(venue) = item.get("venue") else {
                continue;
            };
            match parse_venue(venue) {
                Some(venue) => venues.push(venue),
                None => {
                    log::debug!(
                        "Skipping venue without name, location, or category: {}",
                        venue.get("name").and_then(serde_json::Value::as_str).unwrap_or("?")
                    );
                }
            }
        }
    }

    Ok(venues)
}

/// Parses a single venue object, taking the primary category (or the
/// first when none is flagged primary).
fn parse_venue(venue: &serde_json::Value) -> Option<Venue> {
    let name = venue.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let location = venue.get("location")?;
    let latitude = location.get("lat")?.as_f64()?;
    let longitude = location.get("lng")?.as_f64()?;
    let category = primary_category(venue)?;

    Some(Venue {
        name: name.to_string(),
        latitude,
        longitude,
        category,
    })
}

/// Picks the category flagged `primary`, falling back to the first.
fn primary_category(venue: &serde_json::Value) -> Option<String> {
    let categories = venue.get("categories")?.as_array()?;
    let category = categories
        .iter()
        .find(|category| {
            category
                .get("primary")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        })
        .or_else(|| categories.first())?;

    category
        .get("name")
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explore_body(items: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "response": {
                "groups": [{ "name": "recommended", "items": items }]
            }
        })
    }

    #[test]
    fn parses_explore_response() {
        let body = explore_body(serde_json::json!([
            {
                "venue": {
                    "name": "Ogu no Pan",
                    "location": { "lat": 35.7465, "lng": 139.7661 },
                    "categories": [
                        { "name": "Convenience Store", "primary": false },
                        { "name": "Bakery", "primary": true }
                    ]
                }
            },
            {
                "venue": {
                    "name": "Cafe Machiya",
                    "location": { "lat": 35.7421, "lng": 139.7790 },
                    "categories": [{ "name": "Cafe" }]
                }
            }
        ]));

        let venues = parse_response(&body).unwrap();
        assert_eq!(venues.len(), 2);
        assert_eq!(venues[0].name, "Ogu no Pan");
        assert_eq!(venues[0].category, "Bakery");
        assert!((venues[0].latitude - 35.7465).abs() < 1e-4);
        assert_eq!(venues[1].category, "Cafe");
    }

    #[test]
    fn venue_without_category_is_skipped() {
        let body = explore_body(serde_json::json!([
            {
                "venue": {
                    "name": "Unlabeled Stand",
                    "location": { "lat": 35.7421, "lng": 139.7790 },
                    "categories": []
                }
            },
            {
                "venue": {
                    "name": "Cafe Machiya",
                    "location": { "lat": 35.7421, "lng": 139.7790 },
                    "categories": [{ "name": "Cafe" }]
                }
            }
        ]));

        let venues = parse_response(&body).unwrap();
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].name, "Cafe Machiya");
    }

    #[test]
    fn empty_groups_mean_no_venues() {
        let body = serde_json::json!({ "response": { "groups": [] } });
        assert!(parse_response(&body).unwrap().is_empty());
    }

    #[test]
    fn missing_groups_is_a_parse_error() {
        let body = serde_json::json!({ "meta": { "code": 200 } });
        assert!(matches!(
            parse_response(&body),
            Err(DiscoveryError::Parse { .. })
        ));
    }
}
