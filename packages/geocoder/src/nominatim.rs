//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance. [`geocode_neighborhoods`] honors the study's
//! `rate_limit_ms` between lookups; single-shot callers are responsible
//! for their own pacing.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::sync::Arc;
use std::time::Duration;

use venue_map_neighborhood_models::NeighborhoodCoordRow;
use venue_map_source::{ErrorPolicy, progress::ProgressCallback, study_def::GeocoderConfig};

use crate::{GeocodeError, GeocodedPlace};

/// Geocodes a free-form query (e.g., `"Machiya, Arakawa, Tokyo"`) using
/// the Nominatim search endpoint.
///
/// Returns `Ok(None)` when the service responds successfully but has no
/// match for the query.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    country_codes: &str,
) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let url = format!("{base_url}/search");
    let resp = client
        .get(&url)
        .query(&[
            ("q", query),
            ("countrycodes", country_codes),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let resp = resp.error_for_status()?;
    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Geocodes a free-form query with a bounded attempt budget.
///
/// An empty result, a rate-limit response, or a transient HTTP failure
/// consumes one attempt and backs off exponentially before the next try.
/// Permanent failures (client errors, malformed responses) abort
/// immediately.
///
/// # Errors
///
/// Returns [`GeocodeError::Exhausted`] when `max_attempts` lookups produce
/// no result, or the underlying [`GeocodeError`] for permanent failures.
pub async fn geocode_with_retry(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    country_codes: &str,
    max_attempts: u32,
) -> Result<GeocodedPlace, GeocodeError> {
    for attempt in 1..=max_attempts {
        match geocode_freeform(client, base_url, query, country_codes).await {
            Ok(Some(place)) => return Ok(place),
            Ok(None) => {
                log::debug!("No geocoding result for '{query}' (attempt {attempt}/{max_attempts})");
            }
            Err(error) if is_transient(&error) => {
                log::warn!("Transient geocoding failure for '{query}': {error}");
            }
            Err(error) => return Err(error),
        }

        if attempt < max_attempts {
            let backoff = Duration::from_secs(1_u64 << attempt);
            log::debug!("Retrying '{query}' in {}s", backoff.as_secs());
            tokio::time::sleep(backoff).await;
        }
    }

    Err(GeocodeError::Exhausted {
        query: query.to_string(),
        attempts: max_attempts,
    })
}

/// Geocodes every neighborhood name sequentially, pausing `rate_limit_ms`
/// between lookups.
///
/// Each query is composed as `"{name}, {ward}, {city}"` to anchor the
/// lookup inside the study area. Under [`ErrorPolicy::Abort`] the first
/// exhausted lookup fails the whole batch; under [`ErrorPolicy::Skip`] the
/// neighborhood is dropped with a warning and the batch continues.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP client cannot be built, or if a
/// lookup fails under [`ErrorPolicy::Abort`].
pub async fn geocode_neighborhoods(
    config: &GeocoderConfig,
    country_codes: &str,
    city: &str,
    ward: &str,
    names: &[String],
    policy: ErrorPolicy,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<Vec<NeighborhoodCoordRow>, GeocodeError> {
    let progress = progress.unwrap_or_else(venue_map_source::progress::null_progress);
    let client = venue_map_source::build_http_client()?;
    let pause = Duration::from_millis(config.rate_limit_ms);

    progress.set_total(names.len() as u64);

    let mut rows = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pause).await;
        }
        progress.set_message(format!("Geocoding {name}"));

        let query = format!("{name}, {ward}, {city}");
        match geocode_with_retry(
            &client,
            &config.base_url,
            &query,
            country_codes,
            config.max_attempts,
        )
        .await
        {
            Ok(place) => {
                log::debug!(
                    "Geocoded '{name}' to ({}, {})",
                    place.latitude,
                    place.longitude
                );
                rows.push(NeighborhoodCoordRow {
                    name: name.clone(),
                    latitude: place.latitude,
                    longitude: place.longitude,
                });
            }
            Err(error) => match policy {
                ErrorPolicy::Abort => return Err(error),
                ErrorPolicy::Skip => {
                    log::warn!("Skipping neighborhood '{name}': {error}");
                }
            },
        }

        progress.inc(1);
    }

    progress.finish(format!(
        "Geocoded {} of {} neighborhoods",
        rows.len(),
        names.len()
    ));
    Ok(rows)
}

/// Whether a failure is worth another attempt.
fn is_transient(error: &GeocodeError) -> bool {
    match error {
        GeocodeError::RateLimited => true,
        GeocodeError::Http(error) => {
            error.is_timeout()
                || error.is_connect()
                || error.is_body()
                || error.is_decode()
                || error
                    .status()
                    .is_some_and(|status| status.is_server_error())
        }
        GeocodeError::Parse { .. } | GeocodeError::Exhausted { .. } => false,
    }
}

/// Parses a Nominatim JSON response body.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedPlace {
        latitude,
        longitude,
        display_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "35.7420",
            "lon": "139.7790",
            "display_name": "Machiya, Arakawa, Tokyo, Japan"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 35.7420).abs() < 1e-4);
        assert!((result.longitude - 139.7790).abs() < 1e-4);
        assert_eq!(
            result.display_name.as_deref(),
            Some("Machiya, Arakawa, Tokyo, Japan")
        );
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn non_numeric_coordinate_is_a_parse_error() {
        let body = serde_json::json!([{ "lat": "north", "lon": "139.7790" }]);
        let error = parse_response(&body).unwrap_err();
        assert!(matches!(error, GeocodeError::Parse { message } if message.contains("lat")));
    }

    #[test]
    fn object_body_is_a_parse_error() {
        let body = serde_json::json!({ "error": "unable to geocode" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rate_limits_are_transient_but_parse_failures_are_not() {
        assert!(is_transient(&GeocodeError::RateLimited));
        assert!(!is_transient(&GeocodeError::Parse {
            message: "bad".to_string(),
        }));
        assert!(!is_transient(&GeocodeError::Exhausted {
            query: "Machiya, Arakawa, Tokyo".to_string(),
            attempts: 3,
        }));
    }
}
