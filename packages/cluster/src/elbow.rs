//! Elbow-method scan over candidate cluster counts.
//!
//! Reports the raw within-cluster sum of squared distances for each
//! candidate `k`. The scan is advisory: it never picks `k` itself, the
//! caller (usually a human reading the table) does.

use std::collections::BTreeMap;

use venue_map_profile::FrequencyVector;

use crate::{ClusterError, kmeans};

/// WCSS for one candidate cluster count.
#[derive(Debug, Clone, PartialEq)]
pub struct ElbowPoint {
    /// Candidate cluster count.
    pub k: usize,
    /// Within-cluster sum of squared distances at this `k`.
    pub wcss: f64,
}

/// Runs [`kmeans`] for every `k` in `1..=min(max_k, n)` with the same
/// seed and collects the WCSS curve.
///
/// # Errors
///
/// Returns [`ClusterError`] if any underlying [`kmeans`] run fails.
pub fn elbow_scan(
    vectors: &BTreeMap<String, FrequencyVector>,
    max_k: usize,
    seed: u64,
) -> Result<Vec<ElbowPoint>, ClusterError> {
    let upper = max_k.min(vectors.len());

    let mut points = Vec::with_capacity(upper);
    for k in 1..=upper {
        let result = kmeans(vectors, k, seed)?;
        log::debug!(
            "k = {k}: wcss = {:.6} after {} iterations",
            result.wcss,
            result.iterations
        );
        points.push(ElbowPoint {
            k,
            wcss: result.wcss,
        });
    }
    Ok(points)
}
