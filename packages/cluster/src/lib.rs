#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seeded k-means clustering over neighborhood frequency vectors.
//!
//! Small data, full determinism: k-means++ initialization drawn from
//! `StdRng::seed_from_u64(seed)`, Lloyd iterations with Euclidean
//! distance, and empty clusters re-seeded from the farthest point.
//! Identical input, `k`, and seed always produce the identical
//! partition. Cluster labels carry no meaning across runs; callers may
//! rely only on label equality within one run.

pub mod elbow;

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use venue_map_profile::{FrequencyVector, VenueProfile};

/// Upper bound on Lloyd iterations when assignments refuse to settle.
pub const MAX_ITERATIONS: usize = 100;

/// Errors from clustering.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A precondition on `k` or the input vectors was violated.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the violated precondition.
        message: String,
    },

    /// A vector's dimension disagrees with the category universe.
    #[error("vector for '{neighborhood}' has {got} dimensions, expected {expected}")]
    DimensionMismatch {
        /// The neighborhood whose vector is ragged.
        neighborhood: String,
        /// Dimension shared by the rest of the vectors.
        expected: usize,
        /// Dimension actually found.
        got: usize,
    },
}

/// Outcome of one k-means run.
#[derive(Debug, Clone)]
pub struct KmeansResult {
    /// Cluster label per neighborhood name.
    pub assignments: BTreeMap<String, u32>,
    /// Final centroid per cluster label.
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances.
    pub wcss: f64,
    /// Lloyd iterations actually run.
    pub iterations: usize,
}

/// One neighborhood's cluster label with its most frequent categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    /// Neighborhood name.
    pub neighborhood: String,
    /// Cluster label within this run.
    pub label: u32,
    /// Categories ranked by frequency, most frequent first.
    pub top_categories: Vec<String>,
}

/// Partitions the vectors into `k` clusters.
///
/// Input order does not matter; vectors are processed in name order so
/// the run is reproducible regardless of how the map was built.
///
/// # Errors
///
/// * [`ClusterError::InvalidInput`] unless 1 ≤ `k` ≤ number of vectors.
/// * [`ClusterError::DimensionMismatch`] when any vector's length
///   differs from the first vector's, naming the neighborhood.
pub fn kmeans(
    vectors: &BTreeMap<String, FrequencyVector>,
    k: usize,
    seed: u64,
) -> Result<KmeansResult, ClusterError> {
    if k == 0 {
        return Err(ClusterError::InvalidInput {
            message: "k must be at least 1".to_string(),
        });
    }
    if k > vectors.len() {
        return Err(ClusterError::InvalidInput {
            message: format!(
                "k = {k} exceeds the {} clusterable neighborhoods",
                vectors.len()
            ),
        });
    }

    let dimension = vectors
        .values()
        .next()
        .map_or(0, |vector| vector.values.len());

    let mut names = Vec::with_capacity(vectors.len());
    let mut points: Vec<&[f64]> = Vec::with_capacity(vectors.len());
    for (name, vector) in vectors {
        if vector.values.len() != dimension {
            return Err(ClusterError::DimensionMismatch {
                neighborhood: name.clone(),
                expected: dimension,
                got: vector.values.len(),
            });
        }
        names.push(name.as_str());
        points.push(vector.values.as_slice());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_centroids(&points, k, &mut rng);
    let mut assignments: Vec<usize> = points
        .iter()
        .map(|point| nearest_centroid(point, &centroids))
        .collect();

    let mut iterations = 0;
    for iteration in 1..=MAX_ITERATIONS {
        iterations = iteration;

        let counts = update_centroids(&points, &assignments, &mut centroids, dimension);
        reseed_empty_clusters(&points, &mut assignments, &mut centroids, counts);

        let next: Vec<usize> = points
            .iter()
            .map(|point| nearest_centroid(point, &centroids))
            .collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }

    let wcss = assignments
        .iter()
        .zip(&points)
        .map(|(&cluster, point)| squared_distance(point, &centroids[cluster]))
        .sum();

    #[allow(clippy::cast_possible_truncation)] // labels are bounded by k
    let assignments = names
        .iter()
        .zip(&assignments)
        .map(|(&name, &cluster)| (name.to_string(), cluster as u32))
        .collect();

    Ok(KmeansResult {
        assignments,
        centroids,
        wcss,
        iterations,
    })
}

/// Clusters a profile's `Profiled` neighborhoods and attaches each one's
/// `top_k` most frequent categories.
///
/// # Errors
///
/// Returns [`ClusterError`] under the same preconditions as [`kmeans`].
pub fn assign(
    profile: &VenueProfile,
    k: usize,
    seed: u64,
    top_k: usize,
) -> Result<Vec<ClusterAssignment>, ClusterError> {
    let vectors = profile.clusterable();
    let result = kmeans(&vectors, k, seed)?;

    let mut out = Vec::with_capacity(result.assignments.len());
    for (neighborhood, label) in &result.assignments {
        let top_categories = venue_map_profile::top_k(
            profile.universe(),
            &vectors[neighborhood],
            top_k,
        )
        .into_iter()
        .map(|(category, _)| category)
        .collect();

        out.push(ClusterAssignment {
            neighborhood: neighborhood.clone(),
            label: *label,
            top_categories,
        });
    }
    Ok(out)
}

/// k-means++ initialization: the first centroid is drawn uniformly, each
/// subsequent one with probability proportional to its squared distance
/// from the nearest existing centroid.
fn init_centroids(points: &[&[f64]], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let first = rng.gen_range(0..points.len());
    let mut centroids = vec![points[first].to_vec()];

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|point| {
                centroids
                    .iter()
                    .map(|centroid| squared_distance(point, centroid))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = points.len() - 1;
            for (index, weight) in weights.iter().enumerate() {
                target -= weight;
                if target <= 0.0 {
                    chosen = index;
                    break;
                }
            }
            chosen
        } else {
            // All remaining points coincide with a centroid.
            rng.gen_range(0..points.len())
        };

        centroids.push(points[chosen].to_vec());
    }

    centroids
}

/// Index of the closest centroid; ties keep the lowest label.
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}

/// Moves each centroid to the mean of its members. Returns the member
/// count per cluster; empty clusters keep their previous centroid for
/// [`reseed_empty_clusters`] to fix.
fn update_centroids(
    points: &[&[f64]],
    assignments: &[usize],
    centroids: &mut [Vec<f64>],
    dimension: usize,
) -> Vec<usize> {
    let mut sums = vec![vec![0.0; dimension]; centroids.len()];
    let mut counts = vec![0_usize; centroids.len()];

    for (point, &cluster) in points.iter().zip(assignments) {
        counts[cluster] += 1;
        for (dim, value) in point.iter().enumerate() {
            sums[cluster][dim] += value;
        }
    }

    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count > 0 {
            #[allow(clippy::cast_precision_loss)] // member counts are small
            let count = count as f64;
            for (dim, value) in sum.into_iter().enumerate() {
                centroid[dim] = value / count;
            }
        }
    }

    counts
}

/// Re-seeds every empty cluster from the point currently farthest from
/// its own centroid. Deterministic: on ties the lowest point index wins.
fn reseed_empty_clusters(
    points: &[&[f64]],
    assignments: &mut [usize],
    centroids: &mut [Vec<f64>],
    mut counts: Vec<usize>,
) {
    for cluster in 0..centroids.len() {
        if counts[cluster] > 0 {
            continue;
        }

        let mut farthest = 0;
        let mut farthest_distance = -1.0;
        for (index, point) in points.iter().enumerate() {
            let distance = squared_distance(point, &centroids[assignments[index]]);
            if distance > farthest_distance {
                farthest_distance = distance;
                farthest = index;
            }
        }

        centroids[cluster] = points[farthest].to_vec();
        counts[assignments[farthest]] -= 1;
        assignments[farthest] = cluster;
        counts[cluster] = 1;
    }
}

/// Squared Euclidean distance.
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
