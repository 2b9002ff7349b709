//! K-means over cosine distance.
//!
//! # Algorithm
//!
//! 1. Seed `k` centroids from `k` distinct random item indices
//! 2. Assign each vector to the centroid with the smallest cosine distance
//! 3. Stop if no assignment changed
//! 4. Recompute centroids as component-wise means; empty clusters keep
//!    their previous centroid
//! 5. Repeat until stable or `max_iterations`

use super::similarity::cosine_distance;
use crate::config::KMeansConfig;
use crate::types::error::{HexmapError, Result};
use rand::seq::index;
use rand::RngCore;

const UNASSIGNED: usize = usize::MAX;

/// Outcome of one k-means run.
#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Cluster index per input vector
    pub assignments: Vec<usize>,

    /// Final centroids (length `k`)
    pub centroids: Vec<Vec<f32>>,

    /// Assignment rounds executed
    pub iterations: usize,

    /// Whether memberships stabilized before the iteration cap
    pub converged: bool,
}

/// Cluster vectors into `k` groups by cosine distance.
///
/// # Arguments
///
/// * `vectors` - Non-zero vectors of one dimension
/// * `k` - Number of clusters, `1..=vectors.len()`
/// * `config` - Iteration limit
/// * `rng` - Random source for centroid seeding
///
/// # Errors
///
/// Returns `HexmapError::ClusteringError` if:
/// - `vectors` is empty or `k` is out of range
/// - A vector has zero norm or a mismatched dimension
pub fn kmeans_cosine(
    vectors: &[Vec<f32>],
    k: usize,
    config: &KMeansConfig,
    rng: &mut dyn RngCore,
) -> Result<KMeansOutcome> {
    let n = vectors.len();
    if n == 0 {
        return Err(HexmapError::clustering("vectors must not be empty"));
    }
    if k == 0 || k > n {
        return Err(HexmapError::clustering(format!(
            "k ({}) must be in 1..={}",
            k, n
        )));
    }
    if config.max_iterations == 0 {
        return Err(HexmapError::clustering("max_iterations must be > 0"));
    }

    let dim = vectors[0].len();
    if let Some(i) = vectors.iter().position(|v| v.len() != dim) {
        return Err(HexmapError::clustering(format!(
            "vector {} has dimension {}, expected {}",
            i,
            vectors[i].len(),
            dim
        )));
    }
    if let Some(i) = vectors.iter().position(|v| super::similarity::norm(v) == 0.0) {
        return Err(HexmapError::clustering(format!(
            "vector {} has zero norm",
            i
        )));
    }

    let mut centroids: Vec<Vec<f32>> = index::sample(rng, n, k)
        .into_iter()
        .map(|i| vectors[i].clone())
        .collect();

    let mut assignments = vec![UNASSIGNED; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..config.max_iterations {
        iterations += 1;

        let mut changed = false;
        for (i, vector) in vectors.iter().enumerate() {
            if let Some(best) = nearest_centroid(vector, &centroids) {
                if assignments[i] != best {
                    assignments[i] = best;
                    changed = true;
                }
            }
        }

        if !changed {
            converged = true;
            break;
        }

        recompute_centroids(vectors, &assignments, &mut centroids);
    }

    if assignments.contains(&UNASSIGNED) {
        return Err(HexmapError::clustering(
            "an item had no comparable centroid",
        ));
    }

    tracing::debug!(k, n, iterations, converged, "K-means finished");

    Ok(KMeansOutcome {
        assignments,
        centroids,
        iterations,
        converged,
    })
}

/// Index of the closest centroid; ties go to the lowest index.
///
/// Centroids with zero norm are never chosen.
fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, centroid) in centroids.iter().enumerate() {
        let Some(dist) = cosine_distance(vector, centroid) else {
            continue;
        };
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((j, dist)),
        }
    }
    best.map(|(j, _)| j)
}

fn recompute_centroids(vectors: &[Vec<f32>], assignments: &[usize], centroids: &mut [Vec<f32>]) {
    let dim = vectors[0].len();
    let k = centroids.len();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];

    for (vector, &cluster) in vectors.iter().zip(assignments) {
        if cluster == UNASSIGNED {
            continue;
        }
        counts[cluster] += 1;
        for (s, v) in sums[cluster].iter_mut().zip(vector) {
            *s += f64::from(*v);
        }
    }

    for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
        if count > 0 {
            *centroid = sum.into_iter().map(|s| (s / count as f64) as f32).collect();
        }
    }
}
