//! Neighbor-graph projection to 2D.
//!
//! # Algorithm
//!
//! ```text
//! project(vectors, k):
//!   1. D = pairwise euclidean distances (parallel rows)
//!   2. For each i: kNN(i), rho_i = nearest positive distance,
//!      sigma_i so that sum_j exp(-(d_ij - rho_i) / sigma_i) = log2(k)
//!   3. w_ij = exp(-(d_ij - rho_i) / sigma_i); symmetrize w = a + b - a*b
//!   4. Y = uniform random in [-10, 10]^2
//!   5. For each epoch, for each edge due for sampling:
//!        attract i and j along 1 / (1 + a * d^(2b))
//!        repel i from `negative_sample_rate` random points
//! ```
//!
//! `a` and `b` come from fitting the low-dimensional similarity curve to
//! `min_dist` / `spread` (see [`fit_curve_params`]).

use super::{InterruptFlag, Projector};
use crate::config::ProjectionParams;
use crate::types::error::{HexmapError, Result};
use rand::{Rng, RngCore};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

const INIT_EXTENT: f64 = 10.0;
const GRAD_CLIP: f64 = 4.0;
const MIN_SIGMA: f64 = 1e-3;
const SIGMA_SEARCH_STEPS: usize = 64;
const SIGMA_TOLERANCE: f64 = 1e-5;

/// Built-in neighbor-preserving projector.
#[derive(Debug, Default)]
pub struct NeighborProjector {
    /// Cached `(spread, min_dist) -> (a, b)` fit
    curve: Option<((f64, f64), (f64, f64))>,

    /// Checked between optimization epochs
    interrupt: Option<InterruptFlag>,
}

impl NeighborProjector {
    pub fn new() -> Self {
        Self::default()
    }

    fn curve_params(&mut self, spread: f64, min_dist: f64) -> (f64, f64) {
        match self.curve {
            Some((key, ab)) if key == (spread, min_dist) => ab,
            _ => {
                let ab = fit_curve_params(spread, min_dist);
                self.curve = Some(((spread, min_dist), ab));
                ab
            }
        }
    }
}

impl Projector for NeighborProjector {
    fn name(&self) -> &str {
        "neighbor"
    }

    fn project(
        &mut self,
        vectors: &[Vec<f32>],
        params: &ProjectionParams,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<[f64; 2]>> {
        let n = vectors.len();
        if n < 2 {
            return Err(HexmapError::InsufficientItems(n));
        }
        if params.n_components != 2 {
            return Err(HexmapError::projection(format!(
                "only 2 output components are supported, got {}",
                params.n_components
            )));
        }
        if params.min_dist < 0.0 || params.spread <= 0.0 || params.min_dist > params.spread {
            return Err(HexmapError::projection(format!(
                "invalid curve parameters: min_dist={} spread={}",
                params.min_dist, params.spread
            )));
        }

        let k = ProjectionParams::n_neighbors_for(n);
        let distances = pairwise_distances(vectors);
        let knn = nearest_neighbors(&distances, k);
        let edges = fuzzy_edges(&knn, k);
        let (a, b) = self.curve_params(params.spread, params.min_dist);

        tracing::debug!(
            n,
            n_neighbors = k,
            edges = edges.len(),
            a,
            b,
            "Optimizing neighbor layout"
        );

        let mut embedding: Vec<[f64; 2]> = (0..n)
            .map(|_| {
                [
                    rng.gen_range(-INIT_EXTENT..INIT_EXTENT),
                    rng.gen_range(-INIT_EXTENT..INIT_EXTENT),
                ]
            })
            .collect();

        optimize_layout(
            &mut embedding,
            &edges,
            a,
            b,
            params,
            rng,
            self.interrupt.as_deref(),
        )?;

        Ok(embedding)
    }

    fn set_interrupt(&mut self, flag: InterruptFlag) {
        self.interrupt = Some(flag);
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn pairwise_distances(vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    (0..vectors.len())
        .into_par_iter()
        .map(|i| {
            vectors
                .iter()
                .map(|other| euclidean(&vectors[i], other))
                .collect()
        })
        .collect()
}

/// `k` nearest neighbors of each point (self excluded), nearest first.
fn nearest_neighbors(distances: &[Vec<f64>], k: usize) -> Vec<Vec<(usize, f64)>> {
    distances
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut candidates: Vec<(usize, f64)> = row
                .iter()
                .copied()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .collect();
            candidates.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
            candidates.truncate(k);
            candidates
        })
        .collect()
}

/// Bandwidth so the membership sum over neighbors hits `target`.
fn smooth_sigma(neighbor_dists: &[f64], rho: f64, target: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    let mut mid = 1.0;

    for _ in 0..SIGMA_SEARCH_STEPS {
        let psum: f64 = neighbor_dists
            .iter()
            .map(|&d| {
                let d = d - rho;
                if d > 0.0 {
                    (-d / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SIGMA_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    mid.max(MIN_SIGMA)
}

/// Symmetrized fuzzy membership edges `(i, j, weight)` with `i < j`.
fn fuzzy_edges(knn: &[Vec<(usize, f64)>], k: usize) -> Vec<(usize, usize, f64)> {
    let target = (k as f64).log2();
    let mut directed: HashMap<(usize, usize), f64> = HashMap::new();

    for (i, neighbors) in knn.iter().enumerate() {
        let dists: Vec<f64> = neighbors.iter().map(|&(_, d)| d).collect();
        let rho = dists.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);
        let sigma = smooth_sigma(&dists, rho, target);

        for &(j, d) in neighbors {
            let weight = (-((d - rho).max(0.0)) / sigma).exp();
            directed.insert((i, j), weight);
        }
    }

    let mut edges: Vec<(usize, usize, f64)> = Vec::new();
    for (&(i, j), &w_ij) in &directed {
        if i < j {
            let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
            edges.push((i, j, w_ij + w_ji - w_ij * w_ji));
        } else if !directed.contains_key(&(j, i)) {
            edges.push((j, i, w_ij));
        }
    }

    // HashMap order is arbitrary; sampling order must not be.
    edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    edges.retain(|e| e.2 > 0.0);
    edges
}

fn clip(v: f64) -> f64 {
    v.clamp(-GRAD_CLIP, GRAD_CLIP)
}

fn optimize_layout(
    embedding: &mut [[f64; 2]],
    edges: &[(usize, usize, f64)],
    a: f64,
    b: f64,
    params: &ProjectionParams,
    rng: &mut dyn RngCore,
    interrupt: Option<&AtomicBool>,
) -> Result<()> {
    let n = embedding.len();
    let n_epochs = params.n_epochs.max(1);
    let max_weight = edges.iter().map(|e| e.2).fold(0.0f64, f64::max);
    if max_weight <= 0.0 {
        return Ok(());
    }

    let epochs_per_sample: Vec<f64> = edges.iter().map(|e| max_weight / e.2).collect();
    let mut next_sample = epochs_per_sample.clone();

    for epoch in 0..n_epochs {
        if interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Err(HexmapError::projection(format!(
                "interrupted after {} of {} epochs",
                epoch, n_epochs
            )));
        }

        let alpha = params.learning_rate * (1.0 - epoch as f64 / n_epochs as f64);
        let due = (epoch + 1) as f64;

        for (e, &(i, j, _)) in edges.iter().enumerate() {
            if next_sample[e] > due {
                continue;
            }

            let diff = [embedding[i][0] - embedding[j][0], embedding[i][1] - embedding[j][1]];
            let dist2 = diff[0] * diff[0] + diff[1] * diff[1];
            if dist2 > 0.0 {
                let coeff = -2.0 * a * b * dist2.powf(b - 1.0) / (1.0 + a * dist2.powf(b));
                for d in 0..2 {
                    let grad = clip(coeff * diff[d]) * alpha;
                    embedding[i][d] += grad;
                    embedding[j][d] -= grad;
                }
            }
            next_sample[e] += epochs_per_sample[e];

            for _ in 0..params.negative_sample_rate {
                let other = rng.gen_range(0..n);
                if other == i {
                    continue;
                }
                let diff = [
                    embedding[i][0] - embedding[other][0],
                    embedding[i][1] - embedding[other][1],
                ];
                let dist2 = diff[0] * diff[0] + diff[1] * diff[1];
                let coeff = if dist2 > 0.0 {
                    2.0 * b / ((0.001 + dist2) * (1.0 + a * dist2.powf(b)))
                } else {
                    0.0
                };
                for d in 0..2 {
                    let grad = if coeff > 0.0 {
                        clip(coeff * diff[d])
                    } else {
                        GRAD_CLIP
                    };
                    embedding[i][d] += grad * alpha;
                }
            }
        }
    }

    Ok(())
}

/// Fit `a`, `b` so `1 / (1 + a * x^(2b))` approximates the target curve
/// `1` for `x < min_dist` and `exp(-(x - min_dist) / spread)` beyond.
///
/// Coarse grid search followed by shrinking local refinement.
pub fn fit_curve_params(spread: f64, min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (0..300).map(|i| 3.0 * spread * i as f64 / 299.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();

    let loss = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let f = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (f - y) * (f - y)
            })
            .sum()
    };

    let mut best = (1.0, 1.0);
    let mut best_loss = f64::INFINITY;
    for ai in 1..=50 {
        for bi in 1..=40 {
            let (a, b) = (ai as f64 * 0.1, bi as f64 * 0.05);
            let l = loss(a, b);
            if l < best_loss {
                best_loss = l;
                best = (a, b);
            }
        }
    }

    let (mut step_a, mut step_b) = (0.1, 0.05);
    for _ in 0..40 {
        let mut improved = false;
        for (da, db) in [(step_a, 0.0), (-step_a, 0.0), (0.0, step_b), (0.0, -step_b)] {
            let candidate = (best.0 + da, best.1 + db);
            if candidate.0 <= 0.0 || candidate.1 <= 0.0 {
                continue;
            }
            let l = loss(candidate.0, candidate.1);
            if l < best_loss {
                best_loss = l;
                best = candidate;
                improved = true;
            }
        }
        if !improved {
            step_a /= 2.0;
            step_b /= 2.0;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_groups() -> Vec<Vec<f32>> {
        let mut vectors = Vec::new();
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            vectors.push(vec![1.0 + jitter, jitter, 0.0, 0.0, 0.0, 0.0]);
        }
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            vectors.push(vec![0.0, 0.0, 0.0, jitter, 1.0 + jitter, 0.0]);
        }
        vectors
    }

    fn dist(p: [f64; 2], q: [f64; 2]) -> f64 {
        ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_curve_fit_default_params() {
        let (a, b) = fit_curve_params(1.0, 0.1);
        assert!((a - 1.58).abs() < 0.2, "a = {}", a);
        assert!((b - 0.90).abs() < 0.08, "b = {}", b);
    }

    #[test]
    fn test_knn_excludes_self_and_sorts() {
        let vectors = vec![vec![0.0], vec![1.0], vec![3.0], vec![6.0]];
        let knn = nearest_neighbors(&pairwise_distances(&vectors), 2);
        assert_eq!(knn[0].iter().map(|p| p.0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(knn[3].iter().map(|p| p.0).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_fuzzy_edges_symmetric_and_bounded() {
        let vectors = vec![vec![0.0], vec![1.0], vec![3.0], vec![6.0], vec![10.0]];
        let k = ProjectionParams::n_neighbors_for(vectors.len());
        let edges = fuzzy_edges(&nearest_neighbors(&pairwise_distances(&vectors), k), k);
        assert!(!edges.is_empty());
        for &(i, j, w) in &edges {
            assert!(i < j);
            assert!(w > 0.0 && w <= 1.0);
        }
    }

    #[test]
    fn test_projection_is_seeded() {
        let vectors = two_groups();
        let params = ProjectionParams::default();
        let first = NeighborProjector::new()
            .project(&vectors, &params, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let second = NeighborProjector::new()
            .project(&vectors, &params, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), vectors.len());
        assert!(first.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_projection_keeps_groups_apart() {
        let vectors = two_groups();
        let points = NeighborProjector::new()
            .project(
                &vectors,
                &ProjectionParams::default(),
                &mut StdRng::seed_from_u64(11),
            )
            .unwrap();

        let mut intra = Vec::new();
        let mut inter = Vec::new();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = dist(points[i], points[j]);
                if (i < 10) == (j < 10) {
                    intra.push(d);
                } else {
                    inter.push(d);
                }
            }
        }
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean(&intra) < mean(&inter));
    }

    #[test]
    fn test_two_items() {
        let points = NeighborProjector::new()
            .project(
                &[vec![0.0, 0.0], vec![10.0, 10.0]],
                &ProjectionParams::default(),
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_raised_interrupt_stops_layout() {
        let flag = InterruptFlag::default();
        let mut projector = NeighborProjector::new();
        projector.set_interrupt(flag.clone());

        let params = ProjectionParams::default();
        assert!(projector
            .project(&two_groups(), &params, &mut StdRng::seed_from_u64(1))
            .is_ok());

        flag.store(true, Ordering::SeqCst);
        let result = projector.project(&two_groups(), &params, &mut StdRng::seed_from_u64(1));
        match result {
            Err(HexmapError::ProjectionError(msg)) => assert!(msg.contains("interrupted")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_single_item() {
        let result = NeighborProjector::new().project(
            &[vec![1.0]],
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(HexmapError::InsufficientItems(1))));
    }
}
