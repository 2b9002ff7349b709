//! Projector for vectors that are already two-dimensional.

use super::Projector;
use crate::config::ProjectionParams;
use crate::types::error::{HexmapError, Result};
use rand::RngCore;

/// Returns 2D vectors unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughProjector;

impl Projector for PassthroughProjector {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn project(
        &mut self,
        vectors: &[Vec<f32>],
        params: &ProjectionParams,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<[f64; 2]>> {
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| match v.as_slice() {
                [x, y] => Ok([f64::from(*x), f64::from(*y)]),
                _ => Err(HexmapError::projection(format!(
                    "passthrough needs {}-dimensional vectors, vector {} has {}",
                    params.n_components,
                    i,
                    v.len()
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_passthrough_keeps_points() {
        let mut rng = StdRng::seed_from_u64(0);
        let points = PassthroughProjector
            .project(
                &[vec![0.0, 0.0], vec![10.0, -2.5]],
                &ProjectionParams::default(),
                &mut rng,
            )
            .unwrap();
        assert_eq!(points, vec![[0.0, 0.0], [10.0, -2.5]]);
    }

    #[test]
    fn test_passthrough_rejects_high_dimensional() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = PassthroughProjector.project(
            &[vec![0.0, 0.0, 1.0], vec![1.0, 1.0, 1.0]],
            &ProjectionParams::default(),
            &mut rng,
        );
        assert!(result.is_err());
    }
}
