//! Dimensionality reduction stage.
//!
//! Turns `N` embedding vectors of dimension `D` into `N` 2D points that keep
//! nearby vectors nearby. The capability is pluggable through the
//! [`Projector`] trait; the background placement context owns one projector
//! instance for its whole lifetime (see [`crate::worker`]).
//!
//! # Implementations
//!
//! | Projector | Use |
//! |-----------|-----|
//! | [`NeighborProjector`] | Built-in neighbor-graph projection (kNN graph + SGD layout) |
//! | [`PassthroughProjector`] | Vectors already 2D (projected upstream) |

mod neighbor;
mod passthrough;

pub use neighbor::{fit_curve_params, NeighborProjector};
pub use passthrough::PassthroughProjector;

use crate::config::ProjectionParams;
use crate::types::error::{HexmapError, Result};
use rand::RngCore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Shared flag raised when the owner of a running projection loses interest.
pub type InterruptFlag = Arc<AtomicBool>;

/// Projection capability.
pub trait Projector: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Project vectors to 2D points.
    ///
    /// # Arguments
    ///
    /// * `vectors` - Embedding vectors, all of one dimension, at least 2
    /// * `params` - Projection parameters
    /// * `rng` - Random source for initialization and sampling
    ///
    /// # Returns
    ///
    /// One `[x, y]` point per input vector, in input order
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ProjectionError` if the projection fails
    fn project(
        &mut self,
        vectors: &[Vec<f32>],
        params: &ProjectionParams,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<[f64; 2]>>;

    /// Attach an interrupt flag.
    ///
    /// Long-running projectors should poll it and fail early once raised.
    /// The default ignores it.
    fn set_interrupt(&mut self, _flag: InterruptFlag) {}
}

/// Constructor registered with a placement session.
///
/// Invoked once inside the background context, on the first request that
/// needs a projection.
pub type ProjectorFactory = Arc<dyn Fn() -> Result<Box<dyn Projector>> + Send + Sync>;

/// Factory for the built-in [`NeighborProjector`].
pub fn neighbor_projector_factory() -> ProjectorFactory {
    Arc::new(|| Ok(Box::new(NeighborProjector::new()) as Box<dyn Projector>))
}

/// Factory for the [`PassthroughProjector`].
pub fn passthrough_projector_factory() -> ProjectorFactory {
    Arc::new(|| Ok(Box::new(PassthroughProjector) as Box<dyn Projector>))
}

/// Run a projector with precondition and output checks.
///
/// # Errors
///
/// Returns error if:
/// - Fewer than 2 vectors are given (`InsufficientItems`)
/// - The projector fails
/// - The projector returns the wrong number of points or non-finite values
pub fn run_projection(
    projector: &mut dyn Projector,
    vectors: &[Vec<f32>],
    params: &ProjectionParams,
    rng: &mut dyn RngCore,
) -> Result<Vec<[f64; 2]>> {
    if vectors.len() < 2 {
        return Err(HexmapError::InsufficientItems(vectors.len()));
    }

    let points = projector.project(vectors, params, rng)?;

    if points.len() != vectors.len() {
        return Err(HexmapError::projection(format!(
            "{} returned {} points for {} vectors",
            projector.name(),
            points.len(),
            vectors.len()
        )));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(HexmapError::projection(format!(
            "{} returned non-finite coordinates",
            projector.name()
        )));
    }

    Ok(points)
}
