//! Placement orchestration: projection, normalization, hex conversion and
//! collision resolution in a deterministic item order.

use super::normalize::{to_pixel, NormalizationBounds};
use crate::config::{PlacementConfig, ProjectionParams};
use crate::hex::{find_available_hex, pixel_to_hex, AxialHex};
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::projection::{run_projection, Projector};
use crate::types::error::Result;
use crate::types::{validate_dimensions, EmbeddingItem};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Pixel position an item was normalized to, before hex snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Outcome of a placement request.
///
/// No two ids share a cell. Items whose spiral search was exhausted are
/// listed in `unplaced` and absent from `placements`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementResult {
    /// Item id -> claimed cell
    pub placements: HashMap<String, AxialHex>,

    /// Normalized pixel position per projected item
    pub debug_points: Option<Vec<DebugPoint>>,

    /// Items with no free cell within `max_search_radius`
    pub unplaced: Vec<String>,
}

impl PlacementResult {
    /// Cell for an item.
    pub fn get(&self, id: &str) -> Option<AxialHex> {
        self.placements.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Whether every requested item received a cell.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}

/// Item indices in placement order.
///
/// Sorted by cluster hint ascending; items without a hint come last. The
/// sort is stable, so ties keep input order.
pub fn placement_order(items: &[EmbeddingItem]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        match (&items[a].cluster_hint, &items[b].cluster_hint) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    order
}

/// Compute a conflict-free hex cell for every item.
///
/// # Arguments
///
/// * `items` - Items with equal-length embeddings and unique ids
/// * `bounds` - Assumed range of the projected points
/// * `config` - Canvas geometry and search limit
/// * `projector` - Dimensionality reduction capability
/// * `params` - Projection parameters
/// * `rng` - Random source handed to the projector
///
/// # Returns
///
/// - 0 items: empty result, projector not invoked
/// - 1 item: placed at `(0, 0)`, projector not invoked
/// - otherwise: one cell per item, except items listed in `unplaced`
///
/// # Errors
///
/// Returns error if:
/// - `config` or `bounds` is invalid
/// - Items have duplicate ids, mismatched dimensions or non-finite values
/// - The projector fails
pub fn compute_placement(
    items: &[EmbeddingItem],
    bounds: &NormalizationBounds,
    config: &PlacementConfig,
    projector: &mut dyn Projector,
    params: &ProjectionParams,
    rng: &mut dyn RngCore,
) -> Result<PlacementResult> {
    config.validate()?;

    match items {
        [] => return Ok(PlacementResult::default()),
        [only] => {
            let mut result = PlacementResult::default();
            result.placements.insert(only.id.clone(), AxialHex::ORIGIN);
            return Ok(result);
        }
        _ => {}
    }

    bounds.validate()?;
    let dim = validate_dimensions(items)?;

    let vectors: Vec<Vec<f32>> = items.iter().map(|item| item.vector.clone()).collect();
    let points = {
        let span = background_span(BackgroundJobType::Projection, projector.name());
        let _guard = span.enter();
        let started = Instant::now();
        tracing::debug!(
            n = items.len(),
            dim,
            n_neighbors = ProjectionParams::n_neighbors_for(items.len()),
            "Projecting embeddings"
        );
        let points = run_projection(projector, &vectors, params, rng);
        let status = if points.is_ok() { "success" } else { "failed" };
        record_background_metrics(
            Some(items.len()),
            Some(started.elapsed().as_millis() as u64),
            status,
        );
        points?
    };

    let span = background_span(BackgroundJobType::Placement, "hexgrid");
    let _guard = span.enter();
    let started = Instant::now();

    let mut result = PlacementResult {
        placements: HashMap::with_capacity(items.len()),
        debug_points: Some(Vec::with_capacity(items.len())),
        unplaced: Vec::new(),
    };
    let mut occupied: HashSet<AxialHex> = HashSet::with_capacity(items.len());

    for index in placement_order(items) {
        let item = &items[index];
        let [x, y] = points[index];

        let (nx, ny) = bounds.normalize(x, y);
        let pixel = to_pixel(nx, ny, config);
        if let Some(debug) = result.debug_points.as_mut() {
            debug.push(DebugPoint {
                id: item.id.clone(),
                x: pixel.x,
                y: pixel.y,
            });
        }

        let ideal = pixel_to_hex(pixel, config.hex_radius);
        match find_available_hex(ideal, &occupied, config.max_search_radius) {
            Some(cell) => {
                occupied.insert(cell);
                result.placements.insert(item.id.clone(), cell);
            }
            None => {
                tracing::warn!(
                    id = %item.id,
                    ideal = %ideal,
                    max_radius = config.max_search_radius,
                    "No free hex within search radius"
                );
                result.unplaced.push(item.id.clone());
            }
        }
    }

    let status = if result.is_complete() { "success" } else { "partial" };
    record_background_metrics(
        Some(result.len()),
        Some(started.elapsed().as_millis() as u64),
        status,
    );
    tracing::debug!(
        placed = result.len(),
        unplaced = result.unplaced.len(),
        "Placement complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::PassthroughProjector;
    use crate::types::HexmapError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Fails the test if invoked.
    struct Untouchable;

    impl Projector for Untouchable {
        fn name(&self) -> &str {
            "untouchable"
        }

        fn project(
            &mut self,
            _vectors: &[Vec<f32>],
            _params: &ProjectionParams,
            _rng: &mut dyn RngCore,
        ) -> Result<Vec<[f64; 2]>> {
            panic!("projector must not run for fewer than 2 items");
        }
    }

    fn place(items: &[EmbeddingItem], projector: &mut dyn Projector) -> Result<PlacementResult> {
        compute_placement(
            items,
            &NormalizationBounds::symmetric(10.0),
            &PlacementConfig::default(),
            projector,
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(5),
        )
    }

    #[test]
    fn test_empty_items() {
        let result = place(&[], &mut Untouchable).unwrap();
        assert!(result.is_empty());
        assert!(result.debug_points.is_none());
    }

    #[test]
    fn test_single_item_at_origin() {
        let items = vec![EmbeddingItem::new("1", vec![0.0, 0.0])];
        let result = place(&items, &mut Untouchable).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("1"), Some(AxialHex::ORIGIN));
    }

    #[test]
    fn test_two_items_distinct_cells() {
        let items = vec![
            EmbeddingItem::new("a", vec![0.0, 0.0]),
            EmbeddingItem::new("b", vec![10.0, 10.0]),
        ];
        let result = place(&items, &mut PassthroughProjector).unwrap();
        assert_eq!(result.len(), 2);
        let a = result.get("a").unwrap();
        let b = result.get("b").unwrap();
        assert_ne!(a, b);
        assert!(a.distance(&b) > 1);

        // [0, 0] lands mid-canvas, [10, 10] at the top-right margin corner.
        let debug = result.debug_points.unwrap();
        assert_eq!((debug[0].x, debug[0].y), (450.0, 300.0));
        assert_eq!((debug[1].x, debug[1].y), (880.0, 20.0));
    }

    #[test]
    fn test_collision_moves_later_item() {
        let items = vec![
            EmbeddingItem::new("first", vec![1.0, 1.0]),
            EmbeddingItem::new("second", vec![1.0, 1.0]),
            EmbeddingItem::new("third", vec![1.0, 1.0]),
        ];
        let result = place(&items, &mut PassthroughProjector).unwrap();
        let first = result.get("first").unwrap();
        let second = result.get("second").unwrap();
        let third = result.get("third").unwrap();
        assert_eq!(second, first.neighbor(4));
        assert_eq!(third, first.neighbor(5));
    }

    #[test]
    fn test_cluster_hint_order() {
        let items = vec![
            EmbeddingItem::new("none", vec![1.0, 1.0]),
            EmbeddingItem::new("beta", vec![1.0, 1.0]).with_cluster("b"),
            EmbeddingItem::new("alpha", vec![1.0, 1.0]).with_cluster("a"),
        ];
        assert_eq!(placement_order(&items), vec![2, 1, 0]);

        let result = place(&items, &mut PassthroughProjector).unwrap();
        let ideal = result.get("alpha").unwrap();
        assert_eq!(result.get("beta"), Some(ideal.neighbor(4)));
        assert_eq!(result.get("none"), Some(ideal.neighbor(5)));
    }

    #[test]
    fn test_exhausted_search_reports_unplaced() {
        let items: Vec<EmbeddingItem> = (0..9)
            .map(|i| EmbeddingItem::new(format!("s{}", i), vec![0.0, 0.0]))
            .collect();
        let config = PlacementConfig {
            max_search_radius: 1,
            ..Default::default()
        };
        let result = compute_placement(
            &items,
            &NormalizationBounds::symmetric(10.0),
            &config,
            &mut PassthroughProjector,
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

        assert_eq!(result.len(), 7);
        assert_eq!(result.unplaced, vec!["s7".to_string(), "s8".to_string()]);
        let cells: HashSet<_> = result.placements.values().collect();
        assert_eq!(cells.len(), 7);
    }

    #[test]
    fn test_oversized_grid_is_config_error() {
        let items = vec![
            EmbeddingItem::new("a", vec![10.0, -10.0]),
            EmbeddingItem::new("b", vec![10.0, -10.0]),
        ];
        let config = PlacementConfig {
            canvas_width: 1e12,
            canvas_height: 1e12,
            hex_radius: 1e-3,
            margin: 0.0,
            ..Default::default()
        };
        let result = compute_placement(
            &items,
            &NormalizationBounds::symmetric(10.0),
            &config,
            &mut PassthroughProjector,
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(HexmapError::ConfigError(_))));
    }

    #[test]
    fn test_far_canvas_corner_still_distinct() {
        // Largest accepted extent: the corner cell sits near 2^29 and the
        // second item must still spiral to a distinct neighbor.
        let items = vec![
            EmbeddingItem::new("a", vec![10.0, -10.0]),
            EmbeddingItem::new("b", vec![10.0, -10.0]),
        ];
        let config = PlacementConfig {
            canvas_width: 5e8,
            canvas_height: 5e8,
            hex_radius: 1.0,
            margin: 0.0,
            max_search_radius: 8,
        };
        let result = compute_placement(
            &items,
            &NormalizationBounds::symmetric(10.0),
            &config,
            &mut PassthroughProjector,
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_ne!(result.get("a"), result.get("b"));
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let items = vec![
            EmbeddingItem::new("a", vec![0.0, 0.0]),
            EmbeddingItem::new("b", vec![1.0]),
        ];
        assert!(matches!(
            place(&items, &mut PassthroughProjector),
            Err(HexmapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_bounds() {
        let items = vec![
            EmbeddingItem::new("a", vec![0.0, 0.0]),
            EmbeddingItem::new("b", vec![1.0, 1.0]),
        ];
        let result = compute_placement(
            &items,
            &NormalizationBounds::new(1.0, -1.0, 0.0, 1.0),
            &PlacementConfig::default(),
            &mut PassthroughProjector,
            &ProjectionParams::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(HexmapError::InvalidInput(_))));
    }
}
