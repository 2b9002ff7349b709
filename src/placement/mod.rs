//! Placement of embedded items onto hex cells.
//!
//! # Pipeline
//!
//! ```text
//! items ──► projector ──► (x, y) per item
//!                              │ sort items by cluster hint
//!                              ▼
//!        normalize ──► to_pixel ──► pixel_to_hex ──► spiral search ──► id → hex
//! ```
//!
//! Assignment is greedy and single-pass: an earlier item may claim the ideal
//! cell of a later one, which then moves to the nearest free ring cell.

mod normalize;
mod orchestrator;

pub use normalize::{to_pixel, NormalizationBounds};
pub use orchestrator::{compute_placement, placement_order, DebugPoint, PlacementResult};
