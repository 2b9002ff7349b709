//! Theme clustering over embedding vectors.
//!
//! Independent of placement: groups the same embeddings with k-means over
//! cosine distance and maps each cluster onto a caller-supplied theme list.
//! The caller uses the result to color hexes and label them.
//!
//! # Degenerate Vectors
//!
//! Cosine similarity is undefined for zero-norm vectors. Such items are
//! reported in [`ThemeAssignment::skipped`] rather than coerced to a theme.

mod kmeans;
mod similarity;
mod themes;

pub use kmeans::{kmeans_cosine, KMeansOutcome};
pub use similarity::{cosine_distance, cosine_similarity};
pub use themes::{assign_items_to_themes, Theme, ThemeAssignment};
