//! Embedded item type shared by placement and theme assignment.

use crate::types::error::{HexmapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A story id with its embedding vector.
///
/// Wire shape: `{ "id": "...", "embedding": [...], "cluster_id": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    /// Unique id within one request
    pub id: String,

    /// Embedding vector (same length for every item in a request)
    #[serde(rename = "embedding")]
    pub vector: Vec<f32>,

    /// Theme/cluster the item is expected to belong to.
    ///
    /// Only used to order placement so same-theme items claim cells together.
    #[serde(
        rename = "cluster_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_hint: Option<String>,
}

impl EmbeddingItem {
    /// Create an item without a cluster hint.
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            cluster_hint: None,
        }
    }

    /// Attach a cluster hint.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_hint = Some(cluster.into());
        self
    }
}

/// Validate a batch of items before projection.
///
/// # Returns
///
/// The shared dimensionality (0 for an empty batch)
///
/// # Errors
///
/// Returns error if:
/// - Two items share an id
/// - Vectors have inconsistent dimensions or are empty
/// - A vector contains NaN or infinite components
pub fn validate_dimensions(items: &[EmbeddingItem]) -> Result<usize> {
    let Some(first) = items.first() else {
        return Ok(0);
    };

    let expected = first.vector.len();
    if expected == 0 {
        return Err(HexmapError::invalid_input(format!(
            "Item '{}' has an empty embedding",
            first.id
        )));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(HexmapError::invalid_input(format!(
                "Duplicate item id '{}'",
                item.id
            )));
        }
        if item.vector.len() != expected {
            return Err(HexmapError::DimensionMismatch {
                id: item.id.clone(),
                expected,
                actual: item.vector.len(),
            });
        }
        if item.vector.iter().any(|v| !v.is_finite()) {
            return Err(HexmapError::invalid_input(format!(
                "Item '{}' has non-finite embedding values",
                item.id
            )));
        }
    }

    Ok(expected)
}
