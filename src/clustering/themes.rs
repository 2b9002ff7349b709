//! Theme assignment: map each embedded item to one of a fixed theme list.

use super::kmeans::kmeans_cosine;
use super::similarity::norm;
use crate::config::KMeansConfig;
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::types::error::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Human-labeled theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub label: String,
}

impl Theme {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Result of theme assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeAssignment {
    /// Item id -> theme id
    pub themes: HashMap<String, String>,

    /// Item id -> k-means cluster index (before mapping onto themes)
    pub clusters: HashMap<String, usize>,

    /// Items left out: no embedding, empty/zero/non-finite vector, or a
    /// dimension different from the first valid item
    pub skipped: Vec<String>,
}

impl ThemeAssignment {
    /// Theme id for an item.
    pub fn get(&self, item_id: &str) -> Option<&str> {
        self.themes.get(item_id).map(String::as_str)
    }

    /// Number of assigned items.
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Plain item id -> theme id map.
    pub fn into_map(self) -> HashMap<String, String> {
        self.themes
    }
}

/// Assign items to themes with k-means over cosine distance.
///
/// # Arguments
///
/// * `items` - Item ids
/// * `embeddings` - Item id -> embedding vector
/// * `themes` - Theme list; cluster `c` maps to `themes[c % themes.len()]`
/// * `config` - K-means limits
/// * `rng` - Random source for centroid seeding
///
/// # Returns
///
/// Empty assignment when `themes` is empty or no item has a usable embedding;
/// otherwise every usable item mapped to a theme id
///
/// # Errors
///
/// Returns `HexmapError::ClusteringError` if k-means fails
pub fn assign_items_to_themes<S: AsRef<str>>(
    items: &[S],
    embeddings: &HashMap<String, Vec<f32>>,
    themes: &[Theme],
    config: &KMeansConfig,
    rng: &mut dyn RngCore,
) -> Result<ThemeAssignment> {
    let span = background_span(BackgroundJobType::ThemeAssignment, "themes");
    let _guard = span.enter();
    let started = Instant::now();

    let mut ids: Vec<&str> = Vec::with_capacity(items.len());
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();
    let mut dim = None;

    for item in items {
        let id = item.as_ref();
        let usable = embeddings.get(id).filter(|v| {
            !v.is_empty()
                && v.iter().all(|x| x.is_finite())
                && norm(v) > 0.0
                && dim.map_or(true, |d| d == v.len())
        });
        match usable {
            Some(vector) => {
                dim.get_or_insert(vector.len());
                ids.push(id);
                vectors.push(vector.clone());
            }
            None => skipped.push(id.to_string()),
        }
    }

    if !skipped.is_empty() {
        tracing::warn!(count = skipped.len(), "Items without usable embeddings skipped");
    }

    if themes.is_empty() || vectors.is_empty() {
        record_background_metrics(Some(0), Some(started.elapsed().as_millis() as u64), "success");
        return Ok(ThemeAssignment {
            skipped,
            ..Default::default()
        });
    }

    let k = themes.len().min(vectors.len());
    let outcome = match kmeans_cosine(&vectors, k, config, rng) {
        Ok(outcome) => outcome,
        Err(e) => {
            record_background_metrics(None, Some(started.elapsed().as_millis() as u64), "failed");
            return Err(e);
        }
    };

    let mut assignment = ThemeAssignment {
        skipped,
        ..Default::default()
    };
    for (id, &cluster) in ids.iter().zip(&outcome.assignments) {
        let theme = &themes[cluster % themes.len()];
        assignment.themes.insert(id.to_string(), theme.id.clone());
        assignment.clusters.insert(id.to_string(), cluster);
    }

    tracing::info!(
        items = assignment.len(),
        k,
        iterations = outcome.iterations,
        converged = outcome.converged,
        "Theme assignment complete"
    );
    record_background_metrics(
        Some(assignment.len()),
        Some(started.elapsed().as_millis() as u64),
        "success",
    );

    Ok(assignment)
}
