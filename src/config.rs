//! Placement configuration and engine settings.
//!
//! - `PlacementConfig`: canvas geometry, travels with every placement request
//! - `ProjectionParams`: fixed dimensionality-reduction parameters
//! - `KMeansConfig`: theme clustering limits
//! - `EngineSettings`: process-level settings loaded from a JSON file and
//!   `HEXMAP_*` environment variables

use crate::types::error::{HexmapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default canvas width in pixels.
pub const DEFAULT_CANVAS_WIDTH: f64 = 900.0;
/// Default canvas height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;
/// Default hex radius (center to corner) in pixels.
pub const DEFAULT_HEX_RADIUS: f64 = 14.0;
/// Default canvas margin in pixels.
pub const DEFAULT_MARGIN: f64 = 20.0;
/// Default spiral search limit in rings.
pub const DEFAULT_MAX_SEARCH_RADIUS: u32 = 64;
/// Default caller-side round-trip timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Largest cell coordinate magnitude a canvas plus spiral search may reach.
///
/// Cube coordinates sum two axial ones, so they stay inside `i32` only
/// while each axial coordinate stays below 2^30.
pub const MAX_GRID_EXTENT: f64 = 1_073_741_824.0;

/// Canvas geometry for one placement request.
///
/// Wire shape (all fields optional):
/// `{ "canvasWidth": 900, "canvasHeight": 600, "hexRadius": 14, "margin": 20 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,

    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,

    #[serde(default = "default_hex_radius")]
    pub hex_radius: f64,

    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Largest ring the collision resolver searches before giving up
    #[serde(default = "default_max_search_radius")]
    pub max_search_radius: u32,
}

fn default_canvas_width() -> f64 {
    DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> f64 {
    DEFAULT_CANVAS_HEIGHT
}

fn default_hex_radius() -> f64 {
    DEFAULT_HEX_RADIUS
}

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}

fn default_max_search_radius() -> u32 {
    DEFAULT_MAX_SEARCH_RADIUS
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            hex_radius: DEFAULT_HEX_RADIUS,
            margin: DEFAULT_MARGIN,
            max_search_radius: DEFAULT_MAX_SEARCH_RADIUS,
        }
    }
}

impl PlacementConfig {
    /// Check geometry is usable.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ConfigError` if:
    /// - Any dimension is non-finite
    /// - Width, height or hex radius is not positive
    /// - Margin is negative or leaves no drawable area
    /// - `max_search_radius` is 0
    /// - The canvas in cells plus `max_search_radius` exceeds [`MAX_GRID_EXTENT`]
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("canvasWidth", self.canvas_width),
            ("canvasHeight", self.canvas_height),
            ("hexRadius", self.hex_radius),
            ("margin", self.margin),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(HexmapError::config(format!("{} must be finite", name)));
            }
        }

        if self.canvas_width <= 0.0 || self.canvas_height <= 0.0 {
            return Err(HexmapError::config(format!(
                "Canvas must be positive, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.hex_radius <= 0.0 {
            return Err(HexmapError::config(format!(
                "hexRadius must be > 0, got {}",
                self.hex_radius
            )));
        }
        if self.margin < 0.0
            || 2.0 * self.margin >= self.canvas_width
            || 2.0 * self.margin >= self.canvas_height
        {
            return Err(HexmapError::config(format!(
                "margin {} leaves no drawable area on a {}x{} canvas",
                self.margin, self.canvas_width, self.canvas_height
            )));
        }
        if self.max_search_radius == 0 {
            return Err(HexmapError::config("maxSearchRadius must be > 0"));
        }

        let extent = self.canvas_width.max(self.canvas_height) / self.hex_radius
            + f64::from(self.max_search_radius);
        if extent > MAX_GRID_EXTENT {
            return Err(HexmapError::config(format!(
                "Grid extent {:.0} cells exceeds {}: raise hexRadius or lower maxSearchRadius",
                extent, MAX_GRID_EXTENT
            )));
        }

        Ok(())
    }

    /// Drawable width inside the margins.
    #[inline]
    pub fn inner_width(&self) -> f64 {
        self.canvas_width - 2.0 * self.margin
    }

    /// Drawable height inside the margins.
    #[inline]
    pub fn inner_height(&self) -> f64 {
        self.canvas_height - 2.0 * self.margin
    }
}

/// Parameters for the neighbor-preserving projection.
///
/// `min_dist` and `spread` are held at conservative values tuned for
/// legibility of the final map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Output dimensionality (always 2 for placement)
    pub n_components: usize,

    /// Minimum distance between embedded points
    pub min_dist: f64,

    /// Effective scale of embedded points
    pub spread: f64,

    /// Optimization epochs
    pub n_epochs: usize,

    /// Repulsive samples per attractive update
    pub negative_sample_rate: usize,

    /// Initial SGD learning rate (decays linearly to 0)
    pub learning_rate: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            n_components: 2,
            min_dist: 0.1,
            spread: 1.0,
            n_epochs: 200,
            negative_sample_rate: 5,
            learning_rate: 1.0,
        }
    }
}

impl ProjectionParams {
    /// Neighbor count for `n` items.
    ///
    /// `floor(sqrt(n))` bounded below by 2 and above by `min(15, n - 1)`.
    /// The upper bound wins when the range is empty (n = 2 gives 1), so the
    /// result is always below `n`.
    pub fn n_neighbors_for(n: usize) -> usize {
        let upper = 15.min(n.saturating_sub(1));
        let base = (n as f64).sqrt().floor() as usize;
        base.max(2).min(upper)
    }
}

/// K-means limits for theme assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Maximum assignment/update rounds.
    ///
    /// Must be > 0. Iteration stops early once memberships are stable.
    pub max_iterations: usize,
}

impl KMeansConfig {
    /// Create a configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ConfigError` if `max_iterations` is 0.
    pub fn new(max_iterations: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(HexmapError::config("max_iterations must be > 0"));
        }
        Ok(Self { max_iterations })
    }
}

impl Default for KMeansConfig {
    /// Default configuration: max_iterations=100.
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

/// Process-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Caller-side round-trip timeout for placement requests
    pub timeout_secs: u64,

    /// Seed for every random source (unseeded when `None`)
    pub seed: Option<u64>,

    /// K-means iteration cap
    pub kmeans_max_iterations: usize,

    /// Projection epochs
    pub projection_epochs: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            seed: None,
            kmeans_max_iterations: KMeansConfig::default().max_iterations,
            projection_epochs: ProjectionParams::default().n_epochs,
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file, then apply environment overrides.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ConfigError` if the file or an override is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                serde_json::from_str(&content)
                    .map_err(|e| HexmapError::config(format!("Invalid settings file: {}", e)))?
            }
            _ => Self::default(),
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `HEXMAP_TIMEOUT_SECS`, `HEXMAP_SEED`, `HEXMAP_KMEANS_MAX_ITER`
    /// and `HEXMAP_PROJECTION_EPOCHS` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `HEXMAP_*` overrides from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ConfigError` if a present variable does not parse
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = parse_override::<u64>("HEXMAP_TIMEOUT_SECS", &lookup)? {
            self.timeout_secs = v;
        }
        if let Some(v) = parse_override::<u64>("HEXMAP_SEED", &lookup)? {
            self.seed = Some(v);
        }
        if let Some(v) = parse_override::<usize>("HEXMAP_KMEANS_MAX_ITER", &lookup)? {
            self.kmeans_max_iterations = v;
        }
        if let Some(v) = parse_override::<usize>("HEXMAP_PROJECTION_EPOCHS", &lookup)? {
            self.projection_epochs = v;
        }
        Ok(())
    }

    /// Check all settings are positive.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(HexmapError::config("timeout_secs must be > 0"));
        }
        if self.kmeans_max_iterations == 0 {
            return Err(HexmapError::config("kmeans_max_iterations must be > 0"));
        }
        if self.projection_epochs == 0 {
            return Err(HexmapError::config("projection_epochs must be > 0"));
        }
        Ok(())
    }

    /// Round-trip timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// K-means configuration derived from these settings.
    pub fn kmeans(&self) -> KMeansConfig {
        KMeansConfig {
            max_iterations: self.kmeans_max_iterations,
        }
    }

    /// Projection parameters derived from these settings.
    pub fn projection(&self) -> ProjectionParams {
        ProjectionParams {
            n_epochs: self.projection_epochs,
            ..ProjectionParams::default()
        }
    }
}

fn parse_override<T: std::str::FromStr>(
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<T>> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HexmapError::config(format!("{} is not a valid value: {}", name, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_placement_config_defaults_from_partial_json() {
        let config: PlacementConfig = serde_json::from_str(r#"{"hexRadius": 10}"#).unwrap();
        assert_eq!(config.canvas_width, 900.0);
        assert_eq!(config.canvas_height, 600.0);
        assert_eq!(config.hex_radius, 10.0);
        assert_eq!(config.margin, 20.0);
        assert_eq!(config.max_search_radius, DEFAULT_MAX_SEARCH_RADIUS);

        let empty: PlacementConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PlacementConfig::default());
    }

    #[test]
    fn test_placement_config_validation() {
        assert!(PlacementConfig::default().validate().is_ok());

        let bad_radius = PlacementConfig {
            hex_radius: 0.0,
            ..Default::default()
        };
        assert!(bad_radius.validate().is_err());

        let bad_margin = PlacementConfig {
            margin: 300.0,
            ..Default::default()
        };
        assert!(bad_margin.validate().is_err());

        let nan = PlacementConfig {
            canvas_width: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_placement_config_rejects_oversized_grid() {
        let huge_canvas = PlacementConfig {
            canvas_width: 1e12,
            canvas_height: 1e12,
            hex_radius: 1e-3,
            margin: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            huge_canvas.validate(),
            Err(HexmapError::ConfigError(_))
        ));

        let huge_search = PlacementConfig {
            max_search_radius: u32::MAX,
            ..Default::default()
        };
        assert!(huge_search.validate().is_err());

        let large_but_valid = PlacementConfig {
            canvas_width: 1e6,
            canvas_height: 1e6,
            hex_radius: 0.01,
            margin: 0.0,
            max_search_radius: 1000,
        };
        assert!(large_but_valid.validate().is_ok());
    }

    #[test]
    fn test_n_neighbors_formula() {
        assert_eq!(ProjectionParams::n_neighbors_for(2), 1);
        assert_eq!(ProjectionParams::n_neighbors_for(3), 2);
        assert_eq!(ProjectionParams::n_neighbors_for(10), 3);
        assert_eq!(ProjectionParams::n_neighbors_for(100), 10);
        assert_eq!(ProjectionParams::n_neighbors_for(10_000), 15);
        for n in 2..500 {
            assert!(ProjectionParams::n_neighbors_for(n) < n);
        }
    }

    #[test]
    fn test_kmeans_config() {
        assert!(KMeansConfig::new(0).is_err());
        assert_eq!(KMeansConfig::new(5).unwrap().max_iterations, 5);
        assert_eq!(KMeansConfig::default().max_iterations, 100);
    }

    #[test]
    fn test_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hexmap.json");
        fs::write(&path, r#"{"timeout_secs": 5, "seed": 42}"#).unwrap();

        let settings = EngineSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.kmeans_max_iterations, 100);

        let missing = EngineSettings::load(Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(missing.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.seed, None);
        assert_eq!(settings.kmeans(), KMeansConfig::default());
        assert_eq!(settings.projection(), ProjectionParams::default());
    }

    #[test]
    fn test_settings_overrides() {
        let vars = std::collections::HashMap::from([
            ("HEXMAP_TIMEOUT_SECS", " 7 "),
            ("HEXMAP_SEED", "99"),
            ("HEXMAP_KMEANS_MAX_ITER", "12"),
            ("HEXMAP_PROJECTION_EPOCHS", "40"),
        ]);
        let mut settings = EngineSettings::default();
        settings
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.timeout(), Duration::from_secs(7));
        assert_eq!(settings.seed, Some(99));
        assert_eq!(settings.kmeans().max_iterations, 12);
        assert_eq!(settings.projection().n_epochs, 40);
    }

    #[test]
    fn test_settings_override_leaves_unset_fields() {
        let mut settings = EngineSettings::default();
        settings
            .apply_overrides(|name| (name == "HEXMAP_SEED").then(|| "5".to_string()))
            .unwrap();
        assert_eq!(settings.seed, Some(5));
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_settings_rejects_bad_override() {
        for name in [
            "HEXMAP_TIMEOUT_SECS",
            "HEXMAP_SEED",
            "HEXMAP_KMEANS_MAX_ITER",
            "HEXMAP_PROJECTION_EPOCHS",
        ] {
            let mut settings = EngineSettings::default();
            let result = settings.apply_overrides(|n| (n == name).then(|| "soon".to_string()));
            match result {
                Err(HexmapError::ConfigError(msg)) => assert!(msg.contains(name)),
                other => panic!("{}: unexpected {:?}", name, other),
            }
        }

        let mut settings = EngineSettings::default();
        settings
            .apply_overrides(|n| (n == "HEXMAP_TIMEOUT_SECS").then(|| "0".to_string()))
            .unwrap();
        assert!(matches!(settings.validate(), Err(HexmapError::ConfigError(_))));
    }

    #[test]
    fn test_settings_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hexmap.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineSettings::load(Some(&path)),
            Err(HexmapError::ConfigError(_))
        ));
    }
}
