//! Coordinate normalization from projection space to canvas pixels.

use crate::config::PlacementConfig;
use crate::hex::Pixel;
use crate::types::error::{HexmapError, Result};
use serde::{Deserialize, Serialize};

/// Assumed range of the projected point cloud, supplied by the caller.
///
/// Wire shape: `{ "min_x": -10, "max_x": 10, "min_y": -10, "max_y": 10 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl NormalizationBounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Symmetric square bounds `[-extent, extent]` on both axes.
    pub fn symmetric(extent: f64) -> Self {
        Self::new(-extent, extent, -extent, extent)
    }

    /// Check bounds are finite with a non-empty range on both axes.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::InvalidInput` for NaN/infinite values or
    /// `max <= min` on either axis
    pub fn validate(&self) -> Result<()> {
        let all = [self.min_x, self.max_x, self.min_y, self.max_y];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(HexmapError::invalid_input("Bounds must be finite"));
        }
        if self.max_x <= self.min_x || self.max_y <= self.min_y {
            return Err(HexmapError::invalid_input(format!(
                "Bounds must have max > min on both axes, got x [{}, {}] y [{}, {}]",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        Ok(())
    }

    /// Map a point into `[0, 1] x [0, 1]`, clamping values outside the bounds.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        let nx = (x - self.min_x) / (self.max_x - self.min_x);
        let ny = (y - self.min_y) / (self.max_y - self.min_y);
        (nx.clamp(0.0, 1.0), ny.clamp(0.0, 1.0))
    }
}

/// Map a normalized point onto the canvas inside its margins.
///
/// Normalized `y` grows upward, pixel `y` grows downward, hence the flip.
pub fn to_pixel(nx: f64, ny: f64, config: &PlacementConfig) -> Pixel {
    Pixel {
        x: config.margin + nx * config.inner_width(),
        y: config.margin + (1.0 - ny) * config.inner_height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_corners_and_center() {
        let bounds = NormalizationBounds::symmetric(10.0);
        assert_eq!(bounds.normalize(-10.0, -10.0), (0.0, 0.0));
        assert_eq!(bounds.normalize(10.0, 10.0), (1.0, 1.0));
        assert_eq!(bounds.normalize(0.0, 0.0), (0.5, 0.5));
    }

    #[test]
    fn test_normalize_clamps() {
        let bounds = NormalizationBounds::new(0.0, 4.0, 0.0, 2.0);
        assert_eq!(bounds.normalize(-3.0, 9.0), (0.0, 1.0));
        assert_eq!(bounds.normalize(100.0, -100.0), (1.0, 0.0));
    }

    #[test]
    fn test_to_pixel_flips_vertical() {
        let config = PlacementConfig::default();
        let top_left = to_pixel(0.0, 1.0, &config);
        assert_eq!(top_left, Pixel::new(20.0, 20.0));

        let bottom_right = to_pixel(1.0, 0.0, &config);
        assert_eq!(bottom_right, Pixel::new(880.0, 580.0));

        let center = to_pixel(0.5, 0.5, &config);
        assert_eq!(center, Pixel::new(450.0, 300.0));
    }

    #[test]
    fn test_bounds_validation() {
        assert!(NormalizationBounds::symmetric(1.0).validate().is_ok());
        assert!(NormalizationBounds::new(1.0, 1.0, 0.0, 1.0).validate().is_err());
        assert!(NormalizationBounds::new(0.0, f64::INFINITY, 0.0, 1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_bounds_wire_names() {
        let bounds: NormalizationBounds =
            serde_json::from_str(r#"{"min_x":-1,"max_x":1,"min_y":-2,"max_y":2}"#).unwrap();
        assert_eq!(bounds, NormalizationBounds::new(-1.0, 1.0, -2.0, 2.0));
    }
}
