//! Axial/cube coordinates and pixel conversions.

use crate::types::HexmapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Unit directions in neighbor order.
///
/// Index 4 is the ring-walk start offset used by the collision resolver.
pub const HEX_DIRECTIONS: [AxialHex; 6] = [
    AxialHex { q: 1, r: 0 },
    AxialHex { q: 1, r: -1 },
    AxialHex { q: 0, r: -1 },
    AxialHex { q: -1, r: 0 },
    AxialHex { q: -1, r: 1 },
    AxialHex { q: 0, r: 1 },
];

/// Axial hex coordinate. The implicit cube coordinate is `s = -q - r`.
///
/// Serializes as `{"q": 0, "r": 0}`; displays as the `"q,r"` key form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AxialHex {
    pub q: i32,
    pub r: i32,
}

impl AxialHex {
    /// Origin cell `(0, 0)`.
    pub const ORIGIN: AxialHex = AxialHex { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate.
    #[inline]
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Cell one step away in direction `dir` (0..6, wraps).
    #[inline]
    pub fn neighbor(&self, dir: usize) -> AxialHex {
        let d = HEX_DIRECTIONS[dir % 6];
        AxialHex::new(self.q + d.q, self.r + d.r)
    }

    /// Cell `steps` away in direction `dir`.
    #[inline]
    pub fn offset(&self, dir: usize, steps: i32) -> AxialHex {
        let d = HEX_DIRECTIONS[dir % 6];
        AxialHex::new(self.q + d.q * steps, self.r + d.r * steps)
    }

    /// Grid distance (number of steps) between two cells.
    pub fn distance(&self, other: &AxialHex) -> i32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        dq.max(dr).max(ds)
    }
}

impl fmt::Display for AxialHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

impl FromStr for AxialHex {
    type Err = HexmapError;

    /// Parse the `"q,r"` key form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (q, r) = s
            .split_once(',')
            .ok_or_else(|| HexmapError::invalid_input(format!("Invalid hex key: {}", s)))?;
        let q = q
            .trim()
            .parse()
            .map_err(|_| HexmapError::invalid_input(format!("Invalid q in hex key: {}", s)))?;
        let r = r
            .trim()
            .parse()
            .map_err(|_| HexmapError::invalid_input(format!("Invalid r in hex key: {}", s)))?;
        Ok(AxialHex::new(q, r))
    }
}

/// Point in canvas pixel space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Center of a hex cell in pixel space (flat-top layout).
pub fn hex_to_pixel(hex: AxialHex, hex_radius: f64) -> Pixel {
    let q = f64::from(hex.q);
    let r = f64::from(hex.r);
    Pixel {
        x: hex_radius * 1.5 * q,
        y: hex_radius * (SQRT_3 / 2.0 * q + SQRT_3 * r),
    }
}

/// Hex cell containing a pixel (inverse of [`hex_to_pixel`], then rounded).
pub fn pixel_to_hex(pixel: Pixel, hex_radius: f64) -> AxialHex {
    let q = (2.0 / 3.0 * pixel.x) / hex_radius;
    let r = (-1.0 / 3.0 * pixel.x + SQRT_3 / 3.0 * pixel.y) / hex_radius;
    cube_round(q, r, -q - r)
}

/// Round fractional cube coordinates to the nearest valid cell.
///
/// Each component is rounded independently; the one with the largest
/// rounding error is recomputed from the other two so `q + r + s == 0`.
pub fn cube_round(q: f64, r: f64, s: f64) -> AxialHex {
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    // Otherwise s absorbs the error; it is implicit in axial form.

    AxialHex::new(rq as i32, rr as i32)
}

/// The six neighbors of `hex`, in [`HEX_DIRECTIONS`] order.
pub fn get_hex_neighbors(hex: AxialHex) -> [AxialHex; 6] {
    std::array::from_fn(|dir| hex.neighbor(dir))
}
