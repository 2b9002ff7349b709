//! Hexagonal grid math for flat-top axial coordinates.
//!
//! # Coordinate Systems
//!
//! ```text
//! axial (q, r)        cube (q, r, s = -q - r)      pixel (x, y)
//!
//!   x = R * 3/2 * q
//!   y = R * (sqrt(3)/2 * q + sqrt(3) * r)
//! ```
//!
//! Pixel space grows downward (canvas convention). Conversions back from
//! pixels produce fractional cube coordinates that are resolved with
//! [`cube_round`].
//!
//! # Neighbor Order
//!
//! The six unit directions are fixed (see [`HEX_DIRECTIONS`]); the collision
//! resolver's ring walk depends on this order for determinism.

mod coords;
mod spiral;

pub use coords::{
    cube_round, get_hex_neighbors, hex_to_pixel, pixel_to_hex, AxialHex, Pixel, HEX_DIRECTIONS,
};
pub use spiral::{find_available_hex, hex_ring};
