//! Collision resolution via ring-by-ring spiral search.
//!
//! # Ring Walk
//!
//! ```text
//! ring(center, radius):
//!   cell = center + DIRECTIONS[4] * radius
//!   for dir in 0..6:
//!     repeat radius times:
//!       visit(cell)
//!       cell = cell.neighbor(dir)
//! ```
//!
//! With radius 1 the visit order expressed as directions from the center is
//! 4, 5, 0, 1, 2, 3.

use super::coords::AxialHex;
use std::collections::HashSet;

/// Ring walk start direction.
const RING_START_DIR: usize = 4;

/// Lazy walk over the cells of one ring.
///
/// Shared by [`hex_ring`] and [`find_available_hex`] so both visit cells in
/// the same order.
struct RingWalk {
    cell: AxialHex,
    radius: u32,
    dir: usize,
    step: u32,
}

impl RingWalk {
    fn new(center: AxialHex, radius: u32) -> Self {
        if radius == 0 {
            // A single one-step leg: yields the center, then stops.
            return Self {
                cell: center,
                radius: 1,
                dir: 5,
                step: 0,
            };
        }
        Self {
            cell: center.offset(RING_START_DIR, radius as i32),
            radius,
            dir: 0,
            step: 0,
        }
    }
}

impl Iterator for RingWalk {
    type Item = AxialHex;

    fn next(&mut self) -> Option<AxialHex> {
        if self.dir >= 6 {
            return None;
        }
        let cell = self.cell;
        self.cell = cell.neighbor(self.dir);
        self.step += 1;
        if self.step == self.radius {
            self.step = 0;
            self.dir += 1;
        }
        Some(cell)
    }
}

/// Cells at exactly `radius` steps from `center`, in walk order.
///
/// Radius 0 yields only `center`.
pub fn hex_ring(center: AxialHex, radius: u32) -> Vec<AxialHex> {
    RingWalk::new(center, radius).collect()
}

/// Find the nearest free cell to `center`.
///
/// # Arguments
///
/// * `center` - Ideal cell
/// * `occupied` - Cells already claimed
/// * `max_radius` - Largest ring to search
///
/// # Returns
///
/// `center` if free, otherwise the first free cell in ring order, or `None`
/// when every cell within `max_radius` is occupied
pub fn find_available_hex(
    center: AxialHex,
    occupied: &HashSet<AxialHex>,
    max_radius: u32,
) -> Option<AxialHex> {
    (0..=max_radius).find_map(|radius| {
        RingWalk::new(center, radius).find(|cell| !occupied.contains(cell))
    })
}
