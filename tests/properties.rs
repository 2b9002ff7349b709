//! Property tests for hex math and collision resolution.

use proptest::prelude::*;
use semantic_hexmap::hex::{
    cube_round, find_available_hex, hex_ring, hex_to_pixel, pixel_to_hex, AxialHex,
};
use std::collections::HashSet;

proptest! {
    #[test]
    fn cube_round_preserves_constraint(q in -500.0f64..500.0, r in -500.0f64..500.0) {
        let hex = cube_round(q, r, -q - r);
        prop_assert_eq!(hex.q + hex.r + hex.s(), 0);
    }

    #[test]
    fn cube_round_lands_within_one_cell(q in -500.0f64..500.0, r in -500.0f64..500.0) {
        let hex = cube_round(q, r, -q - r);
        prop_assert!((f64::from(hex.q) - q).abs() <= 1.0);
        prop_assert!((f64::from(hex.r) - r).abs() <= 1.0);
    }

    #[test]
    fn pixel_round_trip_is_lossless(q in -1000i32..1000, r in -1000i32..1000, radius in 0.5f64..100.0) {
        let hex = AxialHex::new(q, r);
        prop_assert_eq!(pixel_to_hex(hex_to_pixel(hex, radius), radius), hex);
    }

    #[test]
    fn spiral_search_never_returns_occupied(
        cells in prop::collection::vec((-3i32..=3, -3i32..=3), 0..40),
        max_radius in 1u32..5,
    ) {
        let occupied: HashSet<AxialHex> = cells.into_iter().map(|(q, r)| AxialHex::new(q, r)).collect();
        let center = AxialHex::ORIGIN;
        match find_available_hex(center, &occupied, max_radius) {
            Some(found) => {
                prop_assert!(!occupied.contains(&found));
                prop_assert!(found.distance(&center) <= max_radius as i32);
                if !occupied.contains(&center) {
                    prop_assert_eq!(found, center);
                }
            }
            None => {
                // Exhausted: every cell within max_radius is occupied.
                for q in -(max_radius as i32)..=max_radius as i32 {
                    for r in -(max_radius as i32)..=max_radius as i32 {
                        let cell = AxialHex::new(q, r);
                        if cell.distance(&center) <= max_radius as i32 {
                            prop_assert!(occupied.contains(&cell));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn spiral_search_finds_nearest_ring(
        cells in prop::collection::vec((-4i32..=4, -4i32..=4), 0..60),
    ) {
        let occupied: HashSet<AxialHex> = cells.into_iter().map(|(q, r)| AxialHex::new(q, r)).collect();
        let center = AxialHex::ORIGIN;
        if let Some(found) = find_available_hex(center, &occupied, 6) {
            let d = found.distance(&center);
            // No free cell exists strictly closer than the returned one.
            for q in -d..=d {
                for r in -d..=d {
                    let cell = AxialHex::new(q, r);
                    if cell.distance(&center) < d {
                        prop_assert!(occupied.contains(&cell));
                    }
                }
            }
        }
    }

    #[test]
    fn spiral_search_matches_ring_order(
        cells in prop::collection::vec((-3i32..=3, -3i32..=3), 0..40),
        max_radius in 0u32..5,
    ) {
        let occupied: HashSet<AxialHex> = cells.into_iter().map(|(q, r)| AxialHex::new(q, r)).collect();
        let center = AxialHex::ORIGIN;
        let expected = (0..=max_radius)
            .flat_map(|radius| hex_ring(center, radius))
            .find(|cell| !occupied.contains(cell));
        prop_assert_eq!(find_available_hex(center, &occupied, max_radius), expected);
    }
}
