//! Semantic hexmap placement engine.
//!
//! Lays out short text items ("stories") as cells on a hexagonal grid where
//! spatial proximity reflects semantic similarity:
//! - Projection of embedding vectors to 2D (pluggable `Projector`)
//! - Normalization into a pixel canvas and conversion to axial hex cells
//! - Conflict-free cell assignment via ring-by-ring spiral search
//! - Theme assignment with k-means over cosine distance
//!
//! The CPU-bound projection + placement runs in an isolated background
//! context owned by a `PlacementSession` and is driven over a JSON message
//! protocol (see [`worker`]).

pub mod types;
pub mod config;
pub mod hex;
pub mod placement;
pub mod projection;
pub mod clustering;
pub mod worker;
pub mod otel;

pub use clustering::{assign_items_to_themes, Theme, ThemeAssignment};
pub use config::{EngineSettings, KMeansConfig, PlacementConfig, ProjectionParams};
pub use hex::{cube_round, find_available_hex, hex_to_pixel, pixel_to_hex, AxialHex, Pixel};
pub use placement::{compute_placement, NormalizationBounds, PlacementResult};
pub use projection::{NeighborProjector, PassthroughProjector, Projector};
pub use types::{EmbeddingItem, HexmapError, Result};
pub use worker::{PlacementSession, WorkerMessage};
