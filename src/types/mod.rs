//! Core data types for the placement engine.
//!
//! Defines fundamental types used throughout the system:
//! - `EmbeddingItem`: An item id with its embedding vector and cluster hint
//! - `HexmapError`: Error types for all operations
//! - `Result`: Convenient result type alias

pub mod item;
pub mod error;

pub use item::{validate_dimensions, EmbeddingItem};
pub use error::{HexmapError, Result};
