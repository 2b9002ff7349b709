//! Wire messages exchanged with the background placement context.
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```text
//! → {"type":"computePlacement","items":[...],"bounds":{...},"config":{...}}
//! ← {"type":"placementResult","placements":[["id",{"q":0,"r":0}],...],"debugPoints":[...]}
//! ← {"type":"error","error":"..."}
//! ```
//!
//! `placements` is an association list rather than an object so the
//! placement order survives any JSON implementation. An optional
//! `requestId` is echoed back so a session can reject replies that belong
//! to an abandoned request.

use crate::config::PlacementConfig;
use crate::hex::AxialHex;
use crate::placement::{DebugPoint, NormalizationBounds, PlacementResult};
use crate::types::error::{HexmapError, Result};
use crate::types::EmbeddingItem;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tagged message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMessage {
    /// Request: place `items` on the grid
    ComputePlacement {
        #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<Uuid>,
        items: Vec<EmbeddingItem>,
        bounds: NormalizationBounds,
        #[serde(default)]
        config: PlacementConfig,
    },

    /// Success response
    PlacementResult {
        #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<Uuid>,
        placements: Vec<(String, AxialHex)>,
        #[serde(rename = "debugPoints", default, skip_serializing_if = "Option::is_none")]
        debug_points: Option<Vec<DebugPoint>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unplaced: Vec<String>,
    },

    /// Failure response with a plain message
    Error {
        #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<Uuid>,
        error: String,
    },
}

impl WorkerMessage {
    /// Build a placement request.
    pub fn compute_placement(
        request_id: Option<Uuid>,
        items: Vec<EmbeddingItem>,
        bounds: NormalizationBounds,
        config: PlacementConfig,
    ) -> Self {
        Self::ComputePlacement {
            request_id,
            items,
            bounds,
            config,
        }
    }

    /// Build a success response. Pairs are sorted by id.
    pub fn placement_result(request_id: Option<Uuid>, result: PlacementResult) -> Self {
        let mut placements: Vec<(String, AxialHex)> = result.placements.into_iter().collect();
        placements.sort_by(|a, b| a.0.cmp(&b.0));
        Self::PlacementResult {
            request_id,
            placements,
            debug_points: result.debug_points,
            unplaced: result.unplaced,
        }
    }

    /// Build a failure response.
    pub fn error(request_id: Option<Uuid>, error: impl Into<String>) -> Self {
        Self::Error {
            request_id,
            error: error.into(),
        }
    }

    /// Wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ComputePlacement { .. } => "computePlacement",
            Self::PlacementResult { .. } => "placementResult",
            Self::Error { .. } => "error",
        }
    }

    /// Request id carried by the message, if any.
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            Self::ComputePlacement { request_id, .. }
            | Self::PlacementResult { request_id, .. }
            | Self::Error { request_id, .. } => *request_id,
        }
    }

    /// Encode as a JSON frame.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::ProtocolError` for malformed JSON or an
    /// unrecognized `type`
    pub fn from_frame(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|e| HexmapError::protocol(format!("Malformed worker message: {}", e)))
    }

    /// Convert a response into a placement result.
    ///
    /// # Errors
    ///
    /// - `HexmapError::WorkerError` for an `error` response
    /// - `HexmapError::ProtocolError` for a request message or duplicate ids
    pub fn into_placement_result(self) -> Result<PlacementResult> {
        match self {
            Self::PlacementResult {
                placements,
                debug_points,
                unplaced,
                ..
            } => {
                let expected = placements.len();
                let placements: std::collections::HashMap<String, AxialHex> =
                    placements.into_iter().collect();
                if placements.len() != expected {
                    return Err(HexmapError::protocol("Duplicate ids in placementResult"));
                }
                Ok(PlacementResult {
                    placements,
                    debug_points,
                    unplaced,
                })
            }
            Self::Error { error, .. } => Err(HexmapError::WorkerError(error)),
            Self::ComputePlacement { .. } => Err(HexmapError::protocol(
                "Expected a response, got computePlacement",
            )),
        }
    }
}
