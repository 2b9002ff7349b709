//! Caller-side placement session.
//!
//! Owns one background context at a time and allows one request in flight.
//!
//! # Cancellation
//!
//! Cancellation is hard. On timeout, or when a new request starts while an
//! abandoned one is still running, the session drops its context and spawns
//! a fresh one. A late reply from the old context lands in a dropped one-shot
//! slot and is never applied.
//!
//! Dropping a context raises its projector's interrupt flag. The built-in
//! [`NeighborProjector`](crate::projection::NeighborProjector) checks it
//! between epochs, so an abandoned thread stops within one epoch. A custom
//! projector that ignores the flag keeps its old thread busy until the
//! current projection returns.

use super::context::PlacementContext;
use super::protocol::WorkerMessage;
use crate::config::{EngineSettings, PlacementConfig, ProjectionParams};
use crate::placement::{NormalizationBounds, PlacementResult};
use crate::projection::ProjectorFactory;
use crate::types::error::{HexmapError, Result};
use crate::types::EmbeddingItem;
use std::time::Duration;
use uuid::Uuid;

/// Placement session with an isolated background context.
///
/// A timed-out or superseded request does not block the next one: the old
/// context is interrupted and replaced. Its thread exits at the projector's
/// next interrupt check, or when the projection returns.
///
/// # Example
///
/// ```rust,ignore
/// let settings = EngineSettings::load(None)?;
/// let mut session = PlacementSession::new(Some(neighbor_projector_factory()), &settings)?;
///
/// let result = session
///     .compute_placement(items, NormalizationBounds::symmetric(10.0), PlacementConfig::default())
///     .await?;
/// ```
pub struct PlacementSession {
    context: Option<PlacementContext>,
    factory: Option<ProjectorFactory>,
    params: ProjectionParams,
    seed: Option<u64>,
    timeout: Duration,
    in_flight: bool,
}

impl PlacementSession {
    /// Create a session and start its background context.
    ///
    /// # Arguments
    ///
    /// * `factory` - Projector constructor; `None` makes every request with
    ///   two or more items fail with `ProjectorUnavailable`
    /// * `settings` - Timeout, seed and projection settings
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid or the context cannot start
    pub fn new(factory: Option<ProjectorFactory>, settings: &EngineSettings) -> Result<Self> {
        settings.validate()?;
        let params = settings.projection();
        let context = PlacementContext::spawn(factory.clone(), params.clone(), settings.seed)?;

        Ok(Self {
            context: Some(context),
            factory,
            params,
            seed: settings.seed,
            timeout: settings.timeout(),
            in_flight: false,
        })
    }

    /// Override the round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Round-trip timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a background context is currently running.
    pub fn is_active(&self) -> bool {
        self.context.as_ref().is_some_and(PlacementContext::is_alive)
    }

    /// Place items on the hex grid in the background context.
    ///
    /// An empty item list resolves immediately without a round trip.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The background context reports an `error` message (`WorkerError`)
    /// - No response arrives within the timeout (`Timeout`)
    /// - The context exits before replying (`WorkerTerminated`)
    /// - The response is malformed or answers another request (`ProtocolError`)
    pub async fn compute_placement(
        &mut self,
        items: Vec<EmbeddingItem>,
        bounds: NormalizationBounds,
        config: PlacementConfig,
    ) -> Result<PlacementResult> {
        if items.is_empty() {
            return Ok(PlacementResult::default());
        }

        if self.in_flight {
            tracing::debug!("Previous request abandoned, replacing placement context");
            self.terminate();
        }

        let request_id = Uuid::new_v4();
        let frame =
            WorkerMessage::compute_placement(Some(request_id), items, bounds, config).to_frame()?;

        let response = self.ensure_context()?.submit(frame);
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.terminate();
                return Err(e);
            }
        };

        self.in_flight = true;
        let outcome = tokio::time::timeout(self.timeout, response).await;
        self.in_flight = false;

        let frame = match outcome {
            Ok(Ok(frame)) => frame,
            Ok(Err(_)) => {
                self.terminate();
                return Err(HexmapError::WorkerTerminated(
                    "background context dropped the request".to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(
                    request = %request_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Placement timed out, terminating background context"
                );
                self.terminate();
                return Err(HexmapError::Timeout(self.timeout));
            }
        };

        let message = WorkerMessage::from_frame(&frame)?;
        if message.request_id() != Some(request_id) {
            return Err(HexmapError::protocol(format!(
                "{} response does not match request {}",
                message.kind(),
                request_id
            )));
        }
        message.into_placement_result()
    }

    /// Stop the background context. The next request starts a fresh one.
    pub fn terminate(&mut self) {
        if let Some(context) = self.context.take() {
            tracing::debug!(context = %context.id(), "Placement context terminated");
        }
        self.in_flight = false;
    }

    fn ensure_context(&mut self) -> Result<&PlacementContext> {
        let alive = self.context.as_ref().is_some_and(PlacementContext::is_alive);
        if !alive {
            let context =
                PlacementContext::spawn(self.factory.clone(), self.params.clone(), self.seed)?;
            self.context = Some(context);
        }
        self.context
            .as_ref()
            .ok_or_else(|| HexmapError::WorkerTerminated("no placement context".to_string()))
    }
}

impl Drop for PlacementSession {
    fn drop(&mut self) {
        self.terminate();
    }
}
