//! Background placement context.
//!
//! A dedicated OS thread that owns the projector instance and the random
//! source for its whole lifetime. Jobs arrive as JSON frames over an
//! unbounded channel; each job carries a one-shot reply slot. Computation is
//! synchronous once started. The only way to cancel it is to drop the
//! context: that raises the projector's interrupt flag, so a projector that
//! polls it stops at its next checkpoint. The thread then discards the reply,
//! sees the closed channel and exits.

use super::protocol::WorkerMessage;
use crate::config::{PlacementConfig, ProjectionParams};
use crate::placement::{compute_placement, NormalizationBounds, PlacementResult};
use crate::projection::{InterruptFlag, Projector, ProjectorFactory};
use crate::types::error::{HexmapError, Result};
use crate::types::EmbeddingItem;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// One unit of work: a request frame and where to send the response frame.
pub(crate) struct Job {
    pub frame: String,
    pub reply: oneshot::Sender<String>,
}

/// Handle to a running background context.
pub struct PlacementContext {
    id: Uuid,
    sender: mpsc::UnboundedSender<Job>,
    interrupt: InterruptFlag,
}

impl PlacementContext {
    /// Spawn a new background context.
    ///
    /// # Arguments
    ///
    /// * `factory` - Projector constructor, invoked lazily inside the thread
    /// * `params` - Projection parameters for every request
    /// * `seed` - RNG seed (entropy-seeded when `None`)
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::IoError` if the thread cannot be spawned
    pub fn spawn(
        factory: Option<ProjectorFactory>,
        params: ProjectionParams,
        seed: Option<u64>,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        let interrupt = InterruptFlag::default();
        let mut state = ContextState::new(id, factory, params, seed);
        state.interrupt = interrupt.clone();

        thread::Builder::new()
            .name(format!("hexmap-placement-{}", &id.simple().to_string()[..8]))
            .spawn(move || state.run(receiver))?;

        tracing::debug!(context = %id, "Placement context started");
        Ok(Self {
            id,
            sender,
            interrupt,
        })
    }

    /// Context id (for logs).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the background thread is still accepting jobs.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Submit a request frame.
    ///
    /// # Returns
    ///
    /// Receiver that yields exactly one response frame
    ///
    /// # Errors
    ///
    /// Returns `HexmapError::WorkerTerminated` if the thread has exited
    pub(crate) fn submit(&self, frame: String) -> Result<oneshot::Receiver<String>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Job { frame, reply })
            .map_err(|_| HexmapError::WorkerTerminated(format!("context {} has exited", self.id)))?;
        Ok(response)
    }
}

impl Drop for PlacementContext {
    fn drop(&mut self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }
}

/// State owned by the background thread.
struct ContextState {
    id: Uuid,
    factory: Option<ProjectorFactory>,
    projector: Option<Box<dyn Projector>>,
    params: ProjectionParams,
    rng: StdRng,
    interrupt: InterruptFlag,
}

impl ContextState {
    fn new(
        id: Uuid,
        factory: Option<ProjectorFactory>,
        params: ProjectionParams,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            factory,
            projector: None,
            params,
            rng,
            interrupt: InterruptFlag::default(),
        }
    }

    fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = receiver.blocking_recv() {
            let response = self.handle_frame(&job.frame);
            let frame = response.to_frame().unwrap_or_else(|e| {
                serde_json::json!({
                    "type": "error",
                    "error": format!("Failed to encode response: {}", e),
                })
                .to_string()
            });
            if job.reply.send(frame).is_err() {
                tracing::debug!(context = %self.id, "Caller gone, response discarded");
            }
        }
        tracing::debug!(context = %self.id, "Placement context stopped");
    }

    /// Turn one request frame into exactly one response message.
    fn handle_frame(&mut self, frame: &str) -> WorkerMessage {
        let message = match WorkerMessage::from_frame(frame) {
            Ok(message) => message,
            Err(e) => return WorkerMessage::error(None, e.to_string()),
        };

        match message {
            WorkerMessage::ComputePlacement {
                request_id,
                items,
                bounds,
                config,
            } => {
                tracing::info!(
                    context = %self.id,
                    items = items.len(),
                    "Placement request received"
                );
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.place(&items, &bounds, &config)
                }));
                match outcome {
                    Ok(Ok(result)) => WorkerMessage::placement_result(request_id, result),
                    Ok(Err(e)) => {
                        tracing::warn!(context = %self.id, error = %e, "Placement failed");
                        WorkerMessage::error(request_id, e.to_string())
                    }
                    Err(_) => {
                        // The projector may be left inconsistent; rebuild it next time.
                        self.projector = None;
                        tracing::warn!(context = %self.id, "Placement panicked");
                        WorkerMessage::error(
                            request_id,
                            "Placement panicked inside the background context",
                        )
                    }
                }
            }
            other => WorkerMessage::error(
                other.request_id(),
                format!("Unsupported message type: {}", other.kind()),
            ),
        }
    }

    fn place(
        &mut self,
        items: &[EmbeddingItem],
        bounds: &NormalizationBounds,
        config: &PlacementConfig,
    ) -> Result<PlacementResult> {
        if items.len() < 2 {
            let mut unregistered = Unregistered;
            return compute_placement(
                items,
                bounds,
                config,
                &mut unregistered,
                &self.params,
                &mut self.rng,
            );
        }

        self.ensure_projector()?;
        let Self {
            projector,
            params,
            rng,
            ..
        } = self;
        let projector = projector
            .as_deref_mut()
            .ok_or_else(|| HexmapError::ProjectorUnavailable("projector not initialized".to_string()))?;
        compute_placement(items, bounds, config, projector, params, rng)
    }

    /// Build the projector singleton on first use.
    fn ensure_projector(&mut self) -> Result<()> {
        if self.projector.is_some() {
            return Ok(());
        }

        let factory = self.factory.as_ref().ok_or_else(|| {
            HexmapError::ProjectorUnavailable(
                "register a projector factory with the placement session".to_string(),
            )
        })?;
        let mut projector = factory()?;
        projector.set_interrupt(self.interrupt.clone());
        tracing::debug!(context = %self.id, projector = projector.name(), "Projector initialized");
        self.projector = Some(projector);
        Ok(())
    }
}

/// Stand-in used when no projection is needed; fails if ever invoked.
struct Unregistered;

impl Projector for Unregistered {
    fn name(&self) -> &str {
        "unregistered"
    }

    fn project(
        &mut self,
        _vectors: &[Vec<f32>],
        _params: &ProjectionParams,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<[f64; 2]>> {
        Err(HexmapError::ProjectorUnavailable(
            "no projector for this request".to_string(),
        ))
    }
}
