//! Worker execution protocol.
//!
//! The CPU-bound projection + placement never runs on the caller's context.
//! A [`PlacementSession`] owns one [`PlacementContext`] (a dedicated thread)
//! and talks to it only through JSON frames:
//!
//! ```text
//!  caller (async)                         background thread
//!  ──────────────                         ─────────────────
//!  compute_placement ── computePlacement ──► projector + placement
//!        ▲  await (timeout)                        │
//!        └──────── placementResult | error ◄───────┘
//! ```
//!
//! Every request yields exactly one `placementResult` or `error`, or a
//! caller-side timeout.

mod context;
mod protocol;
mod session;

pub use context::PlacementContext;
pub use protocol::WorkerMessage;
pub use session::PlacementSession;
