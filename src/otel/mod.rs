//! Tracing instrumentation for placement jobs.
//!
//! Every CPU-bound stage runs inside an `INTERNAL` span named
//! `{job.type} {target}` with the custom attributes `job.type`,
//! `job.target`, `job.status`, `job.batch_size` and `job.duration_ms`.
//!
//! # Example
//!
//! ```rust,ignore
//! use semantic_hexmap::otel::{background_span, BackgroundJobType};
//!
//! let span = background_span(BackgroundJobType::Placement, "session-1");
//! let _guard = span.enter();
//! ```

pub mod background;

pub use background::{background_span, record_background_metrics, BackgroundJobType};
