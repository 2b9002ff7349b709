//! Background job instrumentation.
//!
//! For the CPU-bound stages: projection, placement and theme assignment.
//! Uses INTERNAL span kind since these run off the caller's context.

use tracing::field::Empty;
use tracing::{span, Level, Span};

/// Background job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundJobType {
    /// Dimensionality reduction to 2D
    Projection,
    /// Normalization, hex conversion and collision resolution
    Placement,
    /// K-means theme assignment
    ThemeAssignment,
}

impl BackgroundJobType {
    /// Get job type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projection => "projection.run",
            Self::Placement => "placement.compute",
            Self::ThemeAssignment => "themes.assign",
        }
    }
}

/// Create background job span.
///
/// # Arguments
///
/// * `job_type` - Type of background job
/// * `target` - Job target (session id, projector name, etc.)
///
/// # Returns
///
/// Tracing span with job attributes; metric fields start empty and are
/// filled by [`record_background_metrics`]
pub fn background_span(job_type: BackgroundJobType, target: &str) -> Span {
    span!(
        Level::INFO,
        "background.job",
        otel.name = format!("{} {}", job_type.as_str(), target),
        otel.kind = "internal",
        job.type = job_type.as_str(),
        job.target = target,
        job.batch_size = Empty,
        job.duration_ms = Empty,
        job.status = Empty,
    )
}

/// Record background job metrics on the current span.
///
/// # Arguments
///
/// * `batch_size` - Number of items processed (optional)
/// * `duration_ms` - Processing duration in milliseconds (optional)
/// * `status` - Job status ("success", "failed", "partial")
pub fn record_background_metrics(batch_size: Option<usize>, duration_ms: Option<u64>, status: &str) {
    let span = Span::current();
    if let Some(size) = batch_size {
        span.record("job.batch_size", size as u64);
    }
    if let Some(duration) = duration_ms {
        span.record("job.duration_ms", duration);
    }
    span.record("job.status", status);
}
