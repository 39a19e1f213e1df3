// Metrics hooks for the conflict engine.
//
// Callers attach a `ConflictMetrics` implementation to an engine through
// `ConflictEngine::with_metrics`; the engine then reports per-batch latency,
// item counts and conflict counts. The recorder is owned by the engine
// instance, never installed process-wide.
use std::time::Duration;

use crate::error::ConflictError;

/// Metrics observer for batch analysis.
pub trait ConflictMetrics: Send + Sync {
    /// Record the outcome of one `analyze_batch` call.
    ///
    /// `items` is the batch length, `latency` the wall-clock duration of the
    /// call, and `result` carries the number of conflicting verdicts on
    /// success.
    fn record_batch(&self, items: usize, latency: Duration, result: Result<usize, &ConflictError>);
}
