//! Configuration for the batch conflict engine.
//!
//! The configuration is fixed when a [`crate::ConflictEngine`] is built and
//! never changes afterwards, so a single engine can serve concurrent batches.

use serde::{Deserialize, Serialize};

use crate::error::ConflictError;
use crate::kernel::KernelBackend;

/// Default similarity at or above which two items conflict.
pub const DEFAULT_COPY_THRESHOLD: f32 = 0.92;

/// Default similarity at or above which an item is dropped as a near-duplicate.
pub const DEFAULT_DEDUPE_THRESHOLD: f32 = 0.92;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Configuration schema version.
    #[serde(default = "EngineConfig::default_version")]
    pub version: u32,
    /// Cosine similarity at or above which two batch items are in conflict.
    #[serde(default = "EngineConfig::default_copy_threshold")]
    pub copy_threshold: f32,
    /// Cosine similarity at or above which [`crate::ConflictEngine::dedupe`]
    /// drops an item.
    #[serde(default = "EngineConfig::default_dedupe_threshold")]
    pub dedupe_threshold: f32,
    /// Spread the per-item loop over the rayon pool.
    #[serde(default)]
    pub use_parallel: bool,
    /// Kernel backend preference.
    #[serde(default)]
    pub kernel: KernelBackend,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn default_version() -> u32 {
        1
    }

    fn default_copy_threshold() -> f32 {
        DEFAULT_COPY_THRESHOLD
    }

    fn default_dedupe_threshold() -> f32 {
        DEFAULT_DEDUPE_THRESHOLD
    }

    pub fn with_copy_threshold(mut self, threshold: f32) -> Self {
        self.copy_threshold = threshold;
        self
    }

    pub fn with_dedupe_threshold(mut self, threshold: f32) -> Self {
        self.dedupe_threshold = threshold;
        self
    }

    /// Enable or disable parallel batch analysis.
    /// Verdicts are identical either way; only wall-clock time changes.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelBackend) -> Self {
        self.kernel = kernel;
        self
    }

    /// Validate configuration parameters.
    ///
    /// Thresholds must be finite and lie in `(0, 1]`; anything else is rejected
    /// rather than clamped.
    pub fn validate(&self) -> Result<(), ConflictError> {
        if self.version < 1 {
            return Err(ConflictError::InvalidConfigVersion {
                version: self.version,
            });
        }
        check_threshold("copy_threshold", self.copy_threshold)?;
        check_threshold("dedupe_threshold", self.dedupe_threshold)
    }
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConflictError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConflictError::InvalidThreshold { name, value })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            copy_threshold: DEFAULT_COPY_THRESHOLD,
            dedupe_threshold: DEFAULT_DEDUPE_THRESHOLD,
            use_parallel: false,
            kernel: KernelBackend::Auto,
        }
    }
}
