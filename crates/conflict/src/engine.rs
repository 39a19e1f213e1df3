use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn, Level};

use crate::config::EngineConfig;
use crate::dedupe::dedupe_quantized;
use crate::error::ConflictError;
use crate::kernel::{Kernel, MAX_DIMENSION};
use crate::metrics::ConflictMetrics;
use crate::quantize::{quantize_batch, QuantizedVector};
use crate::types::Verdict;

#[cfg(test)]
mod tests;

/// Exhaustive all-pairs conflict detector over one batch of embeddings.
///
/// The engine holds only immutable configuration and the resolved kernel.
/// Every call allocates its own quantized table and verdicts and releases
/// them on return, so one engine can be shared across threads.
#[derive(Clone)]
pub struct ConflictEngine {
    cfg: EngineConfig,
    kernel: Kernel,
    metrics: Option<Arc<dyn ConflictMetrics>>,
}

impl std::fmt::Debug for ConflictEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictEngine")
            .field("cfg", &self.cfg)
            .field("kernel", &self.kernel.name())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Quantized batch with per-item norms, built once per call.
struct QuantizedTable {
    vectors: Vec<QuantizedVector>,
    norms: Vec<f32>,
}

impl ConflictEngine {
    /// Build an engine from a validated configuration.
    pub fn new(cfg: EngineConfig) -> Result<Self, ConflictError> {
        cfg.validate()?;
        let kernel = Kernel::new(cfg.kernel);
        Ok(Self {
            cfg,
            kernel,
            metrics: None,
        })
    }

    /// Engine with default settings and the given copy threshold.
    pub fn with_threshold(copy_threshold: f32) -> Result<Self, ConflictError> {
        Self::new(EngineConfig::default().with_copy_threshold(copy_threshold))
    }

    /// Attach a metrics observer to this engine instance.
    pub fn with_metrics(mut self, metrics: Arc<dyn ConflictMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn copy_threshold(&self) -> f32 {
        self.cfg.copy_threshold
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Produce one [`Verdict`] per input item, in input order.
    ///
    /// `embeddings` and `sources` are parallel sequences of equal length and
    /// every embedding must share one dimensionality. Both are checked before
    /// any pairwise work, so a violation fails the whole call.
    pub fn analyze_batch<E, S>(
        &self,
        embeddings: &[E],
        sources: &[S],
    ) -> Result<Vec<Verdict>, ConflictError>
    where
        E: AsRef<[f32]> + Sync,
        S: AsRef<str> + Sync,
    {
        let start = Instant::now();
        let dimension = embeddings.first().map_or(0, |e| e.as_ref().len());
        let span = tracing::span!(
            Level::INFO,
            "conflict.analyze_batch",
            items = embeddings.len(),
            dimension,
            kernel = self.kernel.name()
        );
        let _guard = span.enter();

        let result = self.analyze_inner(embeddings, sources);
        let elapsed = start.elapsed();

        match &result {
            Ok(verdicts) => {
                let conflicts = verdicts.iter().filter(|v| v.is_conflict).count();
                info!(
                    conflicts,
                    elapsed_micros = elapsed.as_micros(),
                    "analyze_batch_success"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch(embeddings.len(), elapsed, Ok(conflicts));
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    elapsed_micros = elapsed.as_micros(),
                    "analyze_batch_failure"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch(embeddings.len(), elapsed, Err(err));
                }
            }
        }
        result
    }

    fn analyze_inner<E, S>(
        &self,
        embeddings: &[E],
        sources: &[S],
    ) -> Result<Vec<Verdict>, ConflictError>
    where
        E: AsRef<[f32]> + Sync,
        S: AsRef<str> + Sync,
    {
        if embeddings.len() != sources.len() {
            return Err(ConflictError::SourceCountMismatch {
                embeddings: embeddings.len(),
                sources: sources.len(),
            });
        }
        check_dimensions(embeddings)?;

        let table = self.quantize_table(embeddings)?;

        if self.cfg.use_parallel {
            (0..embeddings.len())
                .into_par_iter()
                .map(|i| self.verdict_for(i, &table, sources))
                .collect()
        } else {
            (0..embeddings.len())
                .map(|i| self.verdict_for(i, &table, sources))
                .collect()
        }
    }

    fn quantize_table<E>(&self, embeddings: &[E]) -> Result<QuantizedTable, ConflictError>
    where
        E: AsRef<[f32]> + Sync,
    {
        let vectors = quantize_batch(embeddings, self.cfg.use_parallel);
        let norms: Vec<f32> = vectors
            .iter()
            .map(|v| self.kernel.l2_norm(v))
            .collect::<Result<_, _>>()?;
        Ok(QuantizedTable { vectors, norms })
    }

    /// Compare item `i` against every other item of the table.
    fn verdict_for<S: AsRef<str>>(
        &self,
        i: usize,
        table: &QuantizedTable,
        sources: &[S],
    ) -> Result<Verdict, ConflictError> {
        let mut verdict = Verdict::new(sources[i].as_ref());
        let own = &table.vectors[i];
        let own_norm = table.norms[i];

        for (j, (other, &other_norm)) in table.vectors.iter().zip(&table.norms).enumerate() {
            if i == j {
                continue;
            }
            let sim = self
                .kernel
                .cosine_with_norms(own, other, own_norm, other_norm)?;
            verdict.observe(sources[j].as_ref(), sim, self.cfg.copy_threshold);
        }

        verdict.finish();
        Ok(verdict)
    }

    /// Greedy near-duplicate filter at the configured `dedupe_threshold`.
    ///
    /// Returns the indices of the kept embeddings in input order.
    pub fn dedupe<E>(&self, embeddings: &[E]) -> Result<Vec<usize>, ConflictError>
    where
        E: AsRef<[f32]> + Sync,
    {
        check_dimensions(embeddings)?;
        let vectors = quantize_batch(embeddings, self.cfg.use_parallel);
        dedupe_quantized(&self.kernel, &vectors, self.cfg.dedupe_threshold)
    }
}

impl Default for ConflictEngine {
    fn default() -> Self {
        Self {
            cfg: EngineConfig::default(),
            kernel: Kernel::detect(),
            metrics: None,
        }
    }
}

/// Every embedding must match item 0 and fit the 32-bit accumulator.
fn check_dimensions<E: AsRef<[f32]>>(embeddings: &[E]) -> Result<(), ConflictError> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    let expected = first.as_ref().len();
    if expected > MAX_DIMENSION {
        return Err(ConflictError::DimensionTooLarge {
            dimension: expected,
            max: MAX_DIMENSION,
        });
    }
    for (index, embedding) in embeddings.iter().enumerate().skip(1) {
        let found = embedding.as_ref().len();
        if found != expected {
            return Err(ConflictError::DimensionMismatch {
                index,
                expected,
                found,
            });
        }
    }
    Ok(())
}
