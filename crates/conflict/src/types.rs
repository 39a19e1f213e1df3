use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the content source an item came from.
pub type SourceLabel = String;

/// Explanation attached to verdicts with `is_conflict == true`.
///
/// The text is the same whichever kernel backend produced the scores.
pub const CONFLICT_EXPLANATION: &str = "INT8 semantic overlap detected.";

/// Explanation attached to verdicts with `is_conflict == false`.
pub const NO_CONFLICT_EXPLANATION: &str = "No significant semantic conflict detected.";

/// Outcome of analyzing one batch item against every other item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    /// At least one other item scored at or above the copy threshold.
    pub is_conflict: bool,
    /// Source label of this item (not of the matched opponent).
    pub winner_source: SourceLabel,
    /// Highest qualifying similarity, or `0.0` without a conflict.
    pub intensity: f32,
    /// Similarity against every other item, keyed by that item's source.
    ///
    /// When several items share a label the last one compared wins.
    pub source_scores: BTreeMap<SourceLabel, f32>,
    pub explanation: String,
    /// Reserved for a downstream manipulation analysis; always empty here.
    pub manipulation_flags: BTreeMap<SourceLabel, bool>,
}

impl Verdict {
    /// Empty verdict for an item from `source`.
    pub fn new(source: impl Into<SourceLabel>) -> Self {
        Self {
            is_conflict: false,
            winner_source: source.into(),
            intensity: 0.0,
            source_scores: BTreeMap::new(),
            explanation: NO_CONFLICT_EXPLANATION.to_string(),
            manipulation_flags: BTreeMap::new(),
        }
    }

    /// Record the similarity against one other item.
    pub(crate) fn observe(&mut self, source: &str, similarity: f32, threshold: f32) {
        match self.source_scores.get_mut(source) {
            Some(slot) => *slot = similarity,
            None => {
                self.source_scores.insert(source.to_string(), similarity);
            }
        }
        if similarity >= threshold {
            self.is_conflict = true;
            self.intensity = self.intensity.max(similarity);
        }
    }

    pub(crate) fn finish(&mut self) {
        self.explanation = if self.is_conflict {
            CONFLICT_EXPLANATION
        } else {
            NO_CONFLICT_EXPLANATION
        }
        .to_string();
    }

    /// Sum of all per-source similarity scores.
    pub fn centrality(&self) -> f32 {
        self.source_scores.values().sum()
    }

    /// Shannon entropy (nats) of the normalized score distribution.
    ///
    /// Negative scores count as zero. Returns `0.0` when no score is positive.
    pub fn score_entropy(&self) -> f32 {
        let total: f32 = self.source_scores.values().map(|&s| s.max(0.0)).sum();
        if total <= 0.0 {
            return 0.0;
        }
        -self
            .source_scores
            .values()
            .map(|&s| {
                let p = s.max(0.0) / total;
                p * (p + 1e-9).ln()
            })
            .sum::<f32>()
    }
}

/// Index of the verdict with the highest centrality (first on ties).
pub fn most_central(verdicts: &[Verdict]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, verdict) in verdicts.iter().enumerate() {
        let score = verdict.centrality();
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}
