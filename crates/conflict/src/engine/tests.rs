use super::*;
use std::sync::Mutex;
use std::time::Duration;

use crate::kernel::KernelBackend;
use crate::types::{CONFLICT_EXPLANATION, NO_CONFLICT_EXPLANATION};

fn one_hot(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot] = 1.0;
    v
}

fn random_batch(seed: u64, n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.f32() * 2.0 - 1.0).collect())
        .collect()
}

#[derive(Default)]
struct RecordingMetrics {
    events: Mutex<Vec<(usize, Result<usize, ConflictError>)>>,
}

impl ConflictMetrics for RecordingMetrics {
    fn record_batch(&self, items: usize, _latency: Duration, result: Result<usize, &ConflictError>) {
        self.events
            .lock()
            .unwrap()
            .push((items, result.map_err(|err| err.clone())));
    }
}

#[test]
fn identical_pair_conflicts() {
    let engine = ConflictEngine::default();
    let e = one_hot(8, 0);
    let verdicts = engine
        .analyze_batch(&[e.clone(), e], &["A", "B"])
        .expect("analyze");

    assert_eq!(verdicts.len(), 2);
    for (v, (own, other)) in verdicts.iter().zip([("A", "B"), ("B", "A")]) {
        assert!(v.is_conflict);
        assert!((v.intensity - 1.0).abs() < 1e-6);
        assert_eq!(v.winner_source, own);
        assert_eq!(v.source_scores.len(), 1);
        assert!((v.source_scores[other] - 1.0).abs() < 1e-6);
        assert_eq!(v.explanation, CONFLICT_EXPLANATION);
        assert!(v.manipulation_flags.is_empty());
    }
}

#[test]
fn orthogonal_items_do_not_conflict() {
    let engine = ConflictEngine::default();
    let batch = vec![one_hot(3, 0), one_hot(3, 1), one_hot(3, 2)];
    let verdicts = engine.analyze_batch(&batch, &["A", "B", "C"]).unwrap();

    assert_eq!(verdicts.len(), 3);
    for v in &verdicts {
        assert!(!v.is_conflict);
        assert_eq!(v.intensity, 0.0);
        assert_eq!(v.source_scores.len(), 2);
        assert!(v.source_scores.values().all(|&s| s.abs() < 1e-6));
        assert_eq!(v.explanation, NO_CONFLICT_EXPLANATION);
    }
}

#[test]
fn single_item_has_no_pairs() {
    let engine = ConflictEngine::default();
    let verdicts = engine.analyze_batch(&[vec![0.3_f32, 0.4]], &["solo"]).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert!(!verdicts[0].is_conflict);
    assert_eq!(verdicts[0].intensity, 0.0);
    assert!(verdicts[0].source_scores.is_empty());
    assert_eq!(verdicts[0].winner_source, "solo");
}

#[test]
fn empty_batch_yields_no_verdicts() {
    let engine = ConflictEngine::default();
    let embeddings: Vec<Vec<f32>> = Vec::new();
    let sources: Vec<String> = Vec::new();
    assert!(engine.analyze_batch(&embeddings, &sources).unwrap().is_empty());
}

#[test]
fn source_scores_exclude_own_index() {
    let engine = ConflictEngine::default();
    let batch = random_batch(1, 5, 16);
    let sources = ["s0", "s1", "s2", "s3", "s4"];
    let verdicts = engine.analyze_batch(&batch, &sources).unwrap();
    for (i, v) in verdicts.iter().enumerate() {
        assert!(!v.source_scores.contains_key(sources[i]));
        assert_eq!(v.source_scores.len(), 4);
    }
}

#[test]
fn duplicate_sources_keep_last_computed_score() {
    let engine = ConflictEngine::default();
    let batch = vec![one_hot(4, 0), one_hot(4, 0), one_hot(4, 1)];
    // items 1 and 2 share a label; for item 0 the later (orthogonal) one wins
    let verdicts = engine.analyze_batch(&batch, &["X", "dup", "dup"]).unwrap();

    let first = &verdicts[0];
    assert_eq!(first.source_scores.len(), 1);
    assert_eq!(first.source_scores["dup"], 0.0);
    assert!(first.is_conflict);
    assert!((first.intensity - 1.0).abs() < 1e-6);
}

#[test]
fn duplicate_label_can_include_own_label() {
    // The own index is skipped, but another item may carry the same label.
    let engine = ConflictEngine::default();
    let batch = vec![one_hot(2, 0), one_hot(2, 0)];
    let verdicts = engine.analyze_batch(&batch, &["same", "same"]).unwrap();
    assert_eq!(verdicts[0].source_scores.len(), 1);
    assert!((verdicts[0].source_scores["same"] - 1.0).abs() < 1e-6);
}

#[test]
fn threshold_changes_classification() {
    let a: Vec<f32> = vec![1.0, 0.0];
    let b: Vec<f32> = vec![0.8, 0.6];
    // quantized cosine is 102 / sqrt(102^2 + 76^2) ~= 0.80
    let strict = ConflictEngine::with_threshold(0.92).unwrap();
    let loose = ConflictEngine::with_threshold(0.75).unwrap();

    let batch = [a, b];
    let strict_v = strict.analyze_batch(&batch, &["a", "b"]).unwrap();
    let loose_v = loose.analyze_batch(&batch, &["a", "b"]).unwrap();

    assert!(!strict_v[0].is_conflict);
    assert!(loose_v[0].is_conflict);
    assert!((loose_v[0].intensity - strict_v[0].source_scores["b"]).abs() < 1e-6);
}

#[test]
fn intensity_is_max_over_qualifying_pairs() {
    let engine = ConflictEngine::with_threshold(0.5).unwrap();
    let batch: Vec<Vec<f32>> = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.9, 0.3, 0.0],
        vec![1.0, 0.05, 0.0],
        vec![0.0, 1.0, 0.0],
    ];
    let verdicts = engine.analyze_batch(&batch, &["a", "b", "c", "d"]).unwrap();
    let v = &verdicts[0];
    let best = v
        .source_scores
        .values()
        .copied()
        .filter(|&s| s >= 0.5)
        .fold(0.0_f32, f32::max);
    assert_eq!(v.intensity, best);
    assert_eq!(v.intensity, v.source_scores["c"]);
}

#[test]
fn scores_are_symmetric_across_verdicts() {
    let engine = ConflictEngine::default();
    let batch = random_batch(5, 6, 70);
    let sources: Vec<String> = (0..6).map(|i| format!("src-{i}")).collect();
    let verdicts = engine.analyze_batch(&batch, &sources).unwrap();
    for i in 0..6 {
        for j in 0..6 {
            if i != j {
                assert_eq!(
                    verdicts[i].source_scores[&sources[j]],
                    verdicts[j].source_scores[&sources[i]]
                );
            }
        }
    }
}

#[test]
fn parallel_matches_sequential() {
    let batch = random_batch(77, 40, 129);
    let sources: Vec<String> = (0..40).map(|i| format!("s{}", i % 13)).collect();

    let seq = ConflictEngine::new(EngineConfig::new().with_copy_threshold(0.1)).unwrap();
    let par = ConflictEngine::new(
        EngineConfig::new()
            .with_copy_threshold(0.1)
            .with_parallel(true),
    )
    .unwrap();

    assert_eq!(
        seq.analyze_batch(&batch, &sources).unwrap(),
        par.analyze_batch(&batch, &sources).unwrap()
    );
}

#[test]
fn scalar_backend_matches_detected_backend() {
    let batch = random_batch(99, 12, 385);
    let sources: Vec<String> = (0..12).map(|i| i.to_string()).collect();
    let scalar = ConflictEngine::new(EngineConfig::new().with_kernel(KernelBackend::Scalar)).unwrap();
    let auto = ConflictEngine::default();
    assert_eq!(scalar.kernel().name(), "scalar");
    assert_eq!(
        scalar.analyze_batch(&batch, &sources).unwrap(),
        auto.analyze_batch(&batch, &sources).unwrap()
    );
}

#[test]
fn zero_embedding_scores_zero() {
    let engine = ConflictEngine::default();
    let batch = vec![vec![0.0; 4], vec![0.001; 4], one_hot(4, 2)];
    let verdicts = engine.analyze_batch(&batch, &["zero", "tiny", "hot"]).unwrap();
    // 0.001 quantizes to 0, so the first two items are both degenerate
    for v in &verdicts[..2] {
        assert!(v.source_scores.values().all(|&s| s == 0.0));
        assert!(!v.is_conflict);
    }
}

#[test]
fn mismatched_source_count_fails() {
    let engine = ConflictEngine::default();
    let err = engine
        .analyze_batch(&[vec![1.0_f32], vec![1.0]], &["only-one"])
        .unwrap_err();
    assert_eq!(
        err,
        ConflictError::SourceCountMismatch {
            embeddings: 2,
            sources: 1
        }
    );
}

#[test]
fn mismatched_dimensions_fail_before_pairwise_work() {
    let engine = ConflictEngine::new(EngineConfig::new().with_parallel(true)).unwrap();
    let batch: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0, 0.0], vec![1.0]];
    let err = engine.analyze_batch(&batch, &["a", "b", "c", "d"]).unwrap_err();
    assert_eq!(
        err,
        ConflictError::DimensionMismatch {
            index: 2,
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn oversized_dimension_rejected() {
    let engine = ConflictEngine::default();
    let huge = vec![vec![0.0_f32; MAX_DIMENSION + 1]];
    let err = engine.analyze_batch(&huge, &["big"]).unwrap_err();
    assert!(matches!(err, ConflictError::DimensionTooLarge { .. }));
}

#[test]
fn invalid_threshold_rejected_at_construction() {
    assert!(ConflictEngine::with_threshold(0.0).is_err());
    assert!(ConflictEngine::with_threshold(1.2).is_err());
    assert!(ConflictEngine::with_threshold(f32::NAN).is_err());
    assert!(ConflictEngine::with_threshold(1.0).is_ok());
}

#[test]
fn inputs_are_not_mutated() {
    let engine = ConflictEngine::default();
    let batch: Vec<Vec<f32>> = vec![vec![2.0, -3.0], vec![0.5, 0.5]];
    let copy = batch.clone();
    engine.analyze_batch(&batch, &["a", "b"]).unwrap();
    assert_eq!(batch, copy);
}

#[test]
fn metrics_receive_success_and_failure() {
    let recorder = Arc::new(RecordingMetrics::default());
    let engine = ConflictEngine::default().with_metrics(recorder.clone());

    let e = one_hot(3, 1);
    engine
        .analyze_batch(&[e.clone(), e.clone(), one_hot(3, 0)], &["a", "b", "c"])
        .unwrap();
    engine.analyze_batch(&[e], &["a", "b"]).unwrap_err();

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], (3, Ok(2)));
    assert!(matches!(
        events[1],
        (1, Err(ConflictError::SourceCountMismatch { .. }))
    ));
}

#[test]
fn dedupe_uses_configured_threshold() {
    let batch: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![0.8, 0.6], vec![1.0, 0.01]];
    let strict = ConflictEngine::new(EngineConfig::new().with_dedupe_threshold(0.95)).unwrap();
    let loose = ConflictEngine::new(EngineConfig::new().with_dedupe_threshold(0.7)).unwrap();
    assert_eq!(strict.dedupe(&batch).unwrap(), vec![0, 1]);
    assert_eq!(loose.dedupe(&batch).unwrap(), vec![0]);
}

#[test]
fn dedupe_rejects_mismatched_dimensions() {
    let engine = ConflictEngine::default();
    let err = engine.dedupe(&[vec![1.0_f32], vec![1.0, 2.0]]).unwrap_err();
    assert!(matches!(err, ConflictError::DimensionMismatch { index: 1, .. }));
}

#[test]
fn engine_is_shareable_across_threads() {
    let engine = Arc::new(ConflictEngine::default());
    let batch = Arc::new(random_batch(3, 10, 64));
    let sources: Arc<Vec<String>> = Arc::new((0..10).map(|i| format!("t{i}")).collect());
    let expected = engine
        .analyze_batch(batch.as_slice(), sources.as_slice())
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let batch = Arc::clone(&batch);
            let sources = Arc::clone(&sources);
            std::thread::spawn(move || {
                engine
                    .analyze_batch(batch.as_slice(), sources.as_slice())
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
