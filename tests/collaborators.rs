//! Collaborator Integration Tests
//!
//! Cross-label reconciliation with stub and kNN-backed classifiers.

use spanrec::adapters::knn::load_relabeler;
use spanrec::adapters::{HashingEmbedder, KnnClassifier, ReferenceExample, ReferenceSet};
use spanrec::adapters::hashing::DEFAULT_DIMENSIONS;
use spanrec::config::{ResolvedClassifier, ResolvedConfig};
use spanrec::domain::{KeyFallback, Span};
use spanrec::{CollaboratorError, Embedder, Engine, LabelClassifier, LabelEncoder, Relabeler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const COMMENT: &str = "the nurses were so kind";

fn conflicting_pair() -> Vec<Span> {
    vec![
        Span::new(COMMENT, "Staff", "nurses were so kind", 4, 23, 0.9).with_field("comment_id", 7),
        Span::new(COMMENT, "Kindness", "nurses were so", 4, 18, 0.8).with_field("comment_id", 7),
    ]
}

fn engine_with(relabeler: Relabeler) -> Engine {
    Engine::default()
        .with_grouping(Some("comment_id".into()), KeyFallback::RowPosition)
        .with_relabeler(relabeler)
}

struct UnitEmbedder;
impl Embedder for UnitEmbedder {
    fn embed(&self, _: &str) -> Result<Vec<f32>, CollaboratorError> {
        Ok(vec![1.0])
    }
}

struct Fixed {
    class: usize,
    calls: Arc<AtomicUsize>,
}
impl LabelClassifier for Fixed {
    fn predict(&self, _: &[f32]) -> Result<usize, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.class)
    }
}

struct Broken {
    calls: Arc<AtomicUsize>,
}
impl LabelClassifier for Broken {
    fn predict(&self, _: &[f32]) -> Result<usize, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CollaboratorError::Unavailable("model offline".into()))
    }
}

fn encoder() -> LabelEncoder {
    // Sorted: 0 = Cost, 1 = Kindness, 2 = Staff
    LabelEncoder::fit(["Staff", "Kindness", "Cost"])
}

fn fixed(class: usize) -> (Relabeler, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let relabeler = Relabeler::new(
        Box::new(UnitEmbedder),
        Box::new(Fixed {
            class,
            calls: calls.clone(),
        }),
        encoder(),
    );
    (relabeler, calls)
}

#[test]
fn test_prediction_matching_neither_label_keeps_original() {
    let (relabeler, calls) = fixed(0);
    let result = engine_with(relabeler).run(conflicting_pair());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.spans[0].label, "Staff");
    assert!(result.spans[0].relevant);
    assert_eq!(result.spans[1].label, "Kindness");
    assert!(!result.spans[1].relevant);
    assert_eq!(result.report.relabeled, 0);
}

#[test]
fn test_prediction_of_other_label_relabels_longer() {
    let (relabeler, _) = fixed(1);
    let result = engine_with(relabeler).run(conflicting_pair());

    assert_eq!(result.spans[0].label, "Kindness");
    assert!(result.spans[0].relevant);
    assert!(!result.spans[1].relevant);
    assert_eq!(result.report.cross_label_conflicts, 1);
    assert_eq!(result.report.relabeled, 1);
}

#[test]
fn test_prediction_of_own_label_is_not_a_relabel() {
    let (relabeler, _) = fixed(2);
    let result = engine_with(relabeler).run(conflicting_pair());

    assert_eq!(result.spans[0].label, "Staff");
    assert_eq!(result.report.classifier_calls, 1);
    assert_eq!(result.report.relabeled, 0);
}

#[test]
fn test_classifier_failure_disables_relabeling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let relabeler = Relabeler::new(
        Box::new(UnitEmbedder),
        Box::new(Broken {
            calls: calls.clone(),
        }),
        encoder(),
    );

    // Two documents, each with one cross-label conflict
    let mut spans = conflicting_pair();
    spans.extend(
        conflicting_pair()
            .into_iter()
            .map(|s| s.with_field("comment_id", 8)),
    );

    let result = engine_with(relabeler).run(spans);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.report.relabel_disabled);
    assert_eq!(result.report.cross_label_conflicts, 2);
    // Demotion still happens without the classifier
    assert_eq!(result.spans.iter().filter(|s| !s.relevant).count(), 2);
    assert_eq!(result.spans[0].label, "Staff");
    assert_eq!(result.spans[2].label, "Staff");
}

#[test]
fn test_unknown_class_index_disables_relabeling() {
    let (relabeler, _) = fixed(9);
    let result = engine_with(relabeler).run(conflicting_pair());

    assert!(result.report.relabel_disabled);
    assert_eq!(result.spans[0].label, "Staff");
}

#[test]
fn test_knn_relabeler_end_to_end() {
    let set = ReferenceSet {
        k: 1,
        examples: vec![
            ReferenceExample {
                text: "nurses were so kind".into(),
                label: "Kindness".into(),
            },
            ReferenceExample {
                text: "parking was expensive".into(),
                label: "Cost".into(),
            },
        ],
    };

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("reference.json");
    std::fs::write(&path, serde_json::to_string(&set).unwrap()).unwrap();

    let relabeler = load_relabeler(&path, 64).unwrap();
    let result = engine_with(relabeler).run(conflicting_pair());

    // The exact reference text is its own nearest neighbour
    assert_eq!(result.spans[0].label, "Kindness");
    assert_eq!(result.report.relabeled, 1);
}

#[test]
fn test_knn_classifier_direct() {
    let embedder = HashingEmbedder::new(128).unwrap();
    let set = ReferenceSet {
        k: 3,
        examples: vec![
            ReferenceExample {
                text: "friendly helpful staff".into(),
                label: "Staff".into(),
            },
            ReferenceExample {
                text: "staff were friendly".into(),
                label: "Staff".into(),
            },
            ReferenceExample {
                text: "too expensive overall".into(),
                label: "Cost".into(),
            },
        ],
    };

    let (classifier, encoder) = KnnClassifier::from_reference(&set, &embedder).unwrap();
    let query = embedder.embed("friendly staff").unwrap();
    let class = classifier.predict(&query).unwrap();
    assert_eq!(encoder.inverse_transform(class).unwrap(), "Staff");
}

#[test]
fn test_missing_reference_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    assert!(load_relabeler(&temp.path().join("missing.json"), 64).is_err());
}

#[test]
fn test_unreadable_reference_file_still_reconciles() {
    let temp = TempDir::new().unwrap();
    let config = ResolvedConfig {
        key_field: Some("comment_id".into()),
        classifier: Some(ResolvedClassifier {
            reference_file: temp.path().join("missing.json"),
            dimensions: DEFAULT_DIMENSIONS,
        }),
        ..ResolvedConfig::default()
    };

    let engine = config.build_engine().unwrap();
    let result = engine.run(conflicting_pair());

    assert_eq!(result.spans.len(), 2);
    assert!(result.report.relabel_disabled);
    assert_eq!(result.report.classifier_calls, 0);
    assert_eq!(result.report.cross_label_conflicts, 1);
    assert_eq!(result.spans[0].label, "Staff");
    assert!(result.spans[0].relevant);
    assert!(!result.spans[1].relevant);
}
