//! Cross-label overlap resolution.
//!
//! When two detectors claim the same stretch of text under different
//! labels, the shorter span is demoted and the classifier is asked which
//! label the longer span deserves. The answer is only accepted if it is one
//! of the two labels in conflict.
//!
//! A collaborator failure switches relabeling off for the rest of the run;
//! demotion keeps working.

use tracing::{debug, warn};

use crate::adapters::Relabeler;
use crate::domain::DocumentGroup;

use super::overlap::OverlapDetector;
use super::same_label::by_length;

/// Counters for one run of the cross-label pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossLabelStats {
    pub conflicts: usize,
    pub classifier_calls: usize,
    pub relabeled: usize,
}

/// Run-scoped cross-label reconciler
pub struct CrossLabelReconciler<'a> {
    relabeler: Option<&'a Relabeler>,
    disabled: bool,
    stats: CrossLabelStats,
}

impl<'a> CrossLabelReconciler<'a> {
    /// `None` runs the pass with demotion only
    pub fn new(relabeler: Option<&'a Relabeler>) -> Self {
        Self {
            relabeler,
            disabled: false,
            stats: CrossLabelStats::default(),
        }
    }

    /// Demotion only, with relabeling reported as disabled from the start.
    ///
    /// Used when the configured classifier could not be loaded.
    pub fn unavailable() -> Self {
        Self {
            relabeler: None,
            disabled: true,
            stats: CrossLabelStats::default(),
        }
    }

    /// Whether a collaborator failure switched relabeling off
    pub fn relabel_disabled(&self) -> bool {
        self.disabled
    }

    pub fn stats(&self) -> CrossLabelStats {
        self.stats
    }

    fn active_relabeler(&self) -> Option<&'a Relabeler> {
        if self.disabled {
            None
        } else {
            self.relabeler
        }
    }

    /// Resolve cross-label overlaps in one group
    pub fn reconcile(&mut self, group: &mut DocumentGroup, detector: &OverlapDetector) {
        let spans = &mut group.spans;

        for i in 0..spans.len() {
            for j in (i + 1)..spans.len() {
                if spans[i].label == spans[j].label || !detector.overlaps(&spans[i], &spans[j]) {
                    continue;
                }

                self.stats.conflicts += 1;
                let (shorter, longer) = by_length(spans, i, j);
                spans[shorter].demote();

                let Some(relabeler) = self.active_relabeler() else {
                    continue;
                };

                self.stats.classifier_calls += 1;
                let predicted = match relabeler.classify(&spans[longer].text) {
                    Ok(label) => label,
                    Err(e) => {
                        warn!(
                            document = %group.key,
                            error = %e,
                            "Classifier failed, disabling relabeling for this run"
                        );
                        self.disabled = true;
                        continue;
                    }
                };

                if predicted != spans[i].label && predicted != spans[j].label {
                    debug!(
                        document = %group.key,
                        %predicted,
                        "Prediction matches neither label, keeping original"
                    );
                    continue;
                }

                if spans[longer].label != predicted {
                    debug!(
                        document = %group.key,
                        text = %spans[longer].text,
                        from = %spans[longer].label,
                        to = %predicted,
                        "Relabeling span"
                    );
                    spans[longer].label = predicted;
                    self.stats.relabeled += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{CollaboratorError, Embedder, LabelClassifier, LabelEncoder};
    use crate::domain::{DocumentKey, Span};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const COMMENT: &str = "the nurses were so kind";

    struct NullEmbedder;
    impl Embedder for NullEmbedder {
        fn embed(&self, _: &str) -> Result<Vec<f32>, CollaboratorError> {
            Ok(vec![0.0])
        }
    }

    /// Always predicts one class and counts calls
    struct Constant {
        class: usize,
        calls: Arc<AtomicUsize>,
    }
    impl LabelClassifier for Constant {
        fn predict(&self, _: &[f32]) -> Result<usize, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.class)
        }
    }

    struct Failing;
    impl LabelClassifier for Failing {
        fn predict(&self, _: &[f32]) -> Result<usize, CollaboratorError> {
            Err(CollaboratorError::Classification("model offline".into()))
        }
    }

    fn relabeler(class: usize) -> (Relabeler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let relabeler = Relabeler::new(
            Box::new(NullEmbedder),
            Box::new(Constant {
                class,
                calls: calls.clone(),
            }),
            LabelEncoder::fit(["Kindness", "Other", "Staff"]),
        );
        (relabeler, calls)
    }

    fn conflict() -> DocumentGroup {
        DocumentGroup {
            key: DocumentKey::Natural("c1".into()),
            spans: vec![
                Span::new(COMMENT, "Staff", "nurses were so kind", 4, 23, 0.9),
                Span::new(COMMENT, "Kindness", "nurses were so", 4, 18, 0.9),
            ],
        }
    }

    #[test]
    fn test_relabels_longer_span_with_conflicting_label() {
        let (relabeler, calls) = relabeler(0); // Kindness
        let mut reconciler = CrossLabelReconciler::new(Some(&relabeler));
        let mut g = conflict();
        reconciler.reconcile(&mut g, &OverlapDetector::default());

        assert!(g.spans[0].relevant);
        assert!(!g.spans[1].relevant);
        assert_eq!(g.spans[0].label, "Kindness");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.stats().relabeled, 1);
    }

    #[test]
    fn test_prediction_matching_neither_label_keeps_original() {
        let (relabeler, _) = relabeler(1); // Other
        let mut reconciler = CrossLabelReconciler::new(Some(&relabeler));
        let mut g = conflict();
        reconciler.reconcile(&mut g, &OverlapDetector::default());

        assert_eq!(g.spans[0].label, "Staff");
        assert_eq!(g.spans[1].label, "Kindness");
        assert!(!g.spans[1].relevant);
        assert_eq!(reconciler.stats().relabeled, 0);
    }

    #[test]
    fn test_without_classifier_only_demotes() {
        let mut reconciler = CrossLabelReconciler::new(None);
        let mut g = conflict();
        reconciler.reconcile(&mut g, &OverlapDetector::default());

        assert_eq!(reconciler.stats().conflicts, 1);
        assert_eq!(reconciler.stats().classifier_calls, 0);
        assert!(!g.spans[1].relevant);
        assert_eq!(g.spans[0].label, "Staff");
    }

    #[test]
    fn test_failure_disables_relabeling_for_run() {
        let failing = Relabeler::new(
            Box::new(NullEmbedder),
            Box::new(Failing),
            LabelEncoder::fit(["Kindness", "Staff"]),
        );
        let mut reconciler = CrossLabelReconciler::new(Some(&failing));

        for _ in 0..2 {
            let mut g = conflict();
            reconciler.reconcile(&mut g, &OverlapDetector::default());
            assert!(!g.spans[1].relevant);
            assert_eq!(g.spans[0].label, "Staff");
        }

        assert!(reconciler.relabel_disabled());
        assert_eq!(reconciler.stats().classifier_calls, 1);
        assert_eq!(reconciler.stats().conflicts, 2);
    }

    #[test]
    fn test_same_label_pairs_ignored() {
        let (relabeler, calls) = relabeler(0);
        let mut reconciler = CrossLabelReconciler::new(Some(&relabeler));
        let mut g = conflict();
        g.spans[1].label = "Staff".into();

        reconciler.reconcile(&mut g, &OverlapDetector::default());

        assert!(g.spans.iter().all(|s| s.relevant));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
