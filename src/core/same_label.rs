//! Same-label overlap resolution.
//!
//! Within a document, two overlapping spans carrying the same label are
//! redundant: the shorter one is demoted. Labels never change here.

use tracing::debug;

use crate::domain::{DocumentGroup, Span};

use super::overlap::OverlapDetector;

/// Order a conflicting pair as `(shorter, longer)`.
///
/// `i` loses only when strictly shorter, so equal lengths demote `j`.
pub(crate) fn by_length(spans: &[Span], i: usize, j: usize) -> (usize, usize) {
    if spans[i].char_len() < spans[j].char_len() {
        (i, j)
    } else {
        (j, i)
    }
}

/// Resolve same-label overlaps in one group; returns the number of conflicts.
///
/// Every pair `i < j` is visited, including pairs whose spans were already
/// demoted by an earlier pair.
pub fn reconcile_same_label(group: &mut DocumentGroup, detector: &OverlapDetector) -> usize {
    let spans = &mut group.spans;
    let mut conflicts = 0;

    for i in 0..spans.len() {
        for j in (i + 1)..spans.len() {
            if spans[i].label != spans[j].label || !detector.overlaps(&spans[i], &spans[j]) {
                continue;
            }

            let (shorter, longer) = by_length(spans, i, j);
            debug!(
                document = %group.key,
                label = %spans[i].label,
                demoted = %spans[shorter].text,
                kept = %spans[longer].text,
                "Same-label overlap"
            );
            spans[shorter].demote();
            conflicts += 1;
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentKey;

    fn group(spans: Vec<Span>) -> DocumentGroup {
        DocumentGroup {
            key: DocumentKey::Natural("c1".into()),
            spans,
        }
    }

    const COMMENT: &str = "great service!! and kind staff";

    #[test]
    fn test_shorter_duplicate_demoted() {
        let mut g = group(vec![
            Span::new(COMMENT, "Service", "great service!!", 0, 15, 0.9),
            Span::new(COMMENT, "Service", "great service", 0, 13, 0.8),
        ]);

        let conflicts = reconcile_same_label(&mut g, &OverlapDetector::default());

        assert_eq!(conflicts, 1);
        assert!(g.spans[0].relevant);
        assert!(!g.spans[1].relevant);
        assert_eq!(g.spans[0].label, "Service");
        assert_eq!(g.spans[1].label, "Service");
    }

    #[test]
    fn test_shorter_first_span_demoted() {
        let mut g = group(vec![
            Span::new(COMMENT, "Service", "great service", 0, 13, 0.8),
            Span::new(COMMENT, "Service", "great service!!", 0, 15, 0.9),
        ]);
        reconcile_same_label(&mut g, &OverlapDetector::default());

        assert!(!g.spans[0].relevant);
        assert!(g.spans[1].relevant);
    }

    #[test]
    fn test_equal_length_demotes_later_span() {
        let mut g = group(vec![
            Span::new(COMMENT, "Service", "great service", 0, 13, 0.8),
            Span::new(COMMENT, "Service", "great service", 0, 13, 0.9),
        ]);
        reconcile_same_label(&mut g, &OverlapDetector::default());

        assert!(g.spans[0].relevant);
        assert!(!g.spans[1].relevant);
    }

    #[test]
    fn test_different_labels_untouched() {
        let mut g = group(vec![
            Span::new(COMMENT, "Service", "great service!!", 0, 15, 0.9),
            Span::new(COMMENT, "Praise", "great service", 0, 13, 0.8),
        ]);
        assert_eq!(reconcile_same_label(&mut g, &OverlapDetector::default()), 0);
        assert!(g.spans.iter().all(|s| s.relevant));
    }

    #[test]
    fn test_demoted_span_still_compared() {
        // s1 loses to s0, then s1 still beats the even shorter s2
        let mut g = group(vec![
            Span::new(COMMENT, "Service", "great service!! and", 0, 19, 0.9),
            Span::new(COMMENT, "Service", "great service!!", 0, 15, 0.9),
            Span::new(COMMENT, "Service", "great service", 0, 13, 0.9),
        ]);
        let conflicts = reconcile_same_label(&mut g, &OverlapDetector::default());

        assert_eq!(conflicts, 3);
        assert!(g.spans[0].relevant);
        assert!(!g.spans[1].relevant);
        assert!(!g.spans[2].relevant);
    }
}
