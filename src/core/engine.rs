//! Reconciliation engine: runs every pass in order over a batch of spans.
//!
//! validate -> filter -> trim -> group -> same-label -> cross-label -> assemble
//!
//! No pass can abort the batch. Data-quality problems are logged and
//! counted in the [`RunReport`], and every input span comes out exactly once.

use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::adapters::Relabeler;
use crate::domain::{flatten_groups, group_spans, KeyFallback, Span};

use super::cross_label::CrossLabelReconciler;
use super::overlap::OverlapDetector;
use super::relevance::RelevanceFilter;
use super::report::RunReport;
use super::same_label::reconcile_same_label;
use super::trimmer::trim_span;
use super::validator::validate_span;

/// Output of one engine run
#[derive(Debug)]
pub struct Reconciliation {
    pub spans: Vec<Span>,
    pub report: RunReport,
}

/// The span reconciliation engine
pub struct Engine {
    detector: OverlapDetector,
    filter: RelevanceFilter,
    relabeler: Option<Relabeler>,
    relabeler_unavailable: bool,
    key_field: Option<String>,
    fallback: KeyFallback,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(OverlapDetector::default())
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

impl Engine {
    pub fn new(detector: OverlapDetector) -> Self {
        Self {
            detector,
            filter: RelevanceFilter::default(),
            relabeler: None,
            relabeler_unavailable: false,
            key_field: None,
            fallback: KeyFallback::default(),
        }
    }

    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_relabeler(mut self, relabeler: Relabeler) -> Self {
        self.relabeler = Some(relabeler);
        self.relabeler_unavailable = false;
        self
    }

    /// A classifier was configured but could not be loaded
    pub fn with_unavailable_relabeler(mut self) -> Self {
        self.relabeler = None;
        self.relabeler_unavailable = true;
        self
    }

    /// Group by `key_field`, falling back for spans that lack it
    pub fn with_grouping(mut self, key_field: Option<String>, fallback: KeyFallback) -> Self {
        self.key_field = key_field;
        self.fallback = fallback;
        self
    }

    pub fn detector(&self) -> &OverlapDetector {
        &self.detector
    }

    /// Run every pass over a batch of spans
    #[instrument(skip_all, fields(spans = spans.len()))]
    pub fn run(&self, mut spans: Vec<Span>) -> Reconciliation {
        let mut report = RunReport::new(spans.len());
        info!(run_id = %report.run_id, "Starting reconciliation");

        // 1. Validate
        let started = Instant::now();
        for (row, span) in spans.iter_mut().enumerate() {
            match validate_span(span) {
                Ok(_) => span.valid = true,
                Err(e) => {
                    warn!(row, label = %span.label, error = %e, "Malformed span, passing through");
                    span.valid = false;
                    report.malformed_spans += 1;
                }
            }
        }
        report.timings.validate_ms = elapsed_ms(started);

        // 2. Relevance rules, valid spans only
        let started = Instant::now();
        for span in spans.iter_mut().filter(|s| s.valid) {
            if let Some(reason) = self.filter.apply(span) {
                report.irrelevant.record(reason);
            }
        }
        report.timings.filter_ms = elapsed_ms(started);

        // 3. Trim boundaries of valid spans
        let started = Instant::now();
        for span in spans.iter_mut().filter(|s| s.valid) {
            let Some((start, end)) = span.offsets() else {
                continue;
            };
            let trimmed = trim_span(&span.source_text, start as usize, end as usize);
            if trimmed.text != span.text || trimmed.start as i64 != start || trimmed.end as i64 != end {
                debug!(from = %span.text, to = %trimmed.text, "Trimmed span boundary");
                span.set_bounds(trimmed.start, trimmed.end, trimmed.text);
                report.trimmed_spans += 1;
            }
        }
        report.timings.trim_ms = elapsed_ms(started);

        // 4. Group by document
        let started = Instant::now();
        let mut groups = group_spans(spans, self.key_field.as_deref(), self.fallback);
        report.groups = groups.len();
        report.synthetic_groups = groups.iter().filter(|g| g.key.is_synthetic()).count();
        if self.key_field.is_some() && report.synthetic_groups > 0 {
            warn!(
                groups = report.synthetic_groups,
                "Spans missing the grouping key, using synthetic keys"
            );
        }
        report.timings.group_ms = elapsed_ms(started);

        // 5. Same-label overlaps
        let started = Instant::now();
        for group in groups.iter_mut() {
            report.same_label_conflicts += reconcile_same_label(group, &self.detector);
        }
        report.timings.same_label_ms = elapsed_ms(started);

        // 6. Cross-label overlaps
        let started = Instant::now();
        let mut cross = if self.relabeler_unavailable {
            CrossLabelReconciler::unavailable()
        } else {
            CrossLabelReconciler::new(self.relabeler.as_ref())
        };
        for group in groups.iter_mut() {
            cross.reconcile(group, &self.detector);
        }
        let stats = cross.stats();
        report.cross_label_conflicts = stats.conflicts;
        report.classifier_calls = stats.classifier_calls;
        report.relabeled = stats.relabeled;
        report.relabel_disabled = cross.relabel_disabled();
        report.timings.cross_label_ms = elapsed_ms(started);

        // 7. Assemble
        let started = Instant::now();
        let spans = flatten_groups(groups);
        report.output_spans = spans.len();
        if report.output_spans != report.input_spans {
            error!(
                input = report.input_spans,
                output = report.output_spans,
                "Span count changed during reconciliation"
            );
        }
        report.timings.assemble_ms = elapsed_ms(started);

        info!(
            validate_ms = report.timings.validate_ms,
            filter_ms = report.timings.filter_ms,
            trim_ms = report.timings.trim_ms,
            same_label_ms = report.timings.same_label_ms,
            cross_label_ms = report.timings.cross_label_ms,
            "Pass timings"
        );

        Reconciliation { spans, report }
    }
}
