//! Per-run summary of what the engine did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::relevance::IrrelevanceReason;

/// Spans demoted by each relevance rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceCounts {
    pub pictographic: usize,
    pub excluded_phrase: usize,
    pub below_threshold: usize,
}

impl RelevanceCounts {
    pub fn record(&mut self, reason: IrrelevanceReason) {
        match reason {
            IrrelevanceReason::Pictographic => self.pictographic += 1,
            IrrelevanceReason::ExcludedPhrase => self.excluded_phrase += 1,
            IrrelevanceReason::BelowThreshold => self.below_threshold += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pictographic + self.excluded_phrase + self.below_threshold
    }
}

/// Wall-clock time spent in each pass, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassTimings {
    pub validate_ms: f64,
    pub filter_ms: f64,
    pub trim_ms: f64,
    pub group_ms: f64,
    pub same_label_ms: f64,
    pub cross_label_ms: f64,
    pub assemble_ms: f64,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub input_spans: usize,
    pub output_spans: usize,
    pub malformed_spans: usize,
    pub trimmed_spans: usize,
    pub irrelevant: RelevanceCounts,
    pub groups: usize,
    pub synthetic_groups: usize,
    pub same_label_conflicts: usize,
    pub cross_label_conflicts: usize,
    pub classifier_calls: usize,
    pub relabeled: usize,
    pub relabel_disabled: bool,
    pub timings: PassTimings,
}

impl RunReport {
    pub fn new(input_spans: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            input_spans,
            output_spans: 0,
            malformed_spans: 0,
            trimmed_spans: 0,
            irrelevant: RelevanceCounts::default(),
            groups: 0,
            synthetic_groups: 0,
            same_label_conflicts: 0,
            cross_label_conflicts: 0,
            classifier_calls: 0,
            relabeled: 0,
            relabel_disabled: false,
            timings: PassTimings::default(),
        }
    }

    /// Emit the summary through tracing
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            spans = self.output_spans,
            groups = self.groups,
            malformed = self.malformed_spans,
            trimmed = self.trimmed_spans,
            filtered = self.irrelevant.total(),
            same_label = self.same_label_conflicts,
            cross_label = self.cross_label_conflicts,
            relabeled = self.relabeled,
            relabel_disabled = self.relabel_disabled,
            "Reconciliation complete"
        );
    }
}
