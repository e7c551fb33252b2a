//! Timestamped textual evidence backing detections and rule outcomes.
//!
//! Every detection and every failed rule cites evidence pointing at a
//! span of the call timeline, so evaluations stay auditable.

use serde::{Deserialize, Serialize};

/// A piece of evidence: the matched text and where on the call it occurred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// The matched snippet, in normalized form.
    pub text: String,

    /// Seconds from call start where the utterance began.
    pub start_time: f64,

    /// Seconds from call start where the utterance ended.
    pub end_time: f64,
}

impl Evidence {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }
}

/// Sort evidence by start time. The sort is stable, so records sharing a
/// timestamp keep their declaration order — required for bit-identical
/// output across runs.
pub fn sort_by_timestamp(evidence: &mut [Evidence]) {
    evidence.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
