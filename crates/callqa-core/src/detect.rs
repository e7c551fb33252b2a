//! Step detection: find each configured step's evidence in the transcript.
//!
//! Only agent utterances are examined. Matching is literal substring
//! containment after normalization on both sides. Every match becomes an
//! evidence record; the step timestamp is the earliest match.

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;
use crate::flow::Step;
use crate::normalize::normalize;
use crate::transcript::Transcript;

/// Reason string recorded when a required step was not detected.
pub const REASON_REQUIRED_STEP_MISSING: &str = "required_step_missing";

/// Outcome of detecting one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub passed: bool,
    pub detected: bool,

    /// Earliest matching evidence time, seconds from call start.
    pub timestamp: Option<f64>,

    /// All matches, ordered by timestamp (stable on ties).
    pub evidence: Vec<Evidence>,

    pub reason_if_failed: Option<String>,
}

/// Detect a single step against the full transcript.
///
/// A step with an empty `expected_phrases` set is undetectable here and
/// always yields `detected = false`; resolving it is deferred to the
/// external stage evaluator.
pub fn detect_step(step: &Step, transcript: &Transcript) -> StepResult {
    let mut evidence = Vec::new();
    let mut earliest: Option<f64> = None;

    if !step.expected_phrases.is_empty() {
        for segment in transcript.agent_segments() {
            let haystack = normalize(&segment.text);
            for phrase in &step.expected_phrases {
                let needle = normalize(phrase);
                if !needle.is_empty() && haystack.contains(&needle) {
                    evidence.push(Evidence::new(needle, segment.start_time, segment.end_time));
                    earliest = Some(match earliest {
                        Some(t) if t <= segment.start_time => t,
                        _ => segment.start_time,
                    });
                }
            }
        }
    }

    crate::evidence::sort_by_timestamp(&mut evidence);

    let detected = !evidence.is_empty();
    let reason_if_failed = if step.required && !detected {
        Some(REASON_REQUIRED_STEP_MISSING.to_string())
    } else {
        None
    };

    StepResult {
        passed: detected,
        detected,
        timestamp: earliest,
        evidence,
        reason_if_failed,
    }
}
