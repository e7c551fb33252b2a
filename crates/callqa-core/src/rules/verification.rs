//! Verification rules: enough identity-verification questions must be
//! asked, and asked before resolution.
//!
//! Counting is per agent utterance — a segment matching any verification
//! phrase counts once. The deadline check uses the timestamp at which the
//! required count was reached (the n-th matching segment). A bound step
//! that is unset, or was never detected, makes that sub-condition
//! inapplicable rather than an error.

use crate::evidence::Evidence;

use super::{Outcome, RuleContext};

pub(crate) fn evaluate(
    verification_phrases: &[String],
    required_count: usize,
    resolution_step_id: Option<&str>,
    must_complete_before_step_id: Option<&str>,
    ctx: &RuleContext,
) -> Outcome {
    // One counted match per matching agent segment, in call order.
    let mut matches: Vec<Evidence> = Vec::new();
    for segment in ctx.agent_segments() {
        if let Some(ev) = verification_phrases
            .iter()
            .find_map(|p| segment.contains(p))
        {
            matches.push(ev);
        }
    }

    if matches.len() < required_count {
        return Outcome::fail(
            matches.clone(),
            format!(
                "verification count {} below required {}",
                matches.len(),
                required_count
            ),
        );
    }

    // Sub-conditions are checked in a fixed order; the first violated one
    // is reported.
    let completed_at = matches[required_count - 1].start_time;
    for bound in [resolution_step_id, must_complete_before_step_id]
        .into_iter()
        .flatten()
    {
        if let Some(deadline) = ctx.timestamp(bound) {
            if completed_at > deadline {
                return Outcome::fail(
                    matches,
                    format!("verification completed after step '{}'", bound),
                );
            }
        }
    }

    Outcome::pass(matches)
}
