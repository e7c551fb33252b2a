//! Timing rules: a step must occur within a window measured from call
//! start or from another step's timestamp.

use super::{Outcome, RuleContext};

pub(crate) fn evaluate(
    target_step_id: &str,
    within_seconds: f64,
    after_step_id: Option<&str>,
    ctx: &RuleContext,
) -> Outcome {
    let Some(target) = ctx.timestamp(target_step_id) else {
        return Outcome::fail(vec![], "missing mandatory action");
    };

    // Reference is call start (0) unless anchored to another step. An
    // undetected anchor gets the same treatment as a missing sequence
    // step.
    let reference = match after_step_id {
        None => 0.0,
        Some(id) => match ctx.timestamp(id) {
            Some(t) => t,
            None => return Outcome::fail(vec![], "missing mandatory action"),
        },
    };

    if target - reference <= within_seconds {
        Outcome::pass(vec![])
    } else {
        Outcome::fail(
            vec![],
            format!(
                "step '{}' exceeded its {}s window",
                target_step_id, within_seconds
            ),
        )
    }
}
