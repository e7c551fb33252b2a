//! Sequence rules: one step's evidence must precede another's.

use super::{Outcome, RuleContext};

pub(crate) fn evaluate(before_step_id: &str, after_step_id: &str, ctx: &RuleContext) -> Outcome {
    let before = ctx.timestamp(before_step_id);
    let after = ctx.timestamp(after_step_id);

    match (before, after) {
        (Some(b), Some(a)) if b <= a => Outcome::pass(vec![]),
        (Some(_), Some(_)) => Outcome::fail(
            vec![],
            format!(
                "step '{}' occurred after step '{}'",
                before_step_id, after_step_id
            ),
        ),
        _ => Outcome::fail(vec![], "missing mandatory action"),
    }
}
