//! Conditional rules: if a trigger phrase appears anywhere in the call,
//! a set of agent actions becomes mandatory.
//!
//! Triggers match any speaker (a cancellation request usually comes from
//! the customer); required actions must appear in agent speech.

use crate::evidence::{self, Evidence};

use super::{Outcome, RuleContext};

pub(crate) fn evaluate(
    trigger_phrases: &[String],
    required_actions: &[String],
    ctx: &RuleContext,
) -> Outcome {
    let trigger = ctx
        .segments
        .iter()
        .find_map(|segment| trigger_phrases.iter().find_map(|p| segment.contains(p)));

    // Condition did not hold: the rule is trivially satisfied.
    let Some(trigger_evidence) = trigger else {
        return Outcome::pass(vec![]);
    };

    let mut found: Vec<Evidence> = vec![trigger_evidence];
    let mut missing: Vec<&str> = Vec::new();

    for action in required_actions {
        let hit = ctx
            .agent_segments()
            .find_map(|segment| segment.contains(action));
        match hit {
            Some(ev) => found.push(ev),
            None => missing.push(action),
        }
    }

    evidence::sort_by_timestamp(&mut found);

    if missing.is_empty() {
        Outcome::pass(found)
    } else {
        Outcome::fail(
            found,
            format!("missing required actions: {}", missing.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::transcript::{Segment, Transcript};

    fn ctx(segments: Vec<Segment>) -> RuleContext {
        RuleContext::new(&Transcript::new(segments), &BTreeMap::new())
    }

    fn triggers() -> Vec<String> {
        vec!["cancel my account".to_string()]
    }

    fn actions() -> Vec<String> {
        vec![
            "retention offer".to_string(),
            "effective date".to_string(),
        ]
    }

    #[test]
    fn test_no_trigger_trivially_passes() {
        let ctx = ctx(vec![Segment::customer("what's my balance?", 0.0, 2.0)]);
        let outcome = evaluate(&triggers(), &actions(), &ctx);
        assert!(outcome.passed);
        assert!(outcome.evidence.is_empty());
    }

    #[test]
    fn test_trigger_with_all_actions_passes() {
        let ctx = ctx(vec![
            Segment::customer("I want to cancel my account", 5.0, 8.0),
            Segment::agent("Before you go, I can offer a retention offer", 10.0, 14.0),
            Segment::agent("Your effective date would be the first", 20.0, 23.0),
        ]);
        let outcome = evaluate(&triggers(), &actions(), &ctx);
        assert!(outcome.passed);
        assert_eq!(outcome.evidence.len(), 3);
        assert_eq!(outcome.evidence[0].start_time, 5.0);
    }

    #[test]
    fn test_missing_actions_are_listed() {
        let ctx = ctx(vec![
            Segment::customer("please cancel my account", 5.0, 8.0),
            Segment::agent("Sure, done.", 10.0, 11.0),
        ]);
        let outcome = evaluate(&triggers(), &actions(), &ctx);
        assert!(!outcome.passed);
        assert_eq!(
            outcome.violation_reason.as_deref(),
            Some("missing required actions: retention offer, effective date")
        );
    }

    #[test]
    fn test_action_in_customer_speech_does_not_count() {
        let ctx = ctx(vec![
            Segment::customer("cancel my account, no retention offer needed", 5.0, 9.0),
            Segment::agent("Understood.", 10.0, 11.0),
        ]);
        let outcome = evaluate(&triggers(), &["retention offer".to_string()], &ctx);
        assert!(!outcome.passed);
    }
}
