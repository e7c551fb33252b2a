//! Required- and forbidden-phrase rules.
//!
//! Both search the whole transcript, any speaker, normalized substring
//! containment.

use crate::evidence;

use super::{Outcome, RuleContext};

/// Pass iff any configured phrase is found anywhere in the transcript.
/// All matches are kept as evidence.
pub(crate) fn required(phrases: &[String], ctx: &RuleContext) -> Outcome {
    let mut matches = Vec::new();
    for segment in &ctx.segments {
        for phrase in phrases {
            if let Some(ev) = segment.contains(phrase) {
                matches.push(ev);
            }
        }
    }
    evidence::sort_by_timestamp(&mut matches);

    if matches.is_empty() {
        Outcome::fail(vec![], "no required phrase found in transcript")
    } else {
        Outcome::pass(matches)
    }
}

/// Fail iff any configured phrase is found anywhere, regardless of
/// speaker. The first match (call order) is cited as evidence.
pub(crate) fn forbidden(phrases: &[String], ctx: &RuleContext) -> Outcome {
    for segment in &ctx.segments {
        for phrase in phrases {
            if let Some(ev) = segment.contains(phrase) {
                let reason = format!("forbidden phrase \"{}\" found", ev.text);
                return Outcome::fail(vec![ev], reason);
            }
        }
    }
    Outcome::pass(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Segment, Transcript};
    use std::collections::BTreeMap;

    fn ctx(segments: Vec<Segment>) -> RuleContext {
        RuleContext::new(&Transcript::new(segments), &BTreeMap::new())
    }

    #[test]
    fn test_required_found_in_customer_speech() {
        let ctx = ctx(vec![Segment::customer("I'd like to cancel my plan", 4.0, 6.0)]);
        let outcome = required(&["cancel my plan".to_string()], &ctx);
        assert!(outcome.passed);
        assert_eq!(outcome.evidence.len(), 1);
        assert_eq!(outcome.evidence[0].start_time, 4.0);
    }

    #[test]
    fn test_required_missing_fails_with_no_evidence() {
        let ctx = ctx(vec![Segment::agent("good morning", 0.0, 1.0)]);
        let outcome = required(&["recorded line".to_string()], &ctx);
        assert!(!outcome.passed);
        assert!(outcome.evidence.is_empty());
        assert!(outcome.violation_reason.is_some());
    }

    #[test]
    fn test_forbidden_fails_on_any_speaker() {
        let ctx = ctx(vec![
            Segment::agent("let me check", 0.0, 1.0),
            Segment::customer("this is guaranteed to win, right?", 2.0, 4.0),
        ]);
        let outcome = forbidden(&["guaranteed to win".to_string()], &ctx);
        assert!(!outcome.passed);
        assert_eq!(outcome.evidence.len(), 1);
        assert_eq!(outcome.evidence[0].start_time, 2.0);
    }

    #[test]
    fn test_forbidden_cites_first_match_only() {
        let ctx = ctx(vec![
            Segment::agent("we never fail", 1.0, 2.0),
            Segment::agent("we never fail, honestly", 9.0, 11.0),
        ]);
        let outcome = forbidden(&["never fail".to_string()], &ctx);
        assert_eq!(outcome.evidence.len(), 1);
        assert_eq!(outcome.evidence[0].start_time, 1.0);
    }

    #[test]
    fn test_forbidden_absent_passes() {
        let ctx = ctx(vec![Segment::agent("standard disclaimer applies", 0.0, 2.0)]);
        let outcome = forbidden(&["never fail".to_string()], &ctx);
        assert!(outcome.passed);
        assert!(outcome.violation_reason.is_none());
    }
}
