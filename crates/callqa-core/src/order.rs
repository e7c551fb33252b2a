//! Order and timing validation across detected steps.
//!
//! Runs after detection, over timestamps only. Checks never short-circuit
//! one another: every step/stage pair is visited exactly once regardless
//! of earlier failures, so a broken opening still gets its closing
//! validated.

use std::collections::BTreeMap;

use crate::detect::StepResult;
use crate::flow::Flow;

/// Order and timing violations accumulated for one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageViolations {
    pub order_violations: Vec<String>,
    pub timing_violations: Vec<String>,
}

struct Detected<'a> {
    stage_id: &'a str,
    stage_order: u32,
    step_order: u32,
    step_name: &'a str,
    timestamp: f64,
}

/// Validate stage order, step order within stages, and timing
/// requirements against detected timestamps.
///
/// `step_results` is keyed by step id. Order violations are attached to
/// the later-ordered stage; one violation per inverted pair, never
/// deduplicated.
pub fn validate(
    flow: &Flow,
    step_results: &BTreeMap<String, StepResult>,
) -> BTreeMap<String, StageViolations> {
    let mut violations: BTreeMap<String, StageViolations> = flow
        .stages
        .iter()
        .map(|stage| (stage.id.clone(), StageViolations::default()))
        .collect();

    // Detected steps in declaration order; declaration order is the
    // stable tie-break everywhere below.
    let detected: Vec<Detected<'_>> = flow
        .steps()
        .filter_map(|(stage, step)| {
            let timestamp = step_results.get(&step.id)?.timestamp?;
            Some(Detected {
                stage_id: &stage.id,
                stage_order: stage.order,
                step_order: step.order,
                step_name: &step.name,
                timestamp,
            })
        })
        .collect();

    // Stage order: evidence from a later-ordered stage must not precede
    // evidence from an earlier-ordered one.
    for later in &detected {
        for earlier in &detected {
            if earlier.stage_order < later.stage_order && later.timestamp < earlier.timestamp {
                violations
                    .get_mut(later.stage_id)
                    .expect("stage present")
                    .order_violations
                    .push(format!(
                        "{} occurred before {}",
                        later.step_name, earlier.step_name
                    ));
            }
        }
    }

    // Step order within a stage, same inversion logic by step order.
    for later in &detected {
        for earlier in &detected {
            if earlier.stage_id == later.stage_id
                && earlier.step_order < later.step_order
                && later.timestamp < earlier.timestamp
            {
                violations
                    .get_mut(later.stage_id)
                    .expect("stage present")
                    .order_violations
                    .push(format!(
                        "{} occurred before {}",
                        later.step_name, earlier.step_name
                    ));
            }
        }
    }

    // Timing: a step with a deadline must be detected and within it.
    for (stage, step) in flow.steps() {
        if let Some(req) = &step.timing_requirement {
            let timestamp = step_results.get(&step.id).and_then(|r| r.timestamp);
            let violated = match timestamp {
                None => true,
                Some(t) => t > req.seconds,
            };
            if violated {
                violations
                    .get_mut(&stage.id)
                    .expect("stage present")
                    .timing_violations
                    .push(format!("{} must occur within {}s", step.name, req.seconds));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_step;
    use crate::transcript::{Segment, Transcript};

    fn two_stage_flow() -> Flow {
        Flow::from_yaml(
            r#"
id: "f"
name: "F"
stages:
  - id: "opening"
    name: "Opening"
    order: 1
    steps:
      - id: "greeting"
        name: "Greeting"
        required: true
        expected_phrases: ["thank you for calling"]
        timing_requirement:
          seconds: 30
        order: 1
      - id: "identify"
        name: "Identify Customer"
        required: true
        expected_phrases: ["account number"]
        order: 2
  - id: "resolution"
    name: "Resolution"
    order: 2
    steps:
      - id: "confirm-fix"
        name: "Confirm Fix"
        required: true
        expected_phrases: ["anything else"]
        order: 1
"#,
        )
        .unwrap()
    }

    fn detect_all(flow: &Flow, transcript: &Transcript) -> BTreeMap<String, StepResult> {
        flow.steps()
            .map(|(_, step)| (step.id.clone(), detect_step(step, transcript)))
            .collect()
    }

    #[test]
    fn test_in_order_call_has_no_violations() {
        let flow = two_stage_flow();
        let transcript = Transcript::new(vec![
            Segment::agent("thank you for calling", 2.0, 4.0),
            Segment::agent("may I have your account number", 10.0, 13.0),
            Segment::agent("is there anything else", 100.0, 102.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert!(violations.values().all(|v| v.order_violations.is_empty()));
        assert!(violations.values().all(|v| v.timing_violations.is_empty()));
    }

    #[test]
    fn test_stage_inversion_attached_to_later_stage() {
        let flow = two_stage_flow();
        // Resolution evidence before both opening steps.
        let transcript = Transcript::new(vec![
            Segment::agent("is there anything else", 1.0, 2.0),
            Segment::agent("thank you for calling", 5.0, 7.0),
            Segment::agent("may I have your account number", 10.0, 13.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        let resolution = &violations["resolution"];
        // One violation per inverted pair: against Greeting and Identify.
        assert_eq!(resolution.order_violations.len(), 2);
        assert_eq!(
            resolution.order_violations[0],
            "Confirm Fix occurred before Greeting"
        );
        assert_eq!(
            resolution.order_violations[1],
            "Confirm Fix occurred before Identify Customer"
        );
        assert!(violations["opening"].order_violations.is_empty());
    }

    #[test]
    fn test_step_inversion_within_stage() {
        let flow = two_stage_flow();
        let transcript = Transcript::new(vec![
            Segment::agent("may I have your account number", 1.0, 3.0),
            Segment::agent("thank you for calling", 8.0, 10.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert_eq!(
            violations["opening"].order_violations,
            vec!["Identify Customer occurred before Greeting".to_string()]
        );
    }

    #[test]
    fn test_timing_violation_when_late() {
        let flow = two_stage_flow();
        let transcript = Transcript::new(vec![
            Segment::agent("thank you for calling", 45.0, 47.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert_eq!(
            violations["opening"].timing_violations,
            vec!["Greeting must occur within 30s".to_string()]
        );
    }

    #[test]
    fn test_timing_violation_when_undetected() {
        let flow = two_stage_flow();
        let transcript = Transcript::new(vec![Segment::agent("hello", 0.0, 1.0)]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert_eq!(violations["opening"].timing_violations.len(), 1);
    }

    #[test]
    fn test_timing_boundary_is_inclusive() {
        let flow = two_stage_flow();
        let transcript = Transcript::new(vec![
            Segment::agent("thank you for calling", 30.0, 32.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert!(violations["opening"].timing_violations.is_empty());
    }

    #[test]
    fn test_checks_are_failure_independent() {
        let flow = two_stage_flow();
        // Everything out of order AND the deadline missed: all checks
        // still report, none short-circuits another.
        let transcript = Transcript::new(vec![
            Segment::agent("is there anything else", 1.0, 2.0),
            Segment::agent("may I have your account number", 5.0, 7.0),
            Segment::agent("thank you for calling", 50.0, 52.0),
        ]);

        let violations = validate(&flow, &detect_all(&flow, &transcript));
        assert!(!violations["resolution"].order_violations.is_empty());
        assert!(!violations["opening"].order_violations.is_empty());
        assert!(!violations["opening"].timing_violations.is_empty());
    }
}
