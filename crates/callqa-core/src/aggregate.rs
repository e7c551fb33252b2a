//! Deterministic aggregation: fold step and rule outcomes into the
//! engine-level verdict.
//!
//! The scoring policy is strict and non-configurable: a 70/30 weighted
//! blend of required-step completion and rule pass rate, with a failed
//! critical rule overriding everything. Critical failure is absolute,
//! not averaged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::detect::StepResult;
use crate::flow::Flow;
use crate::order::StageViolations;
use crate::rules::{RuleEvaluation, Severity};

/// Resolution policy for steps this engine cannot detect (required steps
/// with no expected phrases). By default they only lower the step score;
/// the external stage evaluator owns the override. Deployments that want
/// them to hard-fail the deterministic verdict set this flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePolicy {
    #[serde(default)]
    pub undetectable_required_fails: bool,
}

/// Per-stage detection and violation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageOutcome {
    /// Step results keyed by step id.
    pub step_results: BTreeMap<String, StepResult>,
    pub order_violations: Vec<String>,
    pub timing_violations: Vec<String>,
}

/// The deterministic engine's full output for one transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeterministicResult {
    /// Stage outcomes keyed by stage id.
    pub stages: BTreeMap<String, StageOutcome>,
    pub rule_evaluations: Vec<RuleEvaluation>,
    pub deterministic_score: u8,
    pub overall_passed: bool,
}

impl DeterministicResult {
    /// True when any critical rule failed. The rubric layer folds this in
    /// as its own absolute override.
    pub fn has_critical_failure(&self) -> bool {
        self.rule_evaluations
            .iter()
            .any(|r| r.severity == Severity::Critical && !r.passed)
    }
}

/// Combine detection, violation, and rule outcomes into the final
/// deterministic result.
pub fn aggregate(
    flow: &Flow,
    step_results: BTreeMap<String, StepResult>,
    mut violations: BTreeMap<String, StageViolations>,
    rule_evaluations: Vec<RuleEvaluation>,
    policy: &EnginePolicy,
) -> DeterministicResult {
    let mut total_required = 0usize;
    let mut completed_required = 0usize;
    let mut undetectable_required = false;

    for (_, step) in flow.steps() {
        if step.required {
            total_required += 1;
            if step_results.get(&step.id).is_some_and(|r| r.passed) {
                completed_required += 1;
            }
            if step.expected_phrases.is_empty() {
                undetectable_required = true;
            }
        }
    }

    // Degenerate inputs fall back to 100 rather than dividing by zero.
    let step_score = if total_required == 0 {
        100.0
    } else {
        100.0 * completed_required as f64 / total_required as f64
    };

    let passed_rules = rule_evaluations.iter().filter(|r| r.passed).count();
    let rule_score = if rule_evaluations.is_empty() {
        100.0
    } else {
        100.0 * passed_rules as f64 / rule_evaluations.len() as f64
    };

    let blended = (step_score * 0.7 + rule_score * 0.3).round() as u8;

    let critical_failed = rule_evaluations
        .iter()
        .any(|r| r.severity == Severity::Critical && !r.passed);

    let (deterministic_score, mut overall_passed) = if critical_failed {
        (0, false)
    } else {
        (blended, true)
    };

    if policy.undetectable_required_fails && undetectable_required {
        overall_passed = false;
    }

    let stages = flow
        .stages
        .iter()
        .map(|stage| {
            let StageViolations {
                order_violations,
                timing_violations,
            } = violations.remove(&stage.id).unwrap_or_default();

            let step_results = stage
                .steps
                .iter()
                .filter_map(|step| {
                    step_results
                        .get(&step.id)
                        .map(|r| (step.id.clone(), r.clone()))
                })
                .collect();

            (
                stage.id.clone(),
                StageOutcome {
                    step_results,
                    order_violations,
                    timing_violations,
                },
            )
        })
        .collect();

    DeterministicResult {
        stages,
        rule_evaluations,
        deterministic_score,
        overall_passed,
    }
}
