//! Final evaluation assembly: merge rubric aggregation, external stage
//! evaluations, and the deterministic verdict into the persisted result.
//!
//! Pass/fail resolution order is strict and non-configurable:
//! 1. deterministic critical violation, 2. stage-level critical
//! violation, 3. any failed category. Scores are reported as computed;
//! only the verdict is overridden.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::DeterministicResult;
use crate::rubric::{
    clamp_score, overall_score, score_categories, CategoryScore, RubricTemplate, StageEvaluation,
};
use crate::ConfigError;

/// Confidence below which a stage taints the evaluation for human review.
pub const REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.50;

/// A stage's score as reported in the final evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageScore {
    pub score: f64,
    pub critical_violation: bool,
    pub confidence: f64,
}

/// The merged, persistable evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalEvaluation {
    pub overall_score: u8,
    pub overall_passed: bool,
    pub category_scores: Vec<CategoryScore>,

    /// Stage scores keyed by stage id.
    pub stage_scores: BTreeMap<String, StageScore>,

    pub requires_human_review: bool,

    /// Why human review is required. Empty when it is not.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_reasons: Vec<String>,
}

/// Assemble the final evaluation.
///
/// A malformed rubric is rejected before any scoring. A missing rubric is
/// not an error: the deterministic result stands in and the evaluation is
/// flagged for review.
pub fn assemble(
    rubric: Option<&RubricTemplate>,
    stage_evaluations: &BTreeMap<String, StageEvaluation>,
    deterministic: &DeterministicResult,
) -> Result<FinalEvaluation, ConfigError> {
    if let Some(template) = rubric {
        template.validate()?;
    }

    let stage_scores: BTreeMap<String, StageScore> = stage_evaluations
        .iter()
        .map(|(stage_id, eval)| {
            (
                stage_id.clone(),
                StageScore {
                    score: clamp_score(eval.stage_score),
                    critical_violation: eval.critical_violation,
                    confidence: eval.stage_confidence,
                },
            )
        })
        .collect();

    // Low confidence flags review but never moves a score or a verdict.
    let mut review_reasons: Vec<String> = stage_scores
        .iter()
        .filter(|(_, s)| s.confidence < REVIEW_CONFIDENCE_THRESHOLD)
        .map(|(stage_id, s)| {
            format!(
                "Stage '{}' confidence {:.2} below review threshold",
                stage_id, s.confidence
            )
        })
        .collect();

    let stage_critical = stage_scores.values().any(|s| s.critical_violation);

    let evaluation = match rubric {
        None => {
            tracing::warn!("no rubric template supplied, falling back to deterministic score");
            review_reasons.insert(0, "Missing rubric.".to_string());
            FinalEvaluation {
                overall_score: deterministic.deterministic_score,
                overall_passed: deterministic.overall_passed && !stage_critical,
                category_scores: vec![],
                stage_scores,
                requires_human_review: true,
                review_reasons,
            }
        }
        Some(template) => {
            let category_scores = score_categories(template, stage_evaluations);
            let overall_score = overall_score(&category_scores);

            // First match wins; the score itself is never rewritten.
            let overall_passed = if deterministic.has_critical_failure() || stage_critical {
                false
            } else {
                category_scores.iter().all(|c| c.passed)
            };

            FinalEvaluation {
                overall_score,
                overall_passed,
                category_scores,
                stage_scores,
                requires_human_review: !review_reasons.is_empty(),
                review_reasons,
            }
        }
    };

    Ok(evaluation)
}
