//! # callqa-core
//!
//! Deterministic call-center transcript QA engine.
//!
//! This crate evaluates call transcripts against a configured flow
//! (ordered stages and steps) and a set of compliance rules, then rolls
//! externally supplied per-stage scores into a weighted, threshold-gated
//! final verdict.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same inputs always produce bit-identical output
//! 2. **No LLM calls**: all evaluation is literal, rule-based matching
//! 3. **Traceable**: every detection and violation cites timestamped
//!    evidence
//! 4. **Pure**: no I/O inside the evaluation path; each run is a pure
//!    function of its inputs
//!
//! ## Example
//!
//! ```rust,ignore
//! use callqa_core::{evaluate_deterministic, evaluate_final, EnginePolicy, Flow, RuleSet, Transcript};
//!
//! let flow = Flow::from_yaml_file("flow.yaml")?;
//! let rules = RuleSet::from_yaml_file("rules.yaml")?;
//! let transcript = Transcript::from_json(&json)?;
//!
//! let deterministic = evaluate_deterministic(&flow, &rules.rules, &transcript, &EnginePolicy::default());
//! let final_eval = evaluate_final(Some(&rubric), &stage_evaluations, &deterministic)?;
//! ```

pub mod aggregate;
pub mod assemble;
pub mod detect;
pub mod evidence;
pub mod flow;
pub mod normalize;
pub mod order;
pub mod rubric;
pub mod rules;
pub mod transcript;

// Re-export main types at crate root
pub use aggregate::{DeterministicResult, EnginePolicy, StageOutcome};
pub use assemble::{FinalEvaluation, StageScore, REVIEW_CONFIDENCE_THRESHOLD};
pub use detect::{StepResult, REASON_REQUIRED_STEP_MISSING};
pub use evidence::Evidence;
pub use flow::{Flow, Stage, Step, TimingRequirement};
pub use rubric::{CategoryScore, RubricCategory, RubricTemplate, StageEvaluation};
pub use rules::{ComplianceRule, RuleEvaluation, RuleKind, RuleSet, Severity};
pub use transcript::{Segment, Speaker, Transcript};

use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors. These halt an evaluation before scoring starts;
/// anything the engine can resolve with a defined fallback is not an
/// error here.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Duplicate stage order {order} (stage {stage_id})")]
    DuplicateStageOrder { stage_id: String, order: u32 },

    #[error("Duplicate step order {order} (stage {stage_id}, step {step_id})")]
    DuplicateStepOrder {
        stage_id: String,
        step_id: String,
        order: u32,
    },

    #[error("Rule {rule_id} has an empty phrase list")]
    EmptyPhraseList { rule_id: String },

    #[error("Rule {rule_id} requires a verification count of at least 1")]
    InvalidRequiredCount { rule_id: String },

    #[error("Category {category_id} maps to no stages")]
    EmptyCategory { category_id: String },

    #[error("Rubric weights must sum to 100, got {sum}")]
    WeightSum { sum: u32 },
}

/// Run the deterministic engine: detect every step, validate order and
/// timing, evaluate every compliance rule, and aggregate.
///
/// Pure and total — same inputs always yield a structurally identical
/// result, including evidence and violation ordering.
pub fn evaluate_deterministic(
    flow: &Flow,
    rules: &[ComplianceRule],
    transcript: &Transcript,
    policy: &EnginePolicy,
) -> DeterministicResult {
    let step_results: BTreeMap<String, StepResult> = flow
        .steps()
        .map(|(_, step)| (step.id.clone(), detect::detect_step(step, transcript)))
        .collect();

    let violations = order::validate(flow, &step_results);

    let ctx = rules::RuleContext::new(transcript, &step_results);
    let rule_evaluations = rules::evaluate_all(rules, &ctx);

    aggregate::aggregate(flow, step_results, violations, rule_evaluations, policy)
}

/// Roll externally supplied per-stage scores into the final evaluation,
/// folding in the deterministic verdict.
///
/// `rubric = None` triggers the missing-rubric fallback; a malformed
/// rubric is rejected before scoring.
pub fn evaluate_final(
    rubric: Option<&RubricTemplate>,
    stage_evaluations: &BTreeMap<String, StageEvaluation>,
    deterministic: &DeterministicResult,
) -> Result<FinalEvaluation, ConfigError> {
    assemble::assemble(rubric, stage_evaluations, deterministic)
}
