//! Compliance rules: standalone checks evaluated against the transcript
//! and detected step timestamps.
//!
//! The six rule types are a closed tagged union — each variant carries
//! exactly the parameters its evaluator needs, so invalid combinations
//! cannot reach evaluation. Rules are evaluated independently; no rule's
//! outcome affects another's, only the later aggregation.

mod conditional;
mod phrase;
mod sequence;
mod timing;
mod verification;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::detect::StepResult;
use crate::evidence::Evidence;
use crate::normalize::normalize;
use crate::transcript::{Speaker, Transcript};
use crate::ConfigError;

/// How bad a rule violation is. A failed `critical` rule forces the
/// deterministic verdict to an absolute fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

/// Type-specific rule parameters, dispatched by the `rule_type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleKind {
    /// At least one of the phrases must appear somewhere in the transcript.
    RequiredPhrase { phrases: Vec<String> },

    /// None of the phrases may appear anywhere, regardless of speaker.
    ForbiddenPhrase { phrases: Vec<String> },

    /// One step's evidence must precede another's.
    SequenceRule {
        before_step_id: String,
        after_step_id: String,
    },

    /// A step must occur within a window measured from call start or from
    /// another step's timestamp.
    TimingRule {
        target_step_id: String,
        within_seconds: f64,
        #[serde(default)]
        after_step_id: Option<String>,
    },

    /// Enough verification questions must be asked, before resolution.
    VerificationRule {
        verification_phrases: Vec<String>,
        required_count: usize,
        #[serde(default)]
        resolution_step_id: Option<String>,
        #[serde(default)]
        must_complete_before_step_id: Option<String>,
    },

    /// If any trigger phrase appears, all required actions must too.
    ConditionalRule {
        trigger_phrases: Vec<String>,
        required_actions: Vec<String>,
    },
}

impl RuleKind {
    /// The wire tag for this rule type.
    pub fn rule_type(&self) -> &'static str {
        match self {
            RuleKind::RequiredPhrase { .. } => "required_phrase",
            RuleKind::ForbiddenPhrase { .. } => "forbidden_phrase",
            RuleKind::SequenceRule { .. } => "sequence_rule",
            RuleKind::TimingRule { .. } => "timing_rule",
            RuleKind::VerificationRule { .. } => "verification_rule",
            RuleKind::ConditionalRule { .. } => "conditional_rule",
        }
    }
}

/// A single compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceRule {
    pub id: String,
    pub title: String,
    pub severity: Severity,

    #[serde(flatten)]
    pub kind: RuleKind,
}

/// A set of compliance rules, loadable from YAML/JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RuleSet {
    pub rules: Vec<ComplianceRule>,
}

impl RuleSet {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let set: RuleSet = serde_yaml::from_str(yaml)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let set: RuleSet = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Defensive checks: unique rule ids, non-degenerate parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(&rule.id) {
                return Err(ConfigError::DuplicateId(rule.id.clone()));
            }
            match &rule.kind {
                RuleKind::RequiredPhrase { phrases }
                | RuleKind::ForbiddenPhrase { phrases } => {
                    if phrases.is_empty() {
                        return Err(ConfigError::EmptyPhraseList {
                            rule_id: rule.id.clone(),
                        });
                    }
                }
                RuleKind::VerificationRule { required_count, .. } => {
                    if *required_count == 0 {
                        return Err(ConfigError::InvalidRequiredCount {
                            rule_id: rule.id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// One rule's outcome, with evidence and a human-readable reason on fail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleEvaluation {
    pub rule_id: String,
    pub title: String,
    pub rule_type: String,
    pub severity: Severity,
    pub passed: bool,
    pub evidence: Vec<Evidence>,
    pub violation_reason: Option<String>,
}

/// A transcript segment pre-normalized for rule matching.
pub(crate) struct NormSegment {
    pub speaker: Speaker,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl NormSegment {
    pub fn contains(&self, phrase: &str) -> Option<Evidence> {
        let needle = normalize(phrase);
        if !needle.is_empty() && self.text.contains(&needle) {
            Some(Evidence::new(needle, self.start_time, self.end_time))
        } else {
            None
        }
    }
}

/// Read-only inputs shared by all rule evaluators: normalized segments
/// in call order plus detected step timestamps.
pub struct RuleContext {
    pub(crate) segments: Vec<NormSegment>,
    pub(crate) timestamps: BTreeMap<String, f64>,
}

impl RuleContext {
    pub fn new(transcript: &Transcript, step_results: &BTreeMap<String, StepResult>) -> Self {
        let segments = transcript
            .segments
            .iter()
            .map(|s| NormSegment {
                speaker: s.speaker,
                text: normalize(&s.text),
                start_time: s.start_time,
                end_time: s.end_time,
            })
            .collect();

        let timestamps = step_results
            .iter()
            .filter_map(|(id, r)| r.timestamp.map(|t| (id.clone(), t)))
            .collect();

        Self {
            segments,
            timestamps,
        }
    }

    pub(crate) fn agent_segments(&self) -> impl Iterator<Item = &NormSegment> {
        self.segments.iter().filter(|s| s.speaker == Speaker::Agent)
    }

    pub(crate) fn timestamp(&self, step_id: &str) -> Option<f64> {
        self.timestamps.get(step_id).copied()
    }
}

/// The verdict one evaluator produces before it is stamped with the
/// rule's identity.
pub(crate) struct Outcome {
    pub passed: bool,
    pub evidence: Vec<Evidence>,
    pub violation_reason: Option<String>,
}

impl Outcome {
    pub fn pass(evidence: Vec<Evidence>) -> Self {
        Self {
            passed: true,
            evidence,
            violation_reason: None,
        }
    }

    pub fn fail(evidence: Vec<Evidence>, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            evidence,
            violation_reason: Some(reason.into()),
        }
    }
}

/// Evaluate a single rule against the context.
pub fn evaluate_rule(rule: &ComplianceRule, ctx: &RuleContext) -> RuleEvaluation {
    let outcome = match &rule.kind {
        RuleKind::RequiredPhrase { phrases } => phrase::required(phrases, ctx),
        RuleKind::ForbiddenPhrase { phrases } => phrase::forbidden(phrases, ctx),
        RuleKind::SequenceRule {
            before_step_id,
            after_step_id,
        } => sequence::evaluate(before_step_id, after_step_id, ctx),
        RuleKind::TimingRule {
            target_step_id,
            within_seconds,
            after_step_id,
        } => timing::evaluate(target_step_id, *within_seconds, after_step_id.as_deref(), ctx),
        RuleKind::VerificationRule {
            verification_phrases,
            required_count,
            resolution_step_id,
            must_complete_before_step_id,
        } => verification::evaluate(
            verification_phrases,
            *required_count,
            resolution_step_id.as_deref(),
            must_complete_before_step_id.as_deref(),
            ctx,
        ),
        RuleKind::ConditionalRule {
            trigger_phrases,
            required_actions,
        } => conditional::evaluate(trigger_phrases, required_actions, ctx),
    };

    RuleEvaluation {
        rule_id: rule.id.clone(),
        title: rule.title.clone(),
        rule_type: rule.kind.rule_type().to_string(),
        severity: rule.severity,
        passed: outcome.passed,
        evidence: outcome.evidence,
        violation_reason: outcome.violation_reason,
    }
}

/// Evaluate all rules in declaration order, independently.
pub fn evaluate_all(rules: &[ComplianceRule], ctx: &RuleContext) -> Vec<RuleEvaluation> {
    rules.iter().map(|rule| evaluate_rule(rule, ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_deserializes_by_tag() {
        let yaml = r#"
rules:
  - id: "R1"
    title: "Greeting required"
    severity: major
    rule_type: required_phrase
    phrases: ["thank you for calling"]
  - id: "R2"
    title: "Identity before account changes"
    severity: critical
    rule_type: sequence_rule
    before_step_id: "verify-identity"
    after_step_id: "account-change"
"#;
        let set = RuleSet::from_yaml(yaml).unwrap();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[0].kind.rule_type(), "required_phrase");
        assert!(matches!(set.rules[1].kind, RuleKind::SequenceRule { .. }));
        assert_eq!(set.rules[1].severity, Severity::Critical);
    }

    #[test]
    fn test_duplicate_rule_id_rejected() {
        let yaml = r#"
rules:
  - id: "R1"
    title: "A"
    severity: minor
    rule_type: required_phrase
    phrases: ["a"]
  - id: "R1"
    title: "B"
    severity: minor
    rule_type: required_phrase
    phrases: ["b"]
"#;
        assert!(matches!(
            RuleSet::from_yaml(yaml),
            Err(ConfigError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_empty_phrase_list_rejected() {
        let yaml = r#"
rules:
  - id: "R1"
    title: "A"
    severity: minor
    rule_type: forbidden_phrase
    phrases: []
"#;
        assert!(matches!(
            RuleSet::from_yaml(yaml),
            Err(ConfigError::EmptyPhraseList { .. })
        ));
    }

    #[test]
    fn test_zero_required_count_rejected() {
        let yaml = r#"
rules:
  - id: "V1"
    title: "Verify"
    severity: critical
    rule_type: verification_rule
    verification_phrases: ["can you confirm"]
    required_count: 0
"#;
        assert!(matches!(
            RuleSet::from_yaml(yaml),
            Err(ConfigError::InvalidRequiredCount { .. })
        ));
    }

    #[test]
    fn test_severity_roundtrip() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Severity::Critical);
    }
}
