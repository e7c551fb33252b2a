//! Rubric configuration and category aggregation.
//!
//! A rubric groups stages into weighted categories and rolls externally
//! supplied per-stage scores into category and overall scores. Weight
//! sums and category shapes are enforced upstream by the authoring
//! collaborator; this module re-checks only what it needs to score
//! safely, and rejects rather than coerces.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::ConfigError;

/// A weighted grouping of stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricCategory {
    pub id: String,
    pub name: String,

    /// Share of the overall score, 0-100. All weights in a template sum
    /// to exactly 100.
    pub weight: u32,

    /// Minimum category score to pass, 0-100.
    pub pass_threshold: u32,

    pub stage_ids: Vec<String>,
}

/// A rubric template: the full set of categories for one flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricTemplate {
    pub name: String,
    pub categories: Vec<RubricCategory>,
}

impl RubricTemplate {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let template: RubricTemplate = serde_yaml::from_str(yaml)?;
        template.validate()?;
        Ok(template)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let template: RubricTemplate = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Reject malformed rubrics before any scoring: weights must sum to
    /// exactly 100, no category may map to zero stages, ids are unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(&category.id) {
                return Err(ConfigError::DuplicateId(category.id.clone()));
            }
            if category.stage_ids.is_empty() {
                return Err(ConfigError::EmptyCategory {
                    category_id: category.id.clone(),
                });
            }
        }

        let sum: u32 = self.categories.iter().map(|c| c.weight).sum();
        if sum != 100 {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(())
    }
}

/// One stage's qualitative evaluation, produced by the external LLM
/// evaluator and consumed here as plain data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageEvaluation {
    pub stage_score: f64,
    pub stage_confidence: f64,
    pub critical_violation: bool,
}

/// A scored category in the final evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub category_id: String,
    pub name: String,
    pub weight: u32,
    pub score: u8,
    pub passed: bool,
}

/// Clamp a score into `[0, 100]`. Applied after all arithmetic.
pub(crate) fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Score every category: mean of its stages' scores, a stage absent from
/// the evaluation map contributing `0` as a deliberate incompleteness
/// penalty.
pub fn score_categories(
    template: &RubricTemplate,
    stage_evaluations: &BTreeMap<String, StageEvaluation>,
) -> Vec<CategoryScore> {
    template
        .categories
        .iter()
        .map(|category| {
            let sum: f64 = category
                .stage_ids
                .iter()
                .map(|stage_id| match stage_evaluations.get(stage_id) {
                    Some(eval) => clamp_score(eval.stage_score),
                    None => {
                        tracing::warn!(
                            category_id = %category.id,
                            stage_id = %stage_id,
                            "stage missing from evaluation map, scored as 0"
                        );
                        0.0
                    }
                })
                .sum();

            let mean = sum / category.stage_ids.len() as f64;
            let score = clamp_score(mean.round()) as u8;

            CategoryScore {
                category_id: category.id.clone(),
                name: category.name.clone(),
                weight: category.weight,
                score,
                passed: u32::from(score) >= category.pass_threshold,
            }
        })
        .collect()
}

/// Weighted overall score across categories.
pub fn overall_score(category_scores: &[CategoryScore]) -> u8 {
    let weighted: f64 = category_scores
        .iter()
        .map(|c| f64::from(c.score) * f64::from(c.weight) / 100.0)
        .sum();
    clamp_score(weighted.round()) as u8
}
