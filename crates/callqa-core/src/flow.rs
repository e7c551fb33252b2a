//! Flow configuration: the ordered stage/step script an agent is
//! expected to follow.
//!
//! Flows are authored externally; the engine only runs the defensive
//! checks it needs to score safely (unique ids, unique orders). Full
//! authoring validation belongs to the authoring collaborator.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::ConfigError;

/// A timing constraint on a step, in seconds from call start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingRequirement {
    pub seconds: f64,
}

/// One discrete expected agent action, detected via literal phrase
/// matching against agent utterances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub required: bool,

    /// Phrases whose normalized form is searched for in agent speech.
    /// An empty set makes the step undetectable by this engine; the
    /// external evaluator is expected to resolve it.
    #[serde(default)]
    pub expected_phrases: Vec<String>,

    #[serde(default)]
    pub timing_requirement: Option<TimingRequirement>,

    /// Position within the stage. Unique per stage.
    pub order: u32,
}

/// An ordered group of steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    pub id: String,
    pub name: String,

    /// Position within the flow. Unique across the flow.
    pub order: u32,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A complete call script: ordered stages of ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
}

impl Flow {
    /// Parse a flow from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let flow: Flow = serde_yaml::from_str(yaml)?;
        flow.validate()?;
        Ok(flow)
    }

    /// Parse a flow from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let flow: Flow = serde_json::from_str(json)?;
        flow.validate()?;
        Ok(flow)
    }

    /// Parse a flow from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a flow from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Defensive structural checks: unique stage/step ids, unique stage
    /// orders, unique step orders within each stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::MissingField("flow.id".to_string()));
        }

        let mut stage_ids = HashSet::new();
        let mut stage_orders = HashSet::new();
        let mut step_ids = HashSet::new();

        for stage in &self.stages {
            if !stage_ids.insert(&stage.id) {
                return Err(ConfigError::DuplicateId(stage.id.clone()));
            }
            if !stage_orders.insert(stage.order) {
                return Err(ConfigError::DuplicateStageOrder {
                    stage_id: stage.id.clone(),
                    order: stage.order,
                });
            }

            let mut step_orders = HashSet::new();
            for step in &stage.steps {
                if !step_ids.insert(&step.id) {
                    return Err(ConfigError::DuplicateId(step.id.clone()));
                }
                if !step_orders.insert(step.order) {
                    return Err(ConfigError::DuplicateStepOrder {
                        stage_id: stage.id.clone(),
                        step_id: step.id.clone(),
                        order: step.order,
                    });
                }
            }
        }

        Ok(())
    }

    /// Iterate all steps across all stages in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = (&Stage, &Step)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.steps.iter().map(move |step| (stage, step)))
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<(&Stage, &Step)> {
        self.steps().find(|(_, step)| step.id == step_id)
    }
}
