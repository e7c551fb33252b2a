//! CallQA command-line interface.
//!
//! All file and terminal I/O lives here; the core engine is a pure
//! library. Two commands:
//!
//! - `evaluate`: run a transcript through the deterministic engine and,
//!   when a rubric and stage scores are supplied, through final assembly.
//! - `validate`: parse and structurally check flow, rule, and rubric
//!   files without evaluating anything.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use callqa_core::{
    evaluate_deterministic, evaluate_final, DeterministicResult, EnginePolicy, FinalEvaluation,
    Flow, RubricTemplate, RuleSet, StageEvaluation, Transcript,
};

#[derive(Parser)]
#[command(name = "callqa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic call-center transcript QA", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a transcript against a flow and rule set
    Evaluate {
        /// Flow config (YAML)
        #[arg(long)]
        flow: PathBuf,

        /// Compliance rule set (YAML)
        #[arg(long)]
        rules: PathBuf,

        /// Transcript (JSON)
        #[arg(long)]
        transcript: PathBuf,

        /// Rubric template (YAML). Omitting it triggers the
        /// deterministic-score fallback and flags the result for review
        #[arg(long)]
        rubric: Option<PathBuf>,

        /// Per-stage scores from the external evaluator (JSON map of
        /// stage id to evaluation)
        #[arg(long)]
        stage_scores: Option<PathBuf>,

        /// Treat a required step with no expected phrases as a hard fail
        #[arg(long)]
        strict_undetectable: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Parse and validate config files without evaluating
    Validate {
        /// Flow config (YAML)
        #[arg(long)]
        flow: Option<PathBuf>,

        /// Compliance rule set (YAML)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Rubric template (YAML)
        #[arg(long)]
        rubric: Option<PathBuf>,
    },
}

/// Combined output of an `evaluate` run.
#[derive(Serialize)]
struct EvaluateOutput {
    deterministic: DeterministicResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_evaluation: Option<FinalEvaluation>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Evaluate {
            flow,
            rules,
            transcript,
            rubric,
            stage_scores,
            strict_undetectable,
            pretty,
        } => evaluate(
            flow,
            rules,
            transcript,
            rubric,
            stage_scores,
            strict_undetectable,
            pretty,
        ),
        Commands::Validate {
            flow,
            rules,
            rubric,
        } => validate(flow, rules, rubric),
    }
}

fn evaluate(
    flow_path: PathBuf,
    rules_path: PathBuf,
    transcript_path: PathBuf,
    rubric_path: Option<PathBuf>,
    stage_scores_path: Option<PathBuf>,
    strict_undetectable: bool,
    pretty: bool,
) -> Result<()> {
    let flow = Flow::from_yaml_file(&flow_path)
        .with_context(|| format!("failed to load flow from {}", flow_path.display()))?;
    let rules = RuleSet::from_yaml_file(&rules_path)
        .with_context(|| format!("failed to load rules from {}", rules_path.display()))?;
    let transcript_json = fs::read_to_string(&transcript_path)
        .with_context(|| format!("failed to read {}", transcript_path.display()))?;
    let transcript = Transcript::from_json(&transcript_json)
        .with_context(|| format!("failed to parse transcript {}", transcript_path.display()))?;

    let policy = EnginePolicy {
        undetectable_required_fails: strict_undetectable,
    };

    tracing::debug!(
        flow_id = %flow.id,
        rules = rules.rules.len(),
        segments = transcript.segments.len(),
        "running deterministic evaluation"
    );

    let deterministic = evaluate_deterministic(&flow, &rules.rules, &transcript, &policy);

    // Final assembly needs stage scores; without them we report the
    // deterministic result alone.
    let final_evaluation = match stage_scores_path {
        None => None,
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let stage_evaluations: BTreeMap<String, StageEvaluation> =
                serde_json::from_str(&json)
                    .with_context(|| format!("failed to parse stage scores {}", path.display()))?;

            let rubric = match &rubric_path {
                None => None,
                Some(p) => Some(RubricTemplate::from_yaml_file(p).with_context(|| {
                    format!("failed to load rubric from {}", p.display())
                })?),
            };

            Some(evaluate_final(
                rubric.as_ref(),
                &stage_evaluations,
                &deterministic,
            )?)
        }
    };

    let output = EvaluateOutput {
        deterministic,
        final_evaluation,
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}

fn validate(
    flow_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    rubric_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(path) = flow_path {
        Flow::from_yaml_file(&path)
            .with_context(|| format!("invalid flow: {}", path.display()))?;
        println!("flow OK: {}", path.display());
    }
    if let Some(path) = rules_path {
        RuleSet::from_yaml_file(&path)
            .with_context(|| format!("invalid rules: {}", path.display()))?;
        println!("rules OK: {}", path.display());
    }
    if let Some(path) = rubric_path {
        RubricTemplate::from_yaml_file(&path)
            .with_context(|| format!("invalid rubric: {}", path.display()))?;
        println!("rubric OK: {}", path.display());
    }
    Ok(())
}
