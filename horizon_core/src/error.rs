//! Error types for graph construction, analysis steps and pipeline runs.

use std::time::Duration;
use thiserror::Error;

use crate::pipeline::{RunState, Step};

/// A defect in the skill graph configuration. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphConfigurationError {
    #[error("Skill graph is empty")]
    Empty,
    #[error("Skill '{0}' is defined more than once")]
    DuplicateSkill(String),
    #[error("Skill '{skill}' lists unknown prerequisite '{prerequisite}'")]
    DanglingPrerequisite { skill: String, prerequisite: String },
    #[error("{context} references unknown skill '{skill}'")]
    UnknownSkill { context: &'static str, skill: String },
    #[error("Skill graph contains a cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("Failed to parse skill graph: {0}")]
    Parse(String),
}

/// Failure reported by an analysis adapter. The core never inspects why.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("required input not supplied: {0}")]
    MissingInput(&'static str),
}

impl AnalysisError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Per-request failures surfaced at the orchestrator boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unrecognized event type '{0}'")]
    UnrecognizedEvent(String),
    #[error("Analysis step '{step}' failed: {source}")]
    AnalysisFailure {
        step: Step,
        #[source]
        source: AnalysisError,
    },
    #[error("No synthesized output cached for user '{0}'")]
    NotFound(String),
    #[error("Run cancelled while {state}")]
    Cancelled { state: RunState },
    #[error("Run {run} for user '{user_id}' superseded by committed run {last_committed}")]
    StaleRunRejected {
        user_id: String,
        run: u64,
        last_committed: u64,
    },
}

impl PipelineError {
    /// The step that failed, when the error came from an analysis.
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::AnalysisFailure { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
