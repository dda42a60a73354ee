//! Event routing: which analyses an event triggers.
//!
//! The plan is a pure function of the event type. Payloads are carried along
//! for adapters but never consulted here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OnboardingCompleted,
    SkillUpdated,
    DirectionChanged,
    CheckIn,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        Self::OnboardingCompleted,
        Self::SkillUpdated,
        Self::DirectionChanged,
        Self::CheckIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnboardingCompleted => "onboarding_completed",
            Self::SkillUpdated => "skill_updated",
            Self::DirectionChanged => "direction_changed",
            Self::CheckIn => "check_in",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| PipelineError::UnrecognizedEvent(s.to_string()))
    }
}

/// An immutable event. The payload is opaque to routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Build an event from its wire name, failing on unknown types.
    pub fn parse(
        kind: &str,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> PipelineResult<Self> {
        Ok(Self {
            event_type: kind.parse()?,
            payload,
        })
    }
}

/// Steps one event runs. Every routed plan ends in reasoning, and the
/// orchestrator always synthesizes; `run_reasoning` is reported, not gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub run_profile: bool,
    pub run_skill: bool,
    pub run_career: bool,
    pub run_reasoning: bool,
}

impl ExecutionPlan {
    const fn new(run_profile: bool, run_skill: bool, run_career: bool, run_reasoning: bool) -> Self {
        Self {
            run_profile,
            run_skill,
            run_career,
            run_reasoning,
        }
    }

    pub fn includes(&self, step: Step) -> bool {
        match step {
            Step::Profile => self.run_profile,
            Step::Skill => self.run_skill,
            Step::Career => self.run_career,
            Step::Reasoning => self.run_reasoning,
        }
    }

    /// Planned steps in execution order.
    pub fn steps(&self) -> Vec<Step> {
        Step::ORDER.into_iter().filter(|s| self.includes(*s)).collect()
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps().iter().map(Step::to_string).collect();
        write!(f, "[{}]", steps.join(", "))
    }
}

/// Total over the closed event enumeration.
pub fn route(event_type: EventType) -> ExecutionPlan {
    match event_type {
        EventType::OnboardingCompleted => ExecutionPlan::new(true, true, true, true),
        EventType::SkillUpdated => ExecutionPlan::new(false, true, false, true),
        EventType::DirectionChanged => ExecutionPlan::new(false, false, true, true),
        EventType::CheckIn => ExecutionPlan::new(false, false, false, true),
    }
}

#[instrument(level = "debug")]
pub fn route_name(event_type: &str) -> PipelineResult<ExecutionPlan> {
    Ok(route(event_type.parse()?))
}
