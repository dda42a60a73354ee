//! Per-run state machine.
//!
//! Every run carries its own [`RunContext`]; nothing about an in-flight run
//! lives on the orchestrator itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::router::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Profile,
    Skill,
    Career,
    Reasoning,
}

impl Step {
    /// Fixed dependency order.
    pub const ORDER: [Step; 4] = [Self::Profile, Self::Skill, Self::Career, Self::Reasoning];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Skill => "skill",
            Self::Career => "career",
            Self::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Routing,
    Executing(Step),
    Synthesizing,
    Committed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    /// `Idle -> Routing -> Executing(step)* -> Synthesizing -> Committed`, with
    /// `Aborted` reachable from any non-terminal state.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (s, Aborted) => !s.is_terminal(),
            (Idle, Routing) => true,
            (Routing, Executing(_)) | (Routing, Synthesizing) => true,
            (Executing(a), Executing(b)) => a < b,
            (Executing(_), Synthesizing) => true,
            (Synthesizing, Committed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Routing => f.write_str("routing"),
            Self::Executing(step) => write!(f, "executing({step})"),
            Self::Synthesizing => f.write_str("synthesizing"),
            Self::Committed => f.write_str("committed"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Identity and progress of one pipeline run.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub user_id: String,
    pub event: EventType,
    pub sequence: u64,
    state: RunState,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(user_id: &str, event: EventType, cancel: CancellationToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            event,
            sequence: 0,
            state: RunState::Idle,
            cancel,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            run = self.sequence,
            from = %self.state,
            to = %next,
            "run state transition"
        );
        self.state = next;
    }

    /// Move to `Aborted` and hand back the error that caused it.
    pub fn abort(&mut self, err: PipelineError) -> PipelineError {
        warn!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            run = self.sequence,
            state = %self.state,
            error = %err,
            "run aborted"
        );
        if !self.state.is_terminal() {
            self.state = RunState::Aborted;
        }
        err
    }

    /// Fails with `Cancelled` once the caller has cancelled the run.
    pub fn ensure_live(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled { state: self.state })
        } else {
            Ok(())
        }
    }
}
