//! Horizon core: event-driven career guidance pipeline.
//!
//! Events are routed to a fixed plan of analyses (profile, skill, career,
//! reasoning). The skill step resolves blocking and helpful gaps over a
//! validated prerequisite graph; the orchestrator runs the plan and commits
//! the synthesized output per user, all or nothing.

pub mod adapters;
pub mod batch;
pub mod cli;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod router;
pub mod settings;
pub mod skills;
pub mod store;
pub mod telemetry;

pub use error::{AnalysisError, GraphConfigurationError, PipelineError, PipelineResult};
pub use orchestrator::{Orchestrator, RunInputs};
