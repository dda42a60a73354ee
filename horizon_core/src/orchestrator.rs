//! Runs the analyses an event calls for and commits the synthesized result.
//!
//! Stage 1 runs profile and skill concurrently, stage 2 runs career, stage 3
//! synthesizes. Any failure, timeout or cancellation aborts the run before
//! the commit, so the cached output is either the old one or a complete new
//! one.

use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, field, info, instrument, warn, Span};

use crate::adapters::{Adapters, AnalysisResult, ReasoningGrant};
use crate::error::{AnalysisError, PipelineError, PipelineResult};
use crate::models::{Analysis, SynthesisInput, SynthesizedOutput, UserProfile};
use crate::pipeline::{RunContext, RunState, Step};
use crate::router::{route, Event, ExecutionPlan};
use crate::settings::{PipelineConfig, Settings};
use crate::skills::{analyze_skills, FoundationalSet, SkillGraph, SkillSnapshot};
use crate::store::{CommitSet, InMemoryResultStore, ResultStore};

/// External inputs supplied with an event. Borrowed for one run only.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub profile: Option<UserProfile>,
    pub snapshot: Option<SkillSnapshot>,
}

pub struct Orchestrator {
    graph: Arc<SkillGraph>,
    foundational: Arc<FoundationalSet>,
    adapters: Adapters,
    store: Arc<dyn ResultStore>,
    step_timeout: Duration,
    synthesis_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        config: &PipelineConfig,
        graph: SkillGraph,
        foundational: FoundationalSet,
        adapters: Adapters,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            graph: Arc::new(graph),
            foundational: Arc::new(foundational),
            adapters,
            store,
            step_timeout: config.step_timeout(),
            synthesis_timeout: config.synthesis_timeout(),
        }
    }

    /// Validated skill graph, rule adapters and an in-memory store. A bad
    /// graph configuration is returned as an error and must stop startup.
    #[instrument(skip(settings))]
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (graph, foundational) = settings.skill_graph.load().map_err(|e| {
            error!(error = %e, "invalid skill graph configuration");
            e
        })
        .context("Failed to load skill graph")?;

        info!(
            skills = graph.len(),
            foundational = foundational.version(),
            "skill graph loaded"
        );

        Ok(Self::new(
            &settings.pipeline,
            graph,
            foundational,
            Adapters::rule_based(None),
            Arc::new(InMemoryResultStore::new()),
        ))
    }

    pub fn graph(&self) -> &SkillGraph {
        &self.graph
    }

    pub fn foundational(&self) -> &FoundationalSet {
        &self.foundational
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Route and run an event by its wire name.
    pub async fn submit_event(
        &self,
        event_type: &str,
        user_id: &str,
        profile: Option<UserProfile>,
        snapshot: Option<SkillSnapshot>,
    ) -> PipelineResult<SynthesizedOutput> {
        let event = Event::parse(event_type, serde_json::Map::new()).map_err(|e| {
            warn!(user_id, error = %e, "rejected event");
            e
        })?;
        self.run(event, user_id, RunInputs { profile, snapshot }, CancellationToken::new())
            .await
    }

    /// Last committed output. Never triggers computation.
    #[instrument(skip(self))]
    pub async fn get_cached(&self, user_id: &str) -> PipelineResult<SynthesizedOutput> {
        self.store
            .load(user_id)
            .await?
            .output
            .ok_or_else(|| PipelineError::NotFound(user_id.to_string()))
    }

    /// Run one event to `Committed` or `Aborted`. Cancelling `cancel` before
    /// the commit aborts the run and drops in-flight analyses.
    #[instrument(
        skip(self, event, inputs, cancel),
        fields(event = %event.event_type, run_id = field::Empty, run = field::Empty)
    )]
    pub async fn run(
        &self,
        event: Event,
        user_id: &str,
        inputs: RunInputs,
        cancel: CancellationToken,
    ) -> PipelineResult<SynthesizedOutput> {
        let mut ctx = RunContext::new(user_id, event.event_type, cancel);
        Span::current().record("run_id", field::display(ctx.run_id));

        ctx.advance(RunState::Routing);
        let plan = route(event.event_type);
        debug_assert!(plan.run_reasoning, "every plan ends in synthesis");

        ctx.sequence = match self.store.begin_run(user_id).await {
            Ok(sequence) => sequence,
            Err(e) => return Err(ctx.abort(e)),
        };
        Span::current().record("run", ctx.sequence);
        info!(%plan, "run started");

        match self.execute(&mut ctx, plan, inputs).await {
            Ok(output) => Ok(output),
            Err(e) => Err(ctx.abort(e)),
        }
    }

    async fn execute(
        &self,
        ctx: &mut RunContext,
        plan: ExecutionPlan,
        inputs: RunInputs,
    ) -> PipelineResult<SynthesizedOutput> {
        let cached = self.store.load(&ctx.user_id).await?;
        ctx.ensure_live()?;
        let cancel = ctx.cancel_token().clone();
        let RunInputs { profile, snapshot } = inputs;

        // Stage 1: profile and skill depend only on external inputs.
        if plan.run_profile {
            ctx.advance(RunState::Executing(Step::Profile));
        }
        if plan.run_skill {
            ctx.advance(RunState::Executing(Step::Skill));
        }
        let direction = cached.career.as_ref().map(|c| c.primary.role.as_str());

        let profile_step = async {
            if !plan.run_profile {
                return Ok(None);
            }
            let profile = require(&profile, Step::Profile, "user profile")?;
            self.guarded(&cancel, Step::Profile, self.step_timeout, self.adapters.profile.classify(profile))
                .await
                .map(Some)
        };
        let skill_step = async {
            if !plan.run_skill {
                return Ok(None);
            }
            let snapshot = require(&snapshot, Step::Skill, "skill snapshot")?;
            let analysis = async { Ok(analyze_skills(snapshot, direction, &self.graph, &self.foundational)) };
            self.guarded(&cancel, Step::Skill, self.step_timeout, analysis)
                .await
                .map(Some)
        };
        let (fresh_profile, fresh_skills) = tokio::try_join!(profile_step, skill_step)?;

        let profile_analysis: Analysis<_> = fresh_profile.clone().or(cached.profile).into();
        let skill_analysis: Analysis<_> = fresh_skills.clone().or(cached.skills.clone()).into();

        // Stage 2: career consumes both.
        let fresh_career = if plan.run_career {
            ctx.advance(RunState::Executing(Step::Career));
            let Analysis::Computed(profile_ref) = &profile_analysis else {
                return Err(missing(Step::Career, "profile analysis"));
            };
            let snapshot = require(&snapshot, Step::Career, "skill snapshot")?;
            let recommendation = self
                .guarded(
                    &cancel,
                    Step::Career,
                    self.step_timeout,
                    self.adapters.career.recommend(profile_ref, snapshot, &skill_analysis),
                )
                .await?;
            Some(recommendation)
        } else {
            None
        };

        let skill_analysis_stale = match (&fresh_skills, &cached.skills, &fresh_career) {
            (None, Some(skills), Some(career)) => !skills.computed_for(Some(&career.primary.role)),
            _ => false,
        };
        if skill_analysis_stale {
            warn!(
                user_id = %ctx.user_id,
                run = ctx.sequence,
                "reusing skill analysis computed for a different direction"
            );
        }

        // Stage 3: synthesis sees this round's results plus whatever is cached.
        ctx.advance(RunState::Synthesizing);
        let input = SynthesisInput {
            user_id: ctx.user_id.clone(),
            event: ctx.event,
            run_sequence: ctx.sequence,
            profile: profile_analysis,
            skills: skill_analysis,
            career: fresh_career.clone().or(cached.career).into(),
            skill_analysis_stale,
        };
        let grant = ReasoningGrant::mint(ctx.sequence);
        let output = self
            .guarded(
                &cancel,
                Step::Reasoning,
                self.synthesis_timeout,
                self.adapters.synthesizer.synthesize(input, &grant),
            )
            .await?;

        ctx.ensure_live()?;
        let changes = CommitSet {
            profile: fresh_profile,
            skills: fresh_skills,
            career: fresh_career,
            output: output.clone(),
        };

        match self.store.commit(&ctx.user_id, ctx.sequence, changes).await {
            Ok(()) => {
                ctx.advance(RunState::Committed);
                info!(run = ctx.sequence, "run committed");
                Ok(output)
            }
            Err(PipelineError::StaleRunRejected { last_committed, .. }) => {
                // A newer run already committed; its output supersedes ours.
                info!(run = ctx.sequence, last_committed, "run superseded, result discarded");
                ctx.advance(RunState::Aborted);
                self.get_cached(&ctx.user_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the step timeout and cancellation to one analysis call.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        step: Step,
        limit: Duration,
        analysis: impl Future<Output = AnalysisResult<T>>,
    ) -> PipelineResult<T> {
        let state = match step {
            Step::Reasoning => RunState::Synthesizing,
            step => RunState::Executing(step),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled { state }),
            outcome = tokio::time::timeout(limit, analysis) => outcome,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PipelineError::AnalysisFailure { step, source }),
            Err(_) => Err(PipelineError::AnalysisFailure {
                step,
                source: AnalysisError::TimedOut(limit),
            }),
        }
    }
}

fn missing(step: Step, what: &'static str) -> PipelineError {
    PipelineError::AnalysisFailure {
        step,
        source: AnalysisError::MissingInput(what),
    }
}

fn require<'a, T>(value: &'a Option<T>, step: Step, what: &'static str) -> PipelineResult<&'a T> {
    value.as_ref().ok_or_else(|| missing(step, what))
}
