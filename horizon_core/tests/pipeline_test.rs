//! End-to-end tests for the orchestrator: commit/abort atomicity, sentinel
//! handling, stale-run rejection, timeouts and cancellation.

use async_trait::async_trait;
use horizon_core::{
    adapters::{
        Adapters, AnalysisResult, DigestSynthesizer, DirectionRecommender, ProfileClassifier,
        ReasoningGrant, RuleDirectionRecommender, RuleProfileClassifier, Synthesizer, TextGenerator,
    },
    models::{
        Analysis, CareerRecommendation, ExposureLevel, InsightKind, ProfileAnalysis, Stage,
        SynthesisInput, SynthesizedOutput, TimeCommitment, UserProfile,
    },
    pipeline::{RunState, Step},
    router::Event,
    settings::PipelineConfig,
    skills::{catalog::builtin_graph, FoundationalSet, SkillGapAnalysis, SkillLevel, SkillSnapshot},
    store::InMemoryResultStore,
    AnalysisError, Orchestrator, PipelineError, RunInputs,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn build(adapters: Adapters, config: PipelineConfig) -> Orchestrator {
    let graph = builtin_graph().unwrap();
    let foundational = FoundationalSet::builtin(&graph).unwrap();
    Orchestrator::new(
        &config,
        graph,
        foundational,
        adapters,
        Arc::new(InMemoryResultStore::new()),
    )
}

fn rule_orchestrator() -> Orchestrator {
    build(Adapters::rule_based(None), PipelineConfig::default())
}

fn profile(user_id: &str) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        name: "Asha".to_string(),
        stage: Stage::ThirdYear,
        graduation_year: Some(2027),
        exposure: ExposureLevel::SmallProjects,
        weekly_time: TimeCommitment::FiveToTen,
        learning_preferences: vec!["Projects".to_string()],
        goals: vec!["Land an ML internship".to_string()],
        interests: vec!["Machine Learning".to_string()],
    }
}

fn snapshot() -> SkillSnapshot {
    SkillSnapshot::new()
        .with("python", SkillLevel::Comfortable)
        .with("git", SkillLevel::UsedABit)
}

fn bytes(output: &SynthesizedOutput) -> Vec<u8> {
    serde_json::to_vec(output).unwrap()
}

/// A second orchestrator over the same graph and store, with other adapters.
fn sharing_store(orchestrator: &Orchestrator, adapters: Adapters) -> Orchestrator {
    Orchestrator::new(
        &PipelineConfig::default(),
        orchestrator.graph().clone(),
        orchestrator.foundational().clone(),
        adapters,
        orchestrator.store().clone(),
    )
}

// --- test adapters ---

struct FailingRecommender;

#[async_trait]
impl DirectionRecommender for FailingRecommender {
    fn name(&self) -> &str {
        "failing"
    }

    async fn recommend(
        &self,
        _profile: &ProfileAnalysis,
        _snapshot: &SkillSnapshot,
        _skills: &Analysis<SkillGapAnalysis>,
    ) -> AnalysisResult<CareerRecommendation> {
        Err(AnalysisError::failed("model offline"))
    }
}

struct FailingSynthesizer;

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn synthesize(
        &self,
        _input: SynthesisInput,
        _grant: &ReasoningGrant,
    ) -> AnalysisResult<SynthesizedOutput> {
        Err(AnalysisError::failed("reasoning service unavailable"))
    }
}

struct SlowClassifier(Duration);

#[async_trait]
impl ProfileClassifier for SlowClassifier {
    fn name(&self) -> &str {
        "slow"
    }

    async fn classify(&self, profile: &UserProfile) -> AnalysisResult<ProfileAnalysis> {
        tokio::time::sleep(self.0).await;
        RuleProfileClassifier.classify(profile).await
    }
}

/// Holds synthesis for one run sequence until released.
struct GatedSynthesizer {
    gate_run: u64,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl Synthesizer for GatedSynthesizer {
    fn name(&self) -> &str {
        "gated"
    }

    async fn synthesize(
        &self,
        input: SynthesisInput,
        grant: &ReasoningGrant,
    ) -> AnalysisResult<SynthesizedOutput> {
        if grant.run_sequence() == self.gate_run {
            self.entered.notify_one();
            self.release.notified().await;
        }
        DigestSynthesizer::new().synthesize(input, grant).await
    }
}

struct EchoNarrator;

#[async_trait]
impl TextGenerator for EchoNarrator {
    async fn narrate(&self, grant: &ReasoningGrant, input: &SynthesisInput) -> AnalysisResult<String> {
        Ok(format!("run {} for {}", grant.run_sequence(), input.user_id))
    }
}

// --- tests ---

#[tokio::test]
async fn test_onboarding_runs_every_step() {
    let orchestrator = rule_orchestrator();
    let out = orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap();

    assert!(out.not_computed.is_empty());
    assert_eq!(out.direction.computed().unwrap().primary_role, "Machine Learning Engineer");
    assert!(out.immediate_focus.is_some());
    assert_eq!(orchestrator.get_cached("asha").await.unwrap(), out);
}

#[tokio::test]
async fn test_check_in_for_new_user_supplies_sentinels() {
    let orchestrator = rule_orchestrator();
    let out = orchestrator.submit_event("check_in", "new", None, None).await.unwrap();

    assert_eq!(out.not_computed, vec![Step::Profile, Step::Skill, Step::Career]);
    assert_eq!(out.profile, Analysis::NotComputed);
    assert_eq!(out.skills, Analysis::NotComputed);
    assert_eq!(out.direction, Analysis::NotComputed);
}

#[tokio::test]
async fn test_skipped_steps_reuse_cached_analyses() {
    let orchestrator = rule_orchestrator();
    let first = orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap();

    let updated = snapshot().with("statistics", SkillLevel::Aware);
    let second = orchestrator
        .submit_event("skill_updated", "asha", None, Some(updated))
        .await
        .unwrap();

    assert_eq!(second.run_sequence, first.run_sequence + 1);
    assert!(second.not_computed.is_empty());
    assert_eq!(second.profile, first.profile);
    assert_eq!(second.direction, first.direction);
    assert_ne!(second.skills, first.skills);
}

#[tokio::test]
#[traced_test]
async fn test_failed_step_leaves_cache_byte_identical() {
    let mut adapters = Adapters::rule_based(None);
    let orchestrator = build(adapters.clone(), PipelineConfig::default());
    orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap();
    let before = bytes(&orchestrator.get_cached("asha").await.unwrap());

    adapters.career = Arc::new(FailingRecommender);
    let failing = sharing_store(&orchestrator, adapters);

    let err = failing
        .submit_event("direction_changed", "asha", None, Some(snapshot()))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(Step::Career));
    assert!(matches!(
        err,
        PipelineError::AnalysisFailure { source: AnalysisError::Failed(_), .. }
    ));
    assert_eq!(bytes(&failing.get_cached("asha").await.unwrap()), before);
    assert!(logs_contain("run aborted"));
}

#[tokio::test]
async fn test_analyses_finished_before_a_failure_are_not_merged() {
    let orchestrator = rule_orchestrator();
    orchestrator.submit_event("check_in", "asha", None, None).await.unwrap();
    let before = orchestrator.store().load("asha").await.unwrap();
    assert!(before.profile.is_none() && before.skills.is_none());

    let mut adapters = Adapters::rule_based(None);
    adapters.career = Arc::new(FailingRecommender);
    let failing = sharing_store(&orchestrator, adapters);

    // profile and skill succeed, career fails
    let err = failing
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), Some(Step::Career));

    let after = orchestrator.store().load("asha").await.unwrap();
    assert_eq!(after, before);
    assert!(after.profile.is_none());
    assert!(after.skills.is_none());
}

#[tokio::test]
async fn test_failed_synthesis_leaves_record_unchanged() {
    let orchestrator = rule_orchestrator();
    orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap();
    let before = orchestrator.store().load("asha").await.unwrap();

    let mut adapters = Adapters::rule_based(None);
    adapters.synthesizer = Arc::new(FailingSynthesizer);
    let failing = sharing_store(&orchestrator, adapters);

    let updated = snapshot().with("statistics", SkillLevel::Comfortable);
    let err = failing
        .submit_event("skill_updated", "asha", None, Some(updated))
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), Some(Step::Reasoning));

    assert_eq!(orchestrator.store().load("asha").await.unwrap(), before);
    assert_eq!(orchestrator.store().stats().await.commits, 1);
}

#[tokio::test]
async fn test_direction_change_without_profile_aborts() {
    let orchestrator = rule_orchestrator();
    let err = orchestrator
        .submit_event("direction_changed", "new", None, Some(snapshot()))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PipelineError::AnalysisFailure {
            step: Step::Career,
            source: AnalysisError::MissingInput("profile analysis"),
        }
    );
    assert_eq!(
        orchestrator.get_cached("new").await.unwrap_err(),
        PipelineError::NotFound("new".to_string())
    );
}

#[tokio::test]
#[traced_test]
async fn test_direction_change_flags_stale_skill_analysis() {
    let orchestrator = rule_orchestrator();
    orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap();

    // skills were computed before any direction existed
    let out = orchestrator
        .submit_event("direction_changed", "asha", None, Some(snapshot()))
        .await
        .unwrap();

    assert!(out.insights.iter().any(|i| i.kind == InsightKind::Staleness));
    assert!(logs_contain("different direction"));
}

#[tokio::test]
async fn test_older_run_committing_last_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut adapters = Adapters::rule_based(None);
    adapters.synthesizer = Arc::new(GatedSynthesizer {
        gate_run: 1,
        entered: entered.clone(),
        release: release.clone(),
    });
    let orchestrator = Arc::new(build(adapters, PipelineConfig::default()));

    // run 1 starts first and parks inside synthesis
    let older = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.submit_event("check_in", "u", None, None).await })
    };
    entered.notified().await;

    // run 2 starts later but commits first
    let newer = orchestrator.submit_event("check_in", "u", None, None).await.unwrap();
    assert_eq!(newer.run_sequence, 2);

    release.notify_one();
    let older = older.await.unwrap().unwrap();

    // the stale commit is swallowed and the newer output returned
    assert_eq!(older, newer);
    let cached = orchestrator.get_cached("u").await.unwrap();
    assert_eq!(cached.run_sequence, 2);

    let stats = orchestrator.store().stats().await;
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn test_step_timeout_aborts_run() {
    let mut adapters = Adapters::rule_based(None);
    adapters.profile = Arc::new(SlowClassifier(Duration::from_millis(500)));
    let config = PipelineConfig {
        step_timeout_ms: 20,
        synthesis_timeout_ms: 1_000,
    };
    let orchestrator = build(adapters, config);

    let err = orchestrator
        .submit_event("onboarding_completed", "asha", Some(profile("asha")), Some(snapshot()))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PipelineError::AnalysisFailure {
            step: Step::Profile,
            source: AnalysisError::TimedOut(Duration::from_millis(20)),
        }
    );
    assert!(orchestrator.get_cached("asha").await.is_err());
}

#[tokio::test]
async fn test_cancellation_drops_in_flight_analysis() {
    let mut adapters = Adapters::rule_based(None);
    adapters.profile = Arc::new(SlowClassifier(Duration::from_secs(30)));
    let orchestrator = build(adapters, PipelineConfig {
        step_timeout_ms: 60_000,
        synthesis_timeout_ms: 60_000,
    });

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        })
    };

    let event = Event::parse("onboarding_completed", serde_json::Map::new()).unwrap();
    let inputs = RunInputs {
        profile: Some(profile("asha")),
        snapshot: Some(snapshot()),
    };
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run(event, "asha", inputs, token),
    )
    .await
    .expect("cancellation should end the run promptly")
    .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(
        err,
        PipelineError::Cancelled {
            state: RunState::Executing(Step::Profile)
        }
    );
    assert!(orchestrator.get_cached("asha").await.is_err());
}

#[tokio::test]
async fn test_narration_goes_through_granted_text_generator() {
    let orchestrator = build(
        Adapters::rule_based(Some(Arc::new(EchoNarrator))),
        PipelineConfig::default(),
    );
    let out = orchestrator.submit_event("check_in", "u", None, None).await.unwrap();
    assert_eq!(out.narrative.as_deref(), Some("run 1 for u"));
}

#[tokio::test]
async fn test_users_do_not_share_run_sequences() {
    let orchestrator = Arc::new(rule_orchestrator());

    let runs = futures::future::join_all(["a", "b", "c"].into_iter().map(|user| {
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit_event("check_in", user, None, None).await }
    }))
    .await;

    for run in runs {
        assert_eq!(run.unwrap().run_sequence, 1);
    }
}

#[test]
fn test_rule_adapters_are_named() {
    let adapters = Adapters::rule_based(None);
    assert_eq!(adapters.career.name(), RuleDirectionRecommender.name());
    assert!(format!("{adapters:?}").contains("digest"));
}
