//! Boundaries to the analysis collaborators.
//!
//! Each adapter is total over its input or returns an [`AnalysisError`]; the
//! orchestrator never looks at why. Only the synthesizer may produce free
//! text, and only through a [`TextGenerator`] that demands a
//! [`ReasoningGrant`].

pub mod career;
pub mod profile;
pub mod synthesis;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AnalysisError;
use crate::models::{
    Analysis, CareerRecommendation, ProfileAnalysis, SynthesisInput, SynthesizedOutput, UserProfile,
};
use crate::skills::{SkillGapAnalysis, SkillSnapshot};

pub use career::RuleDirectionRecommender;
pub use profile::RuleProfileClassifier;
pub use synthesis::DigestSynthesizer;

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Proof that the caller is the reasoning step of a pipeline run.
///
/// Only the orchestrator can mint one, and it hands it to nothing but
/// [`Synthesizer::synthesize`].
#[derive(Debug)]
pub struct ReasoningGrant {
    run_sequence: u64,
}

impl ReasoningGrant {
    pub(crate) fn mint(run_sequence: u64) -> Self {
        Self { run_sequence }
    }

    pub fn run_sequence(&self) -> u64 {
        self.run_sequence
    }
}

#[async_trait]
pub trait ProfileClassifier: Send + Sync {
    fn name(&self) -> &str;
    async fn classify(&self, profile: &UserProfile) -> AnalysisResult<ProfileAnalysis>;
}

#[async_trait]
pub trait DirectionRecommender: Send + Sync {
    fn name(&self) -> &str;
    async fn recommend(
        &self,
        profile: &ProfileAnalysis,
        snapshot: &SkillSnapshot,
        skills: &Analysis<SkillGapAnalysis>,
    ) -> AnalysisResult<CareerRecommendation>;
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &str;
    async fn synthesize(
        &self,
        input: SynthesisInput,
        grant: &ReasoningGrant,
    ) -> AnalysisResult<SynthesizedOutput>;
}

/// External reasoning service. Unusable without a grant.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn narrate(&self, grant: &ReasoningGrant, input: &SynthesisInput) -> AnalysisResult<String>;
}

/// The adapter set an orchestrator runs with.
#[derive(Clone)]
pub struct Adapters {
    pub profile: Arc<dyn ProfileClassifier>,
    pub career: Arc<dyn DirectionRecommender>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl Adapters {
    /// Built-in rule adapters, optionally narrating through `text`.
    pub fn rule_based(text: Option<Arc<dyn TextGenerator>>) -> Self {
        let synthesizer = match text {
            Some(text) => DigestSynthesizer::with_text_generator(text),
            None => DigestSynthesizer::new(),
        };
        Self {
            profile: Arc::new(RuleProfileClassifier),
            career: Arc::new(RuleDirectionRecommender),
            synthesizer: Arc::new(synthesizer),
        }
    }
}

impl std::fmt::Debug for Adapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapters")
            .field("profile", &self.profile.name())
            .field("career", &self.career.name())
            .field("synthesizer", &self.synthesizer.name())
            .finish()
    }
}
