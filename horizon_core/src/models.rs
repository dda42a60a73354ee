//! Inputs, per-step analysis results and the synthesized output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::Step;
use crate::router::EventType;
use crate::skills::SkillGapAnalysis;

/// Explicit marker for a value that no run has produced yet. Synthesis must
/// accept `NotComputed` for any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Analysis<T> {
    Computed(T),
    NotComputed,
}

impl<T> Analysis<T> {
    pub fn as_ref(&self) -> Analysis<&T> {
        match self {
            Self::Computed(v) => Analysis::Computed(v),
            Self::NotComputed => Analysis::NotComputed,
        }
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(v) => Some(v),
            Self::NotComputed => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Analysis<U> {
        match self {
            Self::Computed(v) => Analysis::Computed(f(v)),
            Self::NotComputed => Analysis::NotComputed,
        }
    }
}

impl<T> From<Option<T>> for Analysis<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotComputed, Self::Computed)
    }
}

// --- Onboarding profile (owned by the profile collaborator) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstYear,
    SecondYear,
    ThirdYear,
    FinalYear,
    Graduate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureLevel {
    Coursework,
    SmallProjects,
    SeriousProjects,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeCommitment {
    #[serde(rename = "<5")]
    UnderFive,
    #[serde(rename = "5-10")]
    FiveToTen,
    #[serde(rename = "10-15")]
    TenToFifteen,
    #[serde(rename = "15+")]
    OverFifteen,
}

impl TimeCommitment {
    pub fn label(self) -> &'static str {
        match self {
            Self::UnderFive => "<5 hours/week",
            Self::FiveToTen => "5-10 hours/week",
            Self::TenToFifteen => "10-15 hours/week",
            Self::OverFifteen => "15+ hours/week",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub stage: Stage,
    #[serde(default)]
    pub graduation_year: Option<u16>,
    pub exposure: ExposureLevel,
    pub weekly_time: TimeCommitment,
    #[serde(default)]
    pub learning_preferences: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

// --- Profile step ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn next(self) -> Option<Level> {
        match self {
            Self::Beginner => Some(Self::Intermediate),
            Self::Intermediate => Some(Self::Advanced),
            Self::Advanced => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAnalysis {
    pub name: String,
    pub role: String,
    pub level: Level,
    pub next_level: Option<Level>,
    /// 0-100
    pub progress_to_next_level: u8,
    pub exposure_summary: String,
    pub education: String,
    pub learning_style: String,
    pub time_available: String,
    pub goals: Vec<String>,
    pub interests: Vec<String>,
}

// --- Career step ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerMatch {
    pub role: String,
    /// 0-100
    pub match_score: u8,
    pub reason: Option<String>,
    pub time_to_ready: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInsights {
    pub demand_trend: String,
    pub salary_range: String,
    pub top_companies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerRecommendation {
    pub primary: CareerMatch,
    pub alternatives: Vec<CareerMatch>,
    pub market: Option<MarketInsights>,
}

// --- Synthesis ---

/// Everything the synthesis step sees for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisInput {
    pub user_id: String,
    pub event: EventType,
    pub run_sequence: u64,
    pub profile: Analysis<ProfileAnalysis>,
    pub skills: Analysis<SkillGapAnalysis>,
    pub career: Analysis<CareerRecommendation>,
    /// The cached skill analysis was computed for a different direction than
    /// the one just recommended.
    pub skill_analysis_stale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSummary {
    pub primary_role: String,
    pub secondary_roles: Vec<String>,
    pub match_score: u8,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Focus {
    pub skill: String,
    pub reason: String,
    pub time_window: String,
    /// First practice task for the skill, when the catalog has one.
    #[serde(default)]
    pub next_task: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Opportunity,
    Risk,
    Staleness,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Final result of a committed run. The only value consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedOutput {
    pub user_id: String,
    pub run_sequence: u64,
    pub event: EventType,
    pub generated_at: DateTime<Utc>,
    pub profile: Analysis<ProfileAnalysis>,
    pub direction: Analysis<DirectionSummary>,
    pub skills: Analysis<SkillGapAnalysis>,
    pub immediate_focus: Option<Focus>,
    pub insights: Vec<Insight>,
    pub narrative: Option<String>,
    /// Steps whose results were not available to this synthesis.
    pub not_computed: Vec<Step>,
}
