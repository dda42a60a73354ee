use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{AnalysisResult, ReasoningGrant, Synthesizer, TextGenerator};
use crate::models::{
    Analysis, CareerRecommendation, Confidence, DirectionSummary, Focus, Insight, InsightKind,
    SynthesisInput, SynthesizedOutput,
};
use crate::pipeline::Step;
use crate::skills::SkillGapAnalysis;

const FOCUS_WINDOW: &str = "Next 30 days";

/// Folds the step results into the consumer-facing digest. Every section
/// tolerates a missing analysis; narration is optional.
#[derive(Clone, Default)]
pub struct DigestSynthesizer {
    text: Option<Arc<dyn TextGenerator>>,
}

impl DigestSynthesizer {
    pub fn new() -> Self {
        Self { text: None }
    }

    pub fn with_text_generator(text: Arc<dyn TextGenerator>) -> Self {
        Self { text: Some(text) }
    }
}

#[async_trait]
impl Synthesizer for DigestSynthesizer {
    fn name(&self) -> &str {
        "digest"
    }

    async fn synthesize(
        &self,
        input: SynthesisInput,
        grant: &ReasoningGrant,
    ) -> AnalysisResult<SynthesizedOutput> {
        let narrative = match &self.text {
            Some(text) => Some(text.narrate(grant, &input).await?),
            None => None,
        };

        let not_computed = [
            (Step::Profile, input.profile.is_computed()),
            (Step::Skill, input.skills.is_computed()),
            (Step::Career, input.career.is_computed()),
        ]
        .into_iter()
        .filter(|(_, computed)| !computed)
        .map(|(step, _)| step)
        .collect();

        let direction = input.career.as_ref().map(direction_summary);
        let immediate_focus = input.skills.computed().map(immediate_focus);
        let insights = insights(&input);

        Ok(SynthesizedOutput {
            user_id: input.user_id,
            run_sequence: input.run_sequence,
            event: input.event,
            generated_at: Utc::now(),
            profile: input.profile,
            direction,
            skills: input.skills,
            immediate_focus,
            insights,
            narrative,
            not_computed,
        })
    }
}

fn direction_summary(career: &CareerRecommendation) -> DirectionSummary {
    let score = career.primary.match_score;
    let confidence = match score {
        70..=u8::MAX => Confidence::High,
        50..=69 => Confidence::Moderate,
        _ => Confidence::Low,
    };

    DirectionSummary {
        primary_role: career.primary.role.clone(),
        secondary_roles: career.alternatives.iter().take(2).map(|a| a.role.clone()).collect(),
        match_score: score,
        confidence,
    }
}

fn immediate_focus(skills: &SkillGapAnalysis) -> Focus {
    if let Some(gap) = skills.gaps.most_pressing() {
        return Focus {
            skill: gap.skill.display_name(),
            reason: gap.rationale.clone(),
            time_window: FOCUS_WINDOW.to_string(),
            next_task: gap
                .remediation
                .as_ref()
                .and_then(|r| r.next_task())
                .map(str::to_string),
        };
    }
    if let Some(skill) = skills.in_progress.first() {
        return Focus {
            skill: skill.display_name(),
            reason: "Continue building proficiency".to_string(),
            time_window: FOCUS_WINDOW.to_string(),
            next_task: None,
        };
    }
    Focus {
        skill: "Programming Fundamentals".to_string(),
        reason: "Foundation for all technical paths".to_string(),
        time_window: FOCUS_WINDOW.to_string(),
        next_task: None,
    }
}

fn insights(input: &SynthesisInput) -> Vec<Insight> {
    let mut out = Vec::new();
    let skills = input.skills.computed();

    if let (Some(skills), Analysis::Computed(career)) = (skills, &input.career) {
        if !skills.strengths.is_empty() {
            let top: Vec<&str> = skills.strengths.iter().take(2).map(String::as_str).collect();
            out.push(Insight {
                kind: InsightKind::Opportunity,
                message: format!(
                    "Your {} skills position you well for {}. Focus on filling gaps next.",
                    top.join(", "),
                    career.primary.role
                ),
            });
        }
    }

    if let Some(gap) = skills.and_then(|s| s.gaps.blocking.iter().max_by_key(|g| g.impact)) {
        let blocked: Vec<String> = gap.blocks.iter().take(2).map(|s| s.display_name()).collect();
        out.push(Insight {
            kind: InsightKind::Risk,
            message: format!(
                "Skipping {} will create gaps in {}.",
                gap.skill.display_name(),
                blocked.join(", ")
            ),
        });
    }

    if input.skill_analysis_stale {
        out.push(Insight {
            kind: InsightKind::Staleness,
            message: "Skill gaps were computed for a previous direction; update your skills to refresh them."
                .to_string(),
        });
    }

    out
}
