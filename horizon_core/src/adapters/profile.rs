use async_trait::async_trait;

use super::{AnalysisResult, ProfileClassifier};
use crate::models::{ExposureLevel, Level, ProfileAnalysis, Stage, UserProfile};

/// Classifies a profile from stage, exposure and interests alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleProfileClassifier;

#[async_trait]
impl ProfileClassifier for RuleProfileClassifier {
    fn name(&self) -> &str {
        "rule_profile"
    }

    async fn classify(&self, profile: &UserProfile) -> AnalysisResult<ProfileAnalysis> {
        let level = level_for(profile.exposure, profile.stage);
        let keywords: Vec<&str> = profile
            .interests
            .iter()
            .chain(profile.goals.iter())
            .map(String::as_str)
            .collect();

        Ok(ProfileAnalysis {
            name: profile.name.clone(),
            role: infer_role(&keywords, profile.exposure).to_string(),
            level,
            next_level: level.next(),
            progress_to_next_level: progress_for(profile.exposure, profile.stage),
            exposure_summary: exposure_summary(profile.exposure).to_string(),
            education: education(profile.stage, profile.graduation_year),
            learning_style: profile
                .learning_preferences
                .first()
                .cloned()
                .unwrap_or_else(|| "Self-paced".to_string()),
            time_available: profile.weekly_time.label().to_string(),
            goals: profile.goals.clone(),
            interests: profile.interests.clone(),
        })
    }
}

fn is_late_stage(stage: Stage) -> bool {
    matches!(stage, Stage::ThirdYear | Stage::FinalYear | Stage::Graduate)
}

fn level_for(exposure: ExposureLevel, stage: Stage) -> Level {
    match exposure {
        ExposureLevel::Professional => Level::Advanced,
        ExposureLevel::SeriousProjects => Level::Intermediate,
        ExposureLevel::SmallProjects if is_late_stage(stage) => Level::Intermediate,
        ExposureLevel::SmallProjects | ExposureLevel::Coursework => Level::Beginner,
    }
}

fn progress_for(exposure: ExposureLevel, stage: Stage) -> u8 {
    let base: u8 = match exposure {
        ExposureLevel::Coursework => 20,
        ExposureLevel::SmallProjects => 40,
        ExposureLevel::SeriousProjects => 65,
        ExposureLevel::Professional => 85,
    };
    // graduates get no bump
    if matches!(stage, Stage::ThirdYear | Stage::FinalYear) {
        (base + 15).min(95)
    } else {
        base
    }
}

fn exposure_summary(exposure: ExposureLevel) -> &'static str {
    match exposure {
        ExposureLevel::Coursework => "Mostly coursework",
        ExposureLevel::SmallProjects => "Built small projects",
        ExposureLevel::SeriousProjects => "Serious projects/internships",
        ExposureLevel::Professional => "Working professionally",
    }
}

fn education(stage: Stage, graduation_year: Option<u16>) -> String {
    let base = match stage {
        Stage::FirstYear => "1st Year",
        Stage::SecondYear => "2nd Year",
        Stage::ThirdYear => "3rd Year",
        Stage::FinalYear => "Final Year",
        Stage::Graduate => "Graduate",
    };
    match graduation_year {
        Some(year) => format!("{base} (Graduating {year})"),
        None => base.to_string(),
    }
}

/// Role keywords, checked in order against lowercased interests and goals.
const ROLE_KEYWORDS: &[(&[&str], &str)] = &[
    (&["ml", "machine learning", "ai"], "Aspiring ML Engineer"),
    (&["data"], "Aspiring Data Scientist"),
    (&["frontend", "react", "ui"], "Aspiring Frontend Developer"),
    (&["backend", "api", "server"], "Aspiring Backend Developer"),
    (&["full", "web"], "Aspiring Full Stack Developer"),
    (&["devops", "cloud", "infra"], "Aspiring DevOps Engineer"),
];

fn infer_role(keywords: &[&str], exposure: ExposureLevel) -> &'static str {
    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    ROLE_KEYWORDS
        .iter()
        .find(|(needles, _)| {
            lowered
                .iter()
                .any(|k| needles.iter().any(|needle| k.contains(needle)))
        })
        .map(|(_, role)| *role)
        .unwrap_or(match exposure {
            ExposureLevel::Professional => "Software Engineer",
            _ => "Aspiring Software Developer",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeCommitment;

    fn profile(stage: Stage, exposure: ExposureLevel, interests: &[&str]) -> UserProfile {
        UserProfile {
            user_id: "u1".into(),
            name: "Asha".into(),
            stage,
            graduation_year: Some(2027),
            exposure,
            weekly_time: TimeCommitment::TenToFifteen,
            learning_preferences: vec![],
            goals: vec![],
            interests: interests.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_late_stage_small_projects_is_intermediate() {
        let analysis = RuleProfileClassifier
            .classify(&profile(Stage::FinalYear, ExposureLevel::SmallProjects, &["AI/ML"]))
            .await
            .unwrap();

        assert_eq!(analysis.level, Level::Intermediate);
        assert_eq!(analysis.next_level, Some(Level::Advanced));
        assert_eq!(analysis.progress_to_next_level, 55);
        assert_eq!(analysis.role, "Aspiring ML Engineer");
        assert_eq!(analysis.education, "Final Year (Graduating 2027)");
        assert_eq!(analysis.learning_style, "Self-paced");
        assert_eq!(analysis.time_available, "10-15 hours/week");
    }

    #[tokio::test]
    async fn test_early_stage_defaults() {
        let analysis = RuleProfileClassifier
            .classify(&profile(Stage::FirstYear, ExposureLevel::Coursework, &[]))
            .await
            .unwrap();

        assert_eq!(analysis.level, Level::Beginner);
        assert_eq!(analysis.progress_to_next_level, 20);
        assert_eq!(analysis.role, "Aspiring Software Developer");
    }

    #[test]
    fn test_progress_is_capped() {
        assert_eq!(progress_for(ExposureLevel::Professional, Stage::ThirdYear), 95);
        assert_eq!(progress_for(ExposureLevel::Professional, Stage::Graduate), 85);
    }

    #[test]
    fn test_role_keyword_order() {
        assert_eq!(infer_role(&["Web dev", "Backend APIs"], ExposureLevel::Coursework), "Aspiring Backend Developer");
        assert_eq!(infer_role(&[], ExposureLevel::Professional), "Software Engineer");
    }
}
