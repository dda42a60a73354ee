use async_trait::async_trait;

use super::{AnalysisResult, DirectionRecommender};
use crate::error::AnalysisError;
use crate::models::{
    Analysis, CareerMatch, CareerRecommendation, Level, MarketInsights, ProfileAnalysis,
};
use crate::skills::{SkillGapAnalysis, SkillLevel, SkillSnapshot};

struct Role {
    key: &'static str,
    title: &'static str,
    required: &'static [&'static str],
    helpful: &'static [&'static str],
    keywords: &'static [&'static str],
    demand_trend: &'static str,
    salary_range: &'static str,
    top_companies: &'static [&'static str],
    /// Beginner, intermediate, advanced.
    time_to_ready: [&'static str; 3],
}

const ROLES: &[Role] = &[
    Role {
        key: "ml_engineer",
        title: "Machine Learning Engineer",
        required: &["python", "machine_learning", "statistics", "linear_algebra"],
        helpful: &["deep_learning", "data_structures", "algorithms"],
        keywords: &["ml", "machine learning", "ai", "artificial intelligence", "deep learning"],
        demand_trend: "increasing",
        salary_range: "12-30 LPA",
        top_companies: &["Google", "Microsoft", "Amazon", "Meta", "Startups"],
        time_to_ready: ["18-24 months", "6-12 months", "Ready now"],
    },
    Role {
        key: "data_scientist",
        title: "Data Scientist",
        required: &["python", "statistics", "sql", "data_analysis"],
        helpful: &["machine_learning", "data_structures"],
        keywords: &["data", "analytics", "statistics", "insights"],
        demand_trend: "stable",
        salary_range: "10-25 LPA",
        top_companies: &["Amazon", "Flipkart", "Swiggy", "Analytics firms"],
        time_to_ready: ["12-18 months", "6-9 months", "Ready now"],
    },
    Role {
        key: "backend_developer",
        title: "Backend Developer",
        required: &["programming_basics", "databases", "backend_frameworks"],
        helpful: &["system_design", "docker", "cloud_services"],
        keywords: &["backend", "api", "server", "microservices"],
        demand_trend: "stable",
        salary_range: "8-20 LPA",
        top_companies: &["Product companies", "Startups", "Service companies"],
        time_to_ready: ["8-12 months", "3-6 months", "Ready now"],
    },
    Role {
        key: "frontend_developer",
        title: "Frontend Developer",
        required: &["html_css", "javascript", "react"],
        helpful: &["typescript", "frontend_frameworks"],
        keywords: &["frontend", "react", "ui", "ux", "web"],
        demand_trend: "stable",
        salary_range: "6-18 LPA",
        top_companies: &["Product companies", "Startups", "Agencies"],
        time_to_ready: ["6-10 months", "2-4 months", "Ready now"],
    },
    Role {
        key: "fullstack_developer",
        title: "Full Stack Developer",
        required: &["html_css", "javascript", "backend_frameworks", "databases"],
        helpful: &["react", "docker", "cloud_services"],
        keywords: &["fullstack", "full stack", "web development"],
        demand_trend: "increasing",
        salary_range: "8-22 LPA",
        top_companies: &["Startups", "Product companies"],
        time_to_ready: ["12-18 months", "6-9 months", "Ready now"],
    },
    Role {
        key: "devops_engineer",
        title: "DevOps Engineer",
        required: &["linux", "docker", "cloud_services", "git"],
        helpful: &["kubernetes", "networking", "devops"],
        keywords: &["devops", "cloud", "infrastructure", "ci/cd", "aws", "gcp"],
        demand_trend: "increasing",
        salary_range: "10-28 LPA",
        top_companies: &["Cloud companies", "Large enterprises", "Startups"],
        time_to_ready: ["12-15 months", "6-9 months", "Ready now"],
    },
];

const DEFAULT_ROLES: &[&str] = &["backend_developer", "fullstack_developer"];
const INTEREST_BOOST: u8 = 20;
const ALTERNATIVE_FLOOR: u8 = 30;
const MAX_ALTERNATIVES: usize = 3;

/// Scores a fixed role table against the snapshot and the user's stated
/// interests.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleDirectionRecommender;

#[async_trait]
impl DirectionRecommender for RuleDirectionRecommender {
    fn name(&self) -> &str {
        "rule_direction"
    }

    async fn recommend(
        &self,
        profile: &ProfileAnalysis,
        snapshot: &SkillSnapshot,
        skills: &Analysis<SkillGapAnalysis>,
    ) -> AnalysisResult<CareerRecommendation> {
        let interests = if profile.interests.is_empty() {
            &profile.goals
        } else {
            &profile.interests
        };
        let matched = interest_matches(interests, &profile.goals);

        let mut scored: Vec<(&Role, u8)> = Vec::new();
        for role in ROLES.iter().filter(|r| matched.contains(&r.key)) {
            scored.push((role, match_score(role, snapshot).saturating_add(INTEREST_BOOST).min(100)));
        }
        for role in ROLES.iter().filter(|r| !matched.contains(&r.key)) {
            let score = match_score(role, snapshot);
            if score >= ALTERNATIVE_FLOOR {
                scored.push((role, score));
            }
        }
        // stable: ties keep interest matches first, then table order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let Some(&(primary, primary_score)) = scored.first() else {
            // matched is never empty, so neither is scored
            return Err(AnalysisError::failed("no candidate roles"));
        };

        let mut reason = if interests.is_empty() {
            format!("Based on your interest in {}", profile.role)
        } else {
            let top: Vec<&str> = interests.iter().take(2).map(String::as_str).collect();
            format!("Based on your interest in {}", top.join(", "))
        };
        if let Some(gap) = skills.computed().and_then(|s| s.gaps.most_pressing()) {
            reason.push_str(&format!("; start with {}", gap.skill.display_name()));
        }

        let alternatives = scored
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(|(role, score)| CareerMatch {
                role: role.title.to_string(),
                match_score: *score,
                reason: Some("Matches your interest in related areas".to_string()),
                time_to_ready: None,
            })
            .collect();

        Ok(CareerRecommendation {
            primary: CareerMatch {
                role: primary.title.to_string(),
                match_score: primary_score,
                reason: Some(reason),
                time_to_ready: Some(time_to_ready(primary, profile.level).to_string()),
            },
            alternatives,
            market: Some(MarketInsights {
                demand_trend: primary.demand_trend.to_string(),
                salary_range: primary.salary_range.to_string(),
                top_companies: primary.top_companies.iter().map(|c| c.to_string()).collect(),
            }),
        })
    }
}

/// 0-100. Required skills weigh 70, helpful 30; `used_a_bit` earns half.
fn match_score(role: &Role, snapshot: &SkillSnapshot) -> u8 {
    fn part(skills: &[&str], weight: f64, snapshot: &SkillSnapshot) -> f64 {
        if skills.is_empty() {
            return 0.0;
        }
        let each = weight / skills.len() as f64;
        skills
            .iter()
            .map(|s| match snapshot.level(s) {
                Some(SkillLevel::Comfortable) => each,
                Some(SkillLevel::UsedABit) => each / 2.0,
                _ => 0.0,
            })
            .sum()
    }

    let score = part(role.required, 70.0, snapshot) + part(role.helpful, 30.0, snapshot);
    score.clamp(0.0, 100.0) as u8
}

fn interest_matches(interests: &[String], goals: &[String]) -> Vec<&'static str> {
    let text = interests
        .iter()
        .chain(goals.iter())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let matched: Vec<&'static str> = ROLES
        .iter()
        .filter(|r| r.keywords.iter().any(|kw| text.contains(kw)))
        .map(|r| r.key)
        .collect();

    if matched.is_empty() {
        DEFAULT_ROLES.to_vec()
    } else {
        matched
    }
}

fn time_to_ready(role: &Role, level: Level) -> &'static str {
    match level {
        Level::Beginner => role.time_to_ready[0],
        Level::Intermediate => role.time_to_ready[1],
        Level::Advanced => role.time_to_ready[2],
    }
}
