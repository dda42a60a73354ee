//! The skill step: categorise a snapshot and resolve its gaps.

use serde::{Deserialize, Serialize};

use super::catalog::direction_skills;
use super::gaps::{pursued_skills, resolve_gaps, GapReport};
use super::{FoundationalSet, Skill, SkillGraph, SkillLevel, SkillSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGapAnalysis {
    /// Skills at `comfortable`.
    pub completed: Vec<Skill>,
    /// Skills at `used_a_bit`.
    pub in_progress: Vec<Skill>,
    /// Skills at `aware`.
    pub planned: Vec<Skill>,
    pub strengths: Vec<String>,
    pub gaps: GapReport,
    /// Direction whose target skills extended the pursued set, if any.
    pub target_direction: Option<String>,
}

impl SkillGapAnalysis {
    /// Whether this analysis was computed against `direction`.
    pub fn computed_for(&self, direction: Option<&str>) -> bool {
        self.target_direction.as_deref() == direction
    }
}

pub fn analyze_skills(
    snapshot: &SkillSnapshot,
    target_direction: Option<&str>,
    graph: &SkillGraph,
    foundational: &FoundationalSet,
) -> SkillGapAnalysis {
    let targets = target_direction
        .map(|d| direction_skills(d, graph))
        .unwrap_or_default();
    let pursued = pursued_skills(snapshot, targets);
    let gaps = resolve_gaps(snapshot, &pursued, graph, foundational);

    let completed = snapshot.skills_at(SkillLevel::Comfortable);
    let strengths = completed.iter().map(Skill::display_name).collect();

    SkillGapAnalysis {
        in_progress: snapshot.skills_at(SkillLevel::UsedABit),
        planned: snapshot.skills_at(SkillLevel::Aware),
        completed,
        strengths,
        gaps,
        target_direction: target_direction.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::catalog::builtin_graph;

    #[test]
    fn test_categorises_by_level() {
        let graph = builtin_graph().unwrap();
        let foundational = FoundationalSet::builtin(&graph).unwrap();
        let snapshot = SkillSnapshot::new()
            .with("python", SkillLevel::Comfortable)
            .with("git", SkillLevel::UsedABit)
            .with("statistics", SkillLevel::Aware);

        let analysis = analyze_skills(&snapshot, None, &graph, &foundational);

        assert_eq!(analysis.completed, vec![Skill::from("python")]);
        assert_eq!(analysis.in_progress, vec![Skill::from("git")]);
        assert_eq!(analysis.planned, vec![Skill::from("statistics")]);
        assert_eq!(analysis.strengths, vec!["Python".to_string()]);
        assert!(analysis.computed_for(None));
    }

    #[test]
    fn test_direction_extends_pursued_set() {
        let graph = builtin_graph().unwrap();
        let foundational = FoundationalSet::builtin(&graph).unwrap();
        let snapshot = SkillSnapshot::new().with("python", SkillLevel::Comfortable);

        let plain = analyze_skills(&snapshot, None, &graph, &foundational);
        let directed = analyze_skills(&snapshot, Some("Machine Learning Engineer"), &graph, &foundational);

        let has = |a: &SkillGapAnalysis, s: &str| a.gaps.blocking.iter().any(|g| g.skill.as_str() == s);
        assert!(!has(&plain, "linear_algebra"));
        assert!(has(&directed, "linear_algebra"));
        assert!(directed.computed_for(Some("Machine Learning Engineer")));
        assert!(!directed.computed_for(Some("Backend Developer")));
    }
}
