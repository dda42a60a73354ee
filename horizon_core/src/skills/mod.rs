//! Skill vocabulary, prerequisite graph and gap resolution.

pub mod analysis;
pub mod catalog;
pub mod gaps;
pub mod graph;
pub mod remediation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use analysis::{analyze_skills, SkillGapAnalysis};
pub use catalog::FoundationalSet;
pub use gaps::{pursued_skills, resolve_gaps, Gap, GapKind, GapReport, Impact};
pub use graph::SkillGraph;
pub use remediation::{Remediation, Resource, ResourceKind};

/// Identifier from the closed skill vocabulary, e.g. `python`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skill(String);

impl Skill {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `machine_learning` -> `Machine Learning`
    pub fn display_name(&self) -> String {
        self.0
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Skill {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::borrow::Borrow<str> for Skill {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Self-reported mastery, ordered `Aware < UsedABit < Comfortable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Aware,
    UsedABit,
    Comfortable,
}

/// One user's skills at a point in time. Owned by the skill-tracking
/// collaborator; the core only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSnapshot {
    skills: BTreeMap<Skill, SkillLevel>,
}

impl SkillSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, skill: impl Into<Skill>, level: SkillLevel) -> Self {
        self.insert(skill, level);
        self
    }

    pub fn insert(&mut self, skill: impl Into<Skill>, level: SkillLevel) {
        self.skills.insert(skill.into(), level);
    }

    pub fn level(&self, skill: &str) -> Option<SkillLevel> {
        self.skills.get(skill).copied()
    }

    /// Presence at any level satisfies a prerequisite edge.
    pub fn contains(&self, skill: &str) -> bool {
        self.skills.contains_key(skill)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Skill, SkillLevel)> {
        self.skills.iter().map(|(s, l)| (s, *l))
    }

    pub fn skills_at(&self, level: SkillLevel) -> Vec<Skill> {
        self.iter()
            .filter(|(_, l)| *l == level)
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl<S: Into<Skill>> FromIterator<(S, SkillLevel)> for SkillSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, SkillLevel)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (skill, level) in iter {
            snapshot.insert(skill, level);
        }
        snapshot
    }
}
