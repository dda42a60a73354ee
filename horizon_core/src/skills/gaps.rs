//! Blocking / helpful gap resolution.
//!
//! A pure function of (snapshot, pursued set, graph, foundational set). All
//! intermediate collections are ordered, so identical inputs always produce
//! identical reports regardless of how the caller built them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{FoundationalSet, Remediation, Skill, SkillGraph, SkillSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Blocking,
    Helpful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub skill: Skill,
    pub kind: GapKind,
    pub rationale: String,
    pub impact: Impact,
    /// Pursued skills this gap blocks. Empty for helpful gaps.
    pub blocks: BTreeSet<Skill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
}

/// Gaps partitioned by kind, each list ordered by skill identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub blocking: Vec<Gap>,
    pub helpful: Vec<Gap>,
}

impl GapReport {
    pub fn is_empty(&self) -> bool {
        self.blocking.is_empty() && self.helpful.is_empty()
    }

    /// Highest-impact blocking gap, falling back to the first helpful one.
    pub fn most_pressing(&self) -> Option<&Gap> {
        self.blocking
            .iter()
            .max_by(|a, b| a.impact.cmp(&b.impact).then_with(|| b.skill.cmp(&a.skill)))
            .or_else(|| self.helpful.first())
    }
}

/// Skills present in the snapshot at any level, plus any target skills named
/// by a direction.
pub fn pursued_skills(
    snapshot: &SkillSnapshot,
    direction_targets: impl IntoIterator<Item = Skill>,
) -> BTreeSet<Skill> {
    snapshot
        .iter()
        .map(|(skill, _)| skill.clone())
        .chain(direction_targets)
        .collect()
}

struct Blocker {
    nearest: (usize, Skill),
    blocks: BTreeSet<Skill>,
}

pub fn resolve_gaps(
    snapshot: &SkillSnapshot,
    pursued: &BTreeSet<Skill>,
    graph: &SkillGraph,
    foundational: &FoundationalSet,
) -> GapReport {
    let mut blockers: BTreeMap<Skill, Blocker> = BTreeMap::new();

    for target in pursued {
        for (prereq, depth) in graph.depths_from(target.as_str()) {
            if snapshot.contains(prereq.as_str()) {
                continue;
            }

            let candidate = (*depth, target.clone());
            blockers
                .entry(prereq.clone())
                .and_modify(|b| {
                    b.blocks.insert(target.clone());
                    if candidate < b.nearest {
                        b.nearest = candidate.clone();
                    }
                })
                .or_insert_with(|| Blocker {
                    nearest: candidate.clone(),
                    blocks: BTreeSet::from([target.clone()]),
                });
        }
    }

    let blocking: Vec<Gap> = blockers
        .into_iter()
        .map(|(skill, blocker)| {
            let rationale = blocking_rationale(&skill, &blocker, graph);
            Gap {
                impact: if blocker.blocks.len() >= 2 {
                    Impact::High
                } else {
                    Impact::Medium
                },
                kind: GapKind::Blocking,
                rationale,
                blocks: blocker.blocks,
                remediation: graph.remediation(skill.as_str()).cloned(),
                skill,
            }
        })
        .collect();

    let helpful = foundational
        .skills()
        .iter()
        .filter(|s| !snapshot.contains(s.as_str()))
        .filter(|s| !pursued.contains(*s))
        .filter(|s| blocking.binary_search_by(|g| g.skill.cmp(*s)).is_err())
        .map(|skill| Gap {
            skill: skill.clone(),
            kind: GapKind::Helpful,
            rationale: helpful_rationale(skill, foundational, graph),
            impact: Impact::Low,
            blocks: BTreeSet::new(),
            remediation: graph.remediation(skill.as_str()).cloned(),
        })
        .collect();

    GapReport { blocking, helpful }
}

fn blocking_rationale(skill: &Skill, blocker: &Blocker, graph: &SkillGraph) -> String {
    let (depth, nearest) = &blocker.nearest;
    let mut text = if *depth == 1 {
        format!("Direct prerequisite of {nearest}")
    } else {
        format!("Prerequisite of {nearest} ({depth} steps down)")
    };

    let others: Vec<&str> = blocker
        .blocks
        .iter()
        .filter(|s| *s != nearest)
        .map(Skill::as_str)
        .collect();
    if !others.is_empty() {
        text.push_str(&format!("; also blocks {}", others.join(", ")));
    }

    if let Some(description) = graph.describe(skill.as_str()) {
        text.push_str(". ");
        text.push_str(description);
    }
    text
}

fn helpful_rationale(skill: &Skill, foundational: &FoundationalSet, graph: &SkillGraph) -> String {
    let mut text = format!("Foundational skill ({})", foundational.version());
    if let Some(description) = graph.describe(skill.as_str()) {
        text.push_str(". ");
        text.push_str(description);
    }
    text
}
