//! Static prerequisite DAG over the skill vocabulary.
//!
//! The graph is validated once at construction (referential integrity and
//! acyclicity) and every transitive closure is computed eagerly, so lookups
//! afterwards are plain map reads.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, instrument};

use super::{Remediation, Skill};
use crate::error::GraphConfigurationError;

static NO_SKILLS: BTreeSet<Skill> = BTreeSet::new();
static NO_DEPTHS: BTreeMap<Skill, usize> = BTreeMap::new();

#[derive(Debug, Clone)]
pub struct SkillGraph {
    prerequisites: BTreeMap<Skill, BTreeSet<Skill>>,
    closures: HashMap<Skill, BTreeSet<Skill>>,
    depths: HashMap<Skill, BTreeMap<Skill, usize>>,
    descriptions: BTreeMap<Skill, String>,
    remediation: BTreeMap<Skill, Remediation>,
}

/// On-disk form: `[skills]` maps each skill to its direct prerequisites.
/// `[descriptions]` and `[remediation.<skill>]` are optional.
#[derive(Debug, Deserialize)]
struct GraphFile {
    skills: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    descriptions: BTreeMap<String, String>,
    #[serde(default)]
    remediation: BTreeMap<String, Remediation>,
}

impl SkillGraph {
    /// Build and validate a graph from `(skill, direct prerequisites)` pairs.
    #[instrument(skip(dependencies))]
    pub fn from_dependencies<I, S, P>(dependencies: I) -> Result<Self, GraphConfigurationError>
    where
        I: IntoIterator<Item = (S, Vec<P>)>,
        S: Into<String>,
        P: Into<String>,
    {
        let mut prerequisites: BTreeMap<Skill, BTreeSet<Skill>> = BTreeMap::new();
        for (skill, prereqs) in dependencies {
            let skill = Skill::new(skill);
            if prerequisites.contains_key(&skill) {
                return Err(GraphConfigurationError::DuplicateSkill(skill.to_string()));
            }
            prerequisites.insert(skill, prereqs.into_iter().map(|p| Skill::new(p)).collect());
        }

        if prerequisites.is_empty() {
            return Err(GraphConfigurationError::Empty);
        }

        for (skill, prereqs) in &prerequisites {
            if let Some(missing) = prereqs.iter().find(|p| !prerequisites.contains_key(*p)) {
                return Err(GraphConfigurationError::DanglingPrerequisite {
                    skill: skill.to_string(),
                    prerequisite: missing.to_string(),
                });
            }
        }

        if let Some(path) = detect_cycle(&prerequisites) {
            return Err(GraphConfigurationError::Cycle { path });
        }

        let mut closures = HashMap::with_capacity(prerequisites.len());
        for skill in prerequisites.keys() {
            collect_closure(skill, &prerequisites, &mut closures);
        }

        let depths = prerequisites
            .keys()
            .map(|skill| (skill.clone(), shortest_depths(skill, &prerequisites)))
            .collect();

        debug!(skills = prerequisites.len(), "Skill graph validated");

        Ok(Self {
            prerequisites,
            closures,
            depths,
            descriptions: BTreeMap::new(),
            remediation: BTreeMap::new(),
        })
    }

    /// Parse a TOML graph definition.
    pub fn from_toml_str(contents: &str) -> Result<Self, GraphConfigurationError> {
        let file: GraphFile =
            toml::from_str(contents).map_err(|e| GraphConfigurationError::Parse(e.to_string()))?;

        Self::from_dependencies(file.skills)?
            .with_descriptions(file.descriptions)?
            .with_remediation(file.remediation)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, GraphConfigurationError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GraphConfigurationError::Parse(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Attach human-readable descriptions. Every described skill must exist.
    pub fn with_descriptions<I, S, D>(mut self, descriptions: I) -> Result<Self, GraphConfigurationError>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        for (skill, text) in descriptions {
            let skill = Skill::new(skill);
            if !self.contains(skill.as_str()) {
                return Err(GraphConfigurationError::UnknownSkill {
                    context: "skill descriptions",
                    skill: skill.to_string(),
                });
            }
            self.descriptions.insert(skill, text.into());
        }
        Ok(self)
    }

    /// Attach resources and practice tasks. Every listed skill must exist.
    pub fn with_remediation<I, S>(mut self, remediation: I) -> Result<Self, GraphConfigurationError>
    where
        I: IntoIterator<Item = (S, Remediation)>,
        S: Into<String>,
    {
        for (skill, entry) in remediation {
            let skill = Skill::new(skill);
            if !self.contains(skill.as_str()) {
                return Err(GraphConfigurationError::UnknownSkill {
                    context: "skill remediation",
                    skill: skill.to_string(),
                });
            }
            if !entry.is_empty() {
                self.remediation.insert(skill, entry);
            }
        }
        Ok(self)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.prerequisites.contains_key(skill)
    }

    /// Look a name up in the vocabulary.
    pub fn skill(&self, name: &str) -> Option<Skill> {
        self.prerequisites.get_key_value(name).map(|(s, _)| s.clone())
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.prerequisites.keys()
    }

    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    /// Direct prerequisites only. Unknown skills have none.
    pub fn prerequisites_of(&self, skill: &str) -> &BTreeSet<Skill> {
        self.prerequisites.get(skill).unwrap_or(&NO_SKILLS)
    }

    /// Every ancestor of `skill`, excluding the skill itself.
    pub fn transitive_closure(&self, skill: &str) -> &BTreeSet<Skill> {
        self.closures.get(skill).unwrap_or(&NO_SKILLS)
    }

    /// Shortest edge count from `skill` to each of its ancestors.
    pub fn depths_from(&self, skill: &str) -> &BTreeMap<Skill, usize> {
        self.depths.get(skill).unwrap_or(&NO_DEPTHS)
    }

    pub fn describe(&self, skill: &str) -> Option<&str> {
        self.descriptions.get(skill).map(String::as_str)
    }

    pub fn remediation(&self, skill: &str) -> Option<&Remediation> {
        self.remediation.get(skill)
    }
}

/// DFS with a recursion stack. Returns the cycle as a closed path
/// (`a -> b -> a`) when one exists.
fn detect_cycle(graph: &BTreeMap<Skill, BTreeSet<Skill>>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in graph.keys() {
        if dfs_cycle(node, graph, &mut visited, &mut rec_stack, &mut path) {
            let repeated = *path.last()?;
            let start = path.iter().position(|s| *s == repeated).unwrap_or(0);
            return Some(path[start..].iter().map(ToString::to_string).collect());
        }
    }

    None
}

fn dfs_cycle<'a>(
    node: &'a Skill,
    graph: &'a BTreeMap<Skill, BTreeSet<Skill>>,
    visited: &mut HashSet<&'a Skill>,
    rec_stack: &mut HashSet<&'a Skill>,
    path: &mut Vec<&'a Skill>,
) -> bool {
    if rec_stack.contains(node) {
        path.push(node);
        return true;
    }

    if !visited.insert(node) {
        return false;
    }

    rec_stack.insert(node);
    path.push(node);

    if let Some(deps) = graph.get(node) {
        for dep in deps {
            if dfs_cycle(dep, graph, visited, rec_stack, path) {
                return true;
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    false
}

/// Memoized closure. Only called on a graph already proven acyclic.
fn collect_closure(
    skill: &Skill,
    graph: &BTreeMap<Skill, BTreeSet<Skill>>,
    memo: &mut HashMap<Skill, BTreeSet<Skill>>,
) -> BTreeSet<Skill> {
    if let Some(done) = memo.get(skill) {
        return done.clone();
    }

    let mut closure = BTreeSet::new();
    for prereq in graph.get(skill).unwrap_or(&NO_SKILLS) {
        closure.insert(prereq.clone());
        closure.extend(collect_closure(prereq, graph, memo));
    }

    memo.insert(skill.clone(), closure.clone());
    closure
}

fn shortest_depths(
    skill: &Skill,
    graph: &BTreeMap<Skill, BTreeSet<Skill>>,
) -> BTreeMap<Skill, usize> {
    let mut depths = BTreeMap::new();
    let mut queue = VecDeque::from([(skill, 0usize)]);

    while let Some((current, depth)) = queue.pop_front() {
        for prereq in graph.get(current).unwrap_or(&NO_SKILLS) {
            if prereq != skill && !depths.contains_key(prereq) {
                depths.insert(prereq.clone(), depth + 1);
                queue.push_back((prereq, depth + 1));
            }
        }
    }

    depths
}
