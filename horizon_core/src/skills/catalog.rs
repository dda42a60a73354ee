//! Built-in skill vocabulary and the versioned foundational set.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::ResourceKind::{self, Article, Course, Tool, Video};
use super::{Remediation, Resource, Skill, SkillGraph};
use crate::error::GraphConfigurationError;

/// Direct prerequisites for every skill in the built-in vocabulary.
const DEPENDENCIES: &[(&str, &[&str])] = &[
    // Programming fundamentals
    ("algorithms", &["data_structures", "programming_basics"]),
    ("data_structures", &["programming_basics"]),
    ("system_design", &["algorithms", "databases", "networking"]),
    // Web development
    ("frontend_frameworks", &["html_css", "javascript"]),
    ("backend_frameworks", &["programming_basics", "databases"]),
    ("javascript", &["html_css", "programming_basics"]),
    ("typescript", &["javascript"]),
    ("react", &["javascript", "html_css"]),
    ("nodejs", &["javascript"]),
    // Data & ML
    ("machine_learning", &["python", "statistics", "linear_algebra"]),
    ("deep_learning", &["machine_learning", "python"]),
    ("data_analysis", &["python", "statistics"]),
    ("statistics", &["math_basics"]),
    // Infrastructure
    ("databases", &["programming_basics"]),
    ("sql", &["databases"]),
    ("nosql", &["databases"]),
    ("devops", &["linux", "git", "networking"]),
    ("docker", &["linux", "git"]),
    ("kubernetes", &["docker", "networking"]),
    ("cloud_services", &["networking", "linux"]),
    // Roots
    ("programming_basics", &[]),
    ("python", &["programming_basics"]),
    ("java", &["programming_basics"]),
    ("html_css", &[]),
    ("git", &[]),
    ("linux", &[]),
    ("networking", &[]),
    ("math_basics", &[]),
    ("linear_algebra", &["math_basics"]),
];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("programming_basics", "Core programming concepts: variables, control flow, functions and objects."),
    ("data_structures", "Arrays, linked lists, trees and hash maps, and when to use each."),
    ("algorithms", "Sorting, searching, recursion and dynamic programming."),
    ("system_design", "Designing scalable distributed systems."),
    ("git", "Version control: branching, merging, rebasing and collaboration workflows."),
    ("databases", "Relational and NoSQL data modeling and query optimization."),
    ("sql", "Queries, joins, aggregations and indexing."),
    ("python", "Python for scripting, data processing and backend work."),
    ("javascript", "Modern JavaScript for interactive web applications."),
    ("machine_learning", "Supervised and unsupervised learning, model evaluation."),
    ("deep_learning", "Neural networks with frameworks such as PyTorch."),
    ("docker", "Containerizing applications for consistent environments."),
    ("linux", "Command line, processes and server configuration."),
    ("statistics", "Probability, distributions and hypothesis testing."),
    ("linear_algebra", "Vectors, matrices and linear transformations."),
    ("html_css", "Structuring and styling web pages."),
    ("react", "Component-based UIs with state and hooks."),
    ("nodejs", "Server-side JavaScript applications and APIs."),
    ("networking", "TCP/IP, HTTP, DNS and how the internet works."),
    ("cloud_services", "Deploying and operating on AWS, GCP or Azure."),
    ("devops", "CI/CD pipelines, infrastructure as code and monitoring."),
    ("kubernetes", "Orchestrating containers at scale."),
    ("data_analysis", "Cleaning, exploring and visualizing data."),
];

type ResourceRow = (ResourceKind, &'static str, &'static str, &'static str);

/// Curated (kind, title, link, level) per skill.
const RESOURCES: &[(&str, &[ResourceRow])] = &[
    ("programming_basics", &[
        (Course, "CS50: Introduction to Computer Science", "https://cs50.harvard.edu", "Beginner"),
        (Course, "freeCodeCamp - JavaScript Algorithms", "https://freecodecamp.org", "Beginner"),
    ]),
    ("python", &[
        (Course, "Python for Everybody", "https://coursera.org/specializations/python", "Beginner"),
        (Video, "Corey Schafer Python Tutorials", "https://youtube.com/@coreyms", "Beginner"),
    ]),
    ("data_structures", &[
        (Course, "NeetCode - Data Structures", "https://neetcode.io", "Intermediate"),
        (Article, "VisuAlgo", "https://visualgo.net", "Beginner"),
    ]),
    ("algorithms", &[
        (Course, "Algorithms, Part I (Princeton)", "https://coursera.org/learn/algorithms-part1", "Intermediate"),
        (Tool, "LeetCode", "https://leetcode.com", "Intermediate"),
    ]),
    ("git", &[
        (Course, "Learn Git Branching", "https://learngitbranching.js.org", "Beginner"),
        (Article, "Pro Git", "https://git-scm.com/book", "Beginner"),
    ]),
    ("machine_learning", &[
        (Course, "Machine Learning Specialization", "https://coursera.org/learn/machine-learning", "Intermediate"),
        (Course, "fast.ai - Practical Deep Learning", "https://fast.ai", "Intermediate"),
    ]),
    ("linear_algebra", &[
        (Video, "3Blue1Brown - Essence of Linear Algebra", "https://youtube.com/@3blue1brown", "Beginner"),
        (Course, "Khan Academy - Linear Algebra", "https://khanacademy.org/math/linear-algebra", "Beginner"),
    ]),
    ("statistics", &[
        (Course, "Khan Academy - Statistics and Probability", "https://khanacademy.org/math/statistics-probability", "Beginner"),
        (Video, "StatQuest", "https://youtube.com/@statquest", "Beginner"),
    ]),
    ("databases", &[
        (Course, "SQLBolt", "https://sqlbolt.com", "Beginner"),
        (Video, "Database Design (freeCodeCamp)", "https://youtube.com/watch?v=ztHopE5Wnpc", "Beginner"),
    ]),
    ("sql", &[
        (Course, "SQLZoo", "https://sqlzoo.net", "Beginner"),
        (Tool, "Mode SQL Tutorial", "https://mode.com/sql-tutorial", "Intermediate"),
    ]),
    ("docker", &[
        (Video, "Docker for Beginners (freeCodeCamp)", "https://youtube.com/watch?v=fqMOX6JJhGo", "Beginner"),
        (Article, "Docker: Get Started", "https://docs.docker.com/get-started", "Beginner"),
    ]),
    ("linux", &[
        (Course, "Linux Journey", "https://linuxjourney.com", "Beginner"),
        (Tool, "OverTheWire: Bandit", "https://overthewire.org/wargames/bandit", "Beginner"),
    ]),
];

/// Practice tasks, easiest first.
const PRACTICE: &[(&str, &[&str])] = &[
    ("programming_basics", &[
        "Solve ten easy LeetCode problems",
        "Build a command-line calculator",
        "Finish five Codewars katas",
    ]),
    ("python", &[
        "Automate a repetitive task with a script",
        "Write a small web scraper",
        "Expose a REST API with Flask or FastAPI",
    ]),
    ("data_structures", &[
        "Implement a linked list from scratch",
        "Solve twenty array and hashing problems",
        "Build an LRU cache",
    ]),
    ("algorithms", &[
        "Implement binary search and its variations",
        "Work through a graph traversal problem set",
        "Solve thirty medium problems across categories",
    ]),
    ("git", &[
        "Branch and merge on a sample repository",
        "Create and resolve a merge conflict",
        "Set up a CI workflow on GitHub Actions",
    ]),
    ("machine_learning", &[
        "Train a classifier on the Titanic dataset",
        "Build an end-to-end scikit-learn pipeline",
        "Enter a Kaggle competition",
    ]),
    ("linear_algebra", &[
        "Implement matrix multiplication from scratch",
        "Visualize 2D vector transformations",
        "Solve linear systems with NumPy",
    ]),
    ("statistics", &[
        "Analyze a dataset and write up the findings",
        "Run a hypothesis test on real data",
        "Compute confidence intervals by hand",
    ]),
    ("databases", &[
        "Design a schema for an online shop",
        "Normalize a flat dataset to third normal form",
        "Run PostgreSQL locally and query it",
    ]),
    ("sql", &[
        "Solve twenty SQL problems on HackerRank",
        "Write joins across three or more tables",
        "Speed up a slow query using EXPLAIN",
    ]),
    ("docker", &[
        "Containerize an existing project",
        "Compose a multi-container setup",
        "Deploy a container to a cloud service",
    ]),
    ("linux", &[
        "Set up a Linux VM and connect over SSH",
        "Write five bash automation scripts",
        "Manage a service with systemd",
    ]),
];

pub const FOUNDATIONAL_VERSION: &str = "foundations-v1";
const FOUNDATIONAL: &[&str] = &["git", "linux", "programming_basics"];

/// Keyword to target skills. First keyword found as whole words wins.
const DIRECTION_SKILLS: &[(&str, &[&str])] = &[
    ("backend", &["backend_frameworks", "databases", "system_design"]),
    ("frontend", &["frontend_frameworks", "react", "typescript"]),
    ("fullstack", &["frontend_frameworks", "backend_frameworks", "databases"]),
    ("full stack", &["frontend_frameworks", "backend_frameworks", "databases"]),
    ("machine learning", &["machine_learning", "deep_learning", "python", "statistics"]),
    ("ml", &["machine_learning", "deep_learning", "python"]),
    ("data", &["data_analysis", "machine_learning", "sql"]),
    ("devops", &["devops", "docker", "kubernetes", "cloud_services"]),
    ("software", &["algorithms", "system_design", "databases"]),
];

/// The built-in prerequisite graph with descriptions and remediation.
pub fn builtin_graph() -> Result<SkillGraph, GraphConfigurationError> {
    SkillGraph::from_dependencies(
        DEPENDENCIES
            .iter()
            .map(|(skill, prereqs)| (*skill, prereqs.to_vec())),
    )?
    .with_descriptions(DESCRIPTIONS.iter().copied())?
    .with_remediation(builtin_remediation())
}

fn builtin_remediation() -> BTreeMap<&'static str, Remediation> {
    let mut out: BTreeMap<&'static str, Remediation> = BTreeMap::new();
    for (skill, rows) in RESOURCES {
        out.entry(*skill).or_default().resources = rows
            .iter()
            .map(|(kind, title, link, level)| Resource {
                kind: *kind,
                title: title.to_string(),
                link: link.to_string(),
                level: level.to_string(),
            })
            .collect();
    }
    for (skill, tasks) in PRACTICE {
        out.entry(*skill).or_default().practice = tasks.iter().map(|t| t.to_string()).collect();
    }
    out
}

/// Skills conventionally expected of everyone, reported as helpful gaps when
/// absent. Membership is configuration and carries an explicit version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundationalSet {
    version: String,
    skills: BTreeSet<Skill>,
}

impl FoundationalSet {
    pub fn new<I, S>(
        version: impl Into<String>,
        skills: I,
        graph: &SkillGraph,
    ) -> Result<Self, GraphConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let skills: BTreeSet<Skill> = skills.into_iter().map(|s| Skill::new(s)).collect();

        if let Some(unknown) = skills.iter().find(|s| !graph.contains(s.as_str())) {
            return Err(GraphConfigurationError::UnknownSkill {
                context: "foundational set",
                skill: unknown.to_string(),
            });
        }

        Ok(Self {
            version: version.into(),
            skills,
        })
    }

    pub fn builtin(graph: &SkillGraph) -> Result<Self, GraphConfigurationError> {
        Self::new(FOUNDATIONAL_VERSION, FOUNDATIONAL.iter().copied(), graph)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn skills(&self) -> &BTreeSet<Skill> {
        &self.skills
    }
}

/// Target skills implied by a free-text career direction, restricted to the
/// graph's vocabulary. Empty when nothing matches.
pub fn direction_skills(direction: &str, graph: &SkillGraph) -> BTreeSet<Skill> {
    let direction = direction.to_lowercase();
    let words: Vec<&str> = direction
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    DIRECTION_SKILLS
        .iter()
        .find(|(keyword, _)| mentions(&words, keyword))
        .map(|(_, skills)| skills.iter().filter_map(|s| graph.skill(s)).collect())
        .unwrap_or_default()
}

fn mentions(words: &[&str], keyword: &str) -> bool {
    let phrase: Vec<&str> = keyword.split(' ').collect();
    words.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_graph_is_valid() {
        let graph = builtin_graph().unwrap();
        assert_eq!(graph.len(), DEPENDENCIES.len());
        assert!(graph.describe("git").is_some());
        assert_eq!(
            graph.remediation("linear_algebra").and_then(|r| r.next_task()),
            Some("Implement matrix multiplication from scratch")
        );
        assert!(graph.remediation("kubernetes").is_none());

        let closure = graph.transitive_closure("deep_learning");
        for expected in ["machine_learning", "python", "statistics", "math_basics", "programming_basics"] {
            assert!(closure.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_builtin_foundational_set() {
        let graph = builtin_graph().unwrap();
        let set = FoundationalSet::builtin(&graph).unwrap();
        assert_eq!(set.version(), FOUNDATIONAL_VERSION);
        assert!(set.skills().contains("git"));
    }

    #[test]
    fn test_foundational_set_rejects_unknown_skill() {
        let graph = builtin_graph().unwrap();
        let err = FoundationalSet::new("v0", ["git", "typing"], &graph).unwrap_err();
        assert_eq!(
            err,
            GraphConfigurationError::UnknownSkill {
                context: "foundational set",
                skill: "typing".to_string(),
            }
        );
    }

    #[test]
    fn test_direction_skills() {
        let graph = builtin_graph().unwrap();

        let ml = direction_skills("Machine Learning Engineer", &graph);
        assert!(ml.contains("statistics"));

        let backend = direction_skills("Backend Developer", &graph);
        assert!(backend.contains("system_design"));

        assert!(direction_skills("Pastry Chef", &graph).is_empty());
    }

    #[test]
    fn test_direction_keywords_match_whole_words() {
        let graph = builtin_graph().unwrap();

        assert!(direction_skills("HTML Email Developer", &graph).is_empty());
        assert!(direction_skills("ML Engineer", &graph).contains("machine_learning"));
        assert!(direction_skills("Full Stack Developer", &graph).contains("backend_frameworks"));
        assert!(direction_skills("data-platform engineer", &graph).contains("sql"));
    }
}
