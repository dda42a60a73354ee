//! Learning resources and practice tasks attached to skills.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Course,
    Video,
    Article,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub title: String,
    pub link: String,
    pub level: String,
}

/// How to close a gap in a skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub practice: Vec<String>,
}

impl Remediation {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.practice.is_empty()
    }

    /// First practice task, the smallest concrete next step.
    pub fn next_task(&self) -> Option<&str> {
        self.practice.first().map(String::as_str)
    }
}
