//! Command-line interface definitions using clap derive API.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::router::route_name;
use crate::settings::Settings;
use crate::skills::{analyze_skills, pursued_skills, resolve_gaps, Gap, Skill, SkillSnapshot};

/// Career pipeline tools
#[derive(Parser)]
#[command(name = "horizon-cli")]
#[command(about = "Skill-gap analysis and career pipeline runner")]
#[command(version)]
pub struct Cli {
    /// Configuration file used instead of ./horizon.toml
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the skill graph and show a skill's prerequisites
    Graph {
        /// Skill to inspect; prints a summary when omitted
        skill: Option<String>,
    },
    /// Show the execution plan for an event type
    Plan {
        event: String,
    },
    /// Resolve gaps for a snapshot file (TOML `skill = "level"` pairs)
    Gaps {
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Extra skills to treat as pursued
        #[arg(long, num_args = 1..)]
        pursue: Vec<String>,
        /// Career direction whose target skills are pursued
        #[arg(long, conflicts_with = "pursue")]
        direction: Option<String>,
    },
    /// Replay a scripted batch of events
    Run {
        /// Path to the batch script
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn describe_graph(settings: &Settings, skill: Option<&str>) -> Result<String> {
    let (graph, foundational) = settings.skill_graph.load()?;
    let mut out = String::new();

    match skill {
        None => {
            writeln!(out, "{} skills, acyclic", graph.len())?;
            let names: Vec<&str> = foundational.skills().iter().map(Skill::as_str).collect();
            writeln!(out, "foundational ({}): {}", foundational.version(), names.join(", "))?;
        }
        Some(name) => {
            if !graph.contains(name) {
                return Err(anyhow!("Unknown skill '{}'", name));
            }
            if let Some(description) = graph.describe(name) {
                writeln!(out, "{name}: {description}")?;
            }
            let direct: Vec<&str> = graph.prerequisites_of(name).iter().map(Skill::as_str).collect();
            writeln!(out, "direct: {}", direct.join(", "))?;
            for (prereq, depth) in graph.depths_from(name) {
                writeln!(out, "  {prereq} (depth {depth})")?;
            }
        }
    }
    Ok(out)
}

pub fn describe_plan(event: &str) -> Result<String> {
    let plan = route_name(event)?;
    Ok(format!("{event}: {plan}\n"))
}

pub fn load_snapshot(path: &Path) -> Result<SkillSnapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse snapshot: {:?}", path))
}

pub fn describe_gaps(
    settings: &Settings,
    snapshot: &Path,
    pursue: &[String],
    direction: Option<&str>,
) -> Result<String> {
    let (graph, foundational) = settings.skill_graph.load()?;
    let snapshot = load_snapshot(snapshot)?;

    let report = match direction {
        Some(direction) => analyze_skills(&snapshot, Some(direction), &graph, &foundational).gaps,
        None => {
            let extra = pursue
                .iter()
                .map(|s| graph.skill(s).ok_or_else(|| anyhow!("Unknown skill '{}'", s)))
                .collect::<Result<Vec<_>>>()?;
            resolve_gaps(&snapshot, &pursued_skills(&snapshot, extra), &graph, &foundational)
        }
    };

    let mut out = String::new();
    writeln!(out, "blocking:")?;
    for gap in &report.blocking {
        writeln!(out, "  {} [{:?}] {}", gap.skill, gap.impact, gap.rationale)?;
        write_remediation(&mut out, gap)?;
    }
    writeln!(out, "helpful:")?;
    for gap in &report.helpful {
        writeln!(out, "  {} {}", gap.skill, gap.rationale)?;
        write_remediation(&mut out, gap)?;
    }
    Ok(out)
}

fn write_remediation(out: &mut String, gap: &Gap) -> std::fmt::Result {
    let Some(remediation) = &gap.remediation else {
        return Ok(());
    };
    if let Some(task) = remediation.next_task() {
        writeln!(out, "    practice: {task}")?;
    }
    if let Some(resource) = remediation.resources.first() {
        writeln!(out, "    resource: {} <{}>", resource.title, resource.link)?;
    }
    Ok(())
}
