//! Replay a scripted sequence of events through the orchestrator.
//!
//! A script names users (profile plus initial skill snapshot) and an ordered
//! list of events. Events for one user run in script order; different users
//! run concurrently.

use anyhow::{anyhow, Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::models::{SynthesizedOutput, UserProfile};
use crate::orchestrator::Orchestrator;
use crate::pipeline::Step;
use crate::settings::Settings;
use crate::skills::SkillSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub job: JobMetadata,
    #[serde(default)]
    pub settings: BatchSettings,
    #[serde(default)]
    pub users: Vec<UserScript>,
    pub events: Vec<EventScript>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserScript {
    pub profile: UserProfile,
    #[serde(default)]
    pub skills: Option<SkillSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventScript {
    pub user: String,
    pub event: String,
    /// Replaces the user's snapshot from this event on.
    #[serde(default)]
    pub skills: Option<SkillSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_users: usize,
    pub output_file: Option<PathBuf>,
    /// Skip a user's remaining events after one fails.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_users: default_max_concurrent(),
            output_file: None,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Committed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    pub index: usize,
    pub user: String,
    pub event: String,
    pub status: EventStatus,
    pub failed_step: Option<Step>,
    pub error: Option<String>,
    pub output: Option<SynthesizedOutput>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub job_name: String,
    pub status: BatchStatus,
    pub total_events: usize,
    pub committed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub events: Vec<EventResult>,
}

/// Load, replay, summarise and optionally save a script.
#[instrument(skip(settings))]
pub async fn run(config_path: PathBuf, settings: Settings) -> Result<()> {
    info!("Starting replay from {:?}", config_path);

    let config = load_batch_config(&config_path).context("Failed to load batch script")?;
    let output_file = config.settings.output_file.clone();

    let orchestrator = Arc::new(Orchestrator::from_settings(&settings)?);
    let result = execute_batch(orchestrator, config).await?;

    print_batch_summary(&result);

    if let Some(ref path) = output_file {
        save_batch_results(&result, path).context("Failed to save batch results")?;
    }

    match result.status {
        BatchStatus::Success => Ok(()),
        BatchStatus::PartialSuccess => {
            warn!("Replay completed with some failures");
            Ok(())
        }
        BatchStatus::Failed => {
            error!("Replay failed");
            Err(anyhow!("All {} events failed", result.total_events))
        }
    }
}

pub fn load_batch_config(config_path: &Path) -> Result<BatchConfig> {
    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read script: {:?}", config_path))?;

    let config: BatchConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML script: {:?}", config_path))?;

    validate_batch_config(&config)?;
    Ok(config)
}

fn validate_batch_config(config: &BatchConfig) -> Result<()> {
    if config.events.is_empty() {
        return Err(anyhow!("Script must contain at least one event"));
    }
    if config.settings.max_concurrent_users == 0 {
        return Err(anyhow!("max_concurrent_users cannot be 0"));
    }

    let mut users = HashSet::new();
    for user in &config.users {
        if !users.insert(user.profile.user_id.as_str()) {
            return Err(anyhow!("Duplicate user: {}", user.profile.user_id));
        }
    }
    for event in &config.events {
        if !users.contains(event.user.as_str()) {
            return Err(anyhow!("Event for undeclared user: {}", event.user));
        }
    }
    Ok(())
}

pub async fn execute_batch(orchestrator: Arc<Orchestrator>, config: BatchConfig) -> Result<BatchResult> {
    let start_time = Instant::now();
    let total_events = config.events.len();
    let fail_fast = config.settings.fail_fast;

    let mut per_user: BTreeMap<String, Vec<(usize, EventScript)>> = BTreeMap::new();
    for (index, event) in config.events.into_iter().enumerate() {
        per_user.entry(event.user.clone()).or_default().push((index, event));
    }
    let mut users: BTreeMap<String, UserScript> = config
        .users
        .into_iter()
        .map(|u| (u.profile.user_id.clone(), u))
        .collect();

    let semaphore = Arc::new(tokio::sync::Semaphore::new(config.settings.max_concurrent_users));
    let mut handles = Vec::new();

    for (user_id, events) in per_user {
        let user = users
            .remove(&user_id)
            .ok_or_else(|| anyhow!("Event for undeclared user: {}", user_id))?;
        let permit = semaphore.clone().acquire_owned().await?;
        let orchestrator = orchestrator.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            replay_user(&orchestrator, user, events, fail_fast).await
        }));
    }

    let mut events: Vec<EventResult> = try_join_all(handles)
        .await
        .context("Replay task panicked")?
        .into_iter()
        .flatten()
        .collect();
    events.sort_by_key(|e| e.index);

    let count = |status| events.iter().filter(|e| e.status == status).count();
    let committed = count(EventStatus::Committed);
    let failed = count(EventStatus::Failed);
    let skipped = count(EventStatus::Skipped);

    let status = if failed == 0 && skipped == 0 {
        BatchStatus::Success
    } else if committed > 0 {
        BatchStatus::PartialSuccess
    } else {
        BatchStatus::Failed
    };

    Ok(BatchResult {
        job_name: config.job.name,
        status,
        total_events,
        committed,
        failed,
        skipped,
        total_duration_ms: start_time.elapsed().as_millis() as u64,
        events,
    })
}

async fn replay_user(
    orchestrator: &Orchestrator,
    user: UserScript,
    events: Vec<(usize, EventScript)>,
    fail_fast: bool,
) -> Vec<EventResult> {
    let UserScript { profile, mut skills } = user;
    let user_id = profile.user_id.clone();
    let mut results = Vec::with_capacity(events.len());
    let mut halted = false;

    for (index, script) in events {
        if script.skills.is_some() {
            skills = script.skills.clone();
        }

        if halted {
            results.push(EventResult {
                index,
                user: user_id.clone(),
                event: script.event,
                status: EventStatus::Skipped,
                failed_step: None,
                error: None,
                output: None,
                duration_ms: 0,
            });
            continue;
        }

        let started = Instant::now();
        let outcome = orchestrator
            .submit_event(&script.event, &user_id, Some(profile.clone()), skills.clone())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => EventResult {
                index,
                user: user_id.clone(),
                event: script.event,
                status: EventStatus::Committed,
                failed_step: None,
                error: None,
                output: Some(output),
                duration_ms,
            },
            Err(e) => {
                warn!(user_id = %user_id, event = %script.event, error = %e, "scripted event failed");
                halted = fail_fast;
                EventResult {
                    index,
                    user: user_id.clone(),
                    event: script.event,
                    status: EventStatus::Failed,
                    failed_step: e.failed_step(),
                    error: Some(e.to_string()),
                    output: None,
                    duration_ms,
                }
            }
        };
        results.push(result);
    }
    results
}

fn print_batch_summary(result: &BatchResult) {
    println!("\n=== Replay Summary ===");
    println!("Job: {}", result.job_name);
    println!("Status: {:?}", result.status);
    println!("Events: {}", result.total_events);
    println!("Committed: {}", result.committed);
    println!("Failed: {}", result.failed);
    println!("Skipped: {}", result.skipped);
    println!("Duration: {}ms", result.total_duration_ms);

    for event in &result.events {
        match (&event.status, &event.output) {
            (EventStatus::Committed, Some(output)) => {
                let role = output
                    .direction
                    .computed()
                    .map(|d| d.primary_role.as_str())
                    .unwrap_or("-");
                let focus = output
                    .immediate_focus
                    .as_ref()
                    .map(|f| f.skill.as_str())
                    .unwrap_or("-");
                println!(
                    "  #{} {} {} run={} direction={} focus={}",
                    event.index, event.user, event.event, output.run_sequence, role, focus
                );
            }
            (EventStatus::Failed, _) => {
                println!(
                    "  #{} {} {} FAILED: {}",
                    event.index,
                    event.user,
                    event.event,
                    event.error.as_deref().unwrap_or("Unknown error")
                );
            }
            _ => println!("  #{} {} {} skipped", event.index, event.user, event.event),
        }
    }
    println!("======================\n");
}

fn save_batch_results(result: &BatchResult, output_file: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize batch results")?;

    std::fs::write(output_file, json)
        .with_context(|| format!("Failed to write results to: {:?}", output_file))?;

    info!("Replay results saved to: {:?}", output_file);
    Ok(())
}

fn default_max_concurrent() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SCRIPT: &str = r#"
[job]
name = "two_users"

[settings]
fail_fast = true

[[users]]
skills = { python = "comfortable", git = "used_a_bit" }
[users.profile]
user_id = "asha"
name = "Asha"
stage = "third_year"
exposure = "small_projects"
weekly_time = "5-10"
interests = ["Machine Learning"]

[[users]]
[users.profile]
user_id = "ben"
name = "Ben"
stage = "first_year"
exposure = "coursework"
weekly_time = "<5"

[[events]]
user = "asha"
event = "onboarding_completed"

[[events]]
user = "ben"
event = "skill_updated"

[[events]]
user = "ben"
event = "check_in"

[[events]]
user = "asha"
event = "skill_updated"
skills = { python = "comfortable", statistics = "aware" }
"#;

    #[test]
    fn test_script_parses_and_validates() {
        let config: BatchConfig = toml::from_str(SCRIPT).unwrap();
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.events.len(), 4);
        assert!(config.settings.fail_fast);
        assert!(validate_batch_config(&config).is_ok());

        let mut bad = config.clone();
        bad.events[0].user = "carol".into();
        assert!(validate_batch_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_replay_with_fail_fast() {
        let config: BatchConfig = toml::from_str(SCRIPT).unwrap();
        let orchestrator = Arc::new(Orchestrator::from_settings(&Settings::default()).unwrap());

        let result = execute_batch(orchestrator.clone(), config).await.unwrap();

        let statuses: Vec<EventStatus> = result.events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                EventStatus::Committed,
                // ben has no snapshot
                EventStatus::Failed,
                EventStatus::Skipped,
                EventStatus::Committed,
            ]
        );
        assert_eq!(result.events[1].failed_step, Some(Step::Skill));
        assert_eq!(result.status, BatchStatus::PartialSuccess);

        let latest = orchestrator.get_cached("asha").await.unwrap();
        assert_eq!(latest.run_sequence, 2);
        assert!(orchestrator.get_cached("ben").await.is_err());
    }

    #[tokio::test]
    async fn test_results_are_saved_as_json() {
        let temp_dir = tempdir().unwrap();
        let script_path = temp_dir.path().join("script.toml");
        let output_path = temp_dir.path().join("results.json");
        fs::write(&script_path, SCRIPT).unwrap();

        let config = load_batch_config(&script_path).unwrap();
        let orchestrator = Arc::new(Orchestrator::from_settings(&Settings::default()).unwrap());
        let result = execute_batch(orchestrator, config).await.unwrap();
        save_batch_results(&result, &output_path).unwrap();

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(saved["job_name"], "two_users");
        assert_eq!(saved["events"].as_array().unwrap().len(), 4);
    }
}
