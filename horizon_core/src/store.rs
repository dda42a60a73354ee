//! Per-user result cache.
//!
//! Holds the last committed analyses and synthesized output for each user,
//! plus the run-sequence counter that orders concurrent runs. Commits are
//! serialized per user and rejected when a newer run already committed.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{CareerRecommendation, ProfileAnalysis, SynthesizedOutput};
use crate::skills::SkillGapAnalysis;

/// Everything cached for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserRecord {
    pub last_committed_run: u64,
    pub profile: Option<ProfileAnalysis>,
    pub skills: Option<SkillGapAnalysis>,
    pub career: Option<CareerRecommendation>,
    pub output: Option<SynthesizedOutput>,
}

/// The results of one successful run. `None` analyses leave the cached
/// value in place.
#[derive(Debug, Clone)]
pub struct CommitSet {
    pub profile: Option<ProfileAnalysis>,
    pub skills: Option<SkillGapAnalysis>,
    pub career: Option<CareerRecommendation>,
    pub output: SynthesizedOutput,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub commits: u64,
    pub rejected: u64,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Allocate the next run sequence for `user_id`. Strictly increasing.
    async fn begin_run(&self, user_id: &str) -> PipelineResult<u64>;

    /// Current record, or an empty one for unknown users.
    async fn load(&self, user_id: &str) -> PipelineResult<UserRecord>;

    /// Apply `changes` as a single write, unless a run with an equal or
    /// higher sequence has already committed.
    async fn commit(&self, user_id: &str, run: u64, changes: CommitSet) -> PipelineResult<()>;

    async fn stats(&self) -> StoreStats;
}

#[derive(Debug, Default)]
struct UserSlot {
    next_run: AtomicU64,
    record: Mutex<UserRecord>,
}

/// In-process store keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    slots: DashMap<String, Arc<UserSlot>>,
    commits: AtomicU64,
    rejected: AtomicU64,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> Arc<UserSlot> {
        if let Some(slot) = self.slots.get(user_id) {
            return slot.clone();
        }
        self.slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(UserSlot::default()))
            .clone()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    #[instrument(skip(self))]
    async fn begin_run(&self, user_id: &str) -> PipelineResult<u64> {
        let run = self.slot(user_id).next_run.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(run, "allocated run sequence");
        Ok(run)
    }

    async fn load(&self, user_id: &str) -> PipelineResult<UserRecord> {
        Ok(self
            .slots
            .get(user_id)
            .map(|slot| slot.record.lock().clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self, changes))]
    async fn commit(&self, user_id: &str, run: u64, changes: CommitSet) -> PipelineResult<()> {
        let slot = self.slot(user_id);
        let mut record = slot.record.lock();

        if run <= record.last_committed_run {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PipelineError::StaleRunRejected {
                user_id: user_id.to_string(),
                run,
                last_committed: record.last_committed_run,
            });
        }

        record.last_committed_run = run;
        if let Some(profile) = changes.profile {
            record.profile = Some(profile);
        }
        if let Some(skills) = changes.skills {
            record.skills = Some(skills);
        }
        if let Some(career) = changes.career {
            record.career = Some(career);
        }
        record.output = Some(changes.output);

        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!("commit applied");
        Ok(())
    }

    async fn stats(&self) -> StoreStats {
        StoreStats {
            users: self.slots.len(),
            commits: self.commits.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analysis;
    use crate::router::EventType;
    use chrono::Utc;

    fn output(user: &str, run: u64) -> SynthesizedOutput {
        SynthesizedOutput {
            user_id: user.to_string(),
            run_sequence: run,
            event: EventType::CheckIn,
            generated_at: Utc::now(),
            profile: Analysis::NotComputed,
            direction: Analysis::NotComputed,
            skills: Analysis::NotComputed,
            immediate_focus: None,
            insights: vec![],
            narrative: None,
            not_computed: vec![],
        }
    }

    fn commit_set(user: &str, run: u64) -> CommitSet {
        CommitSet {
            profile: None,
            skills: None,
            career: None,
            output: output(user, run),
        }
    }

    #[tokio::test]
    async fn test_run_sequences_are_per_user_and_increasing() {
        let store = InMemoryResultStore::new();
        assert_eq!(store.begin_run("a").await.unwrap(), 1);
        assert_eq!(store.begin_run("a").await.unwrap(), 2);
        assert_eq!(store.begin_run("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_older_commit_after_newer_is_rejected() {
        let store = InMemoryResultStore::new();
        let five = store.begin_run("u").await.unwrap() + 4;
        let six = five + 1;

        store.commit("u", six, commit_set("u", six)).await.unwrap();
        let err = store.commit("u", five, commit_set("u", five)).await.unwrap_err();

        assert_eq!(
            err,
            PipelineError::StaleRunRejected {
                user_id: "u".into(),
                run: 5,
                last_committed: 6,
            }
        );
        let record = store.load("u").await.unwrap();
        assert_eq!(record.last_committed_run, 6);
        assert_eq!(record.output.unwrap().run_sequence, 6);
        assert_eq!(store.stats().await.rejected, 1);
    }

    #[tokio::test]
    async fn test_absent_analyses_keep_cached_values() {
        let store = InMemoryResultStore::new();
        let career = CareerRecommendation {
            primary: crate::models::CareerMatch {
                role: "Backend Developer".into(),
                match_score: 40,
                reason: None,
                time_to_ready: None,
            },
            alternatives: vec![],
            market: None,
        };

        let mut first = commit_set("u", 1);
        first.career = Some(career.clone());
        store.commit("u", 1, first).await.unwrap();
        store.commit("u", 2, commit_set("u", 2)).await.unwrap();

        let record = store.load("u").await.unwrap();
        assert_eq!(record.career, Some(career));
        assert_eq!(record.output.unwrap().run_sequence, 2);
    }

    #[tokio::test]
    async fn test_unknown_user_loads_empty_record() {
        let store = InMemoryResultStore::new();
        assert_eq!(store.load("nobody").await.unwrap(), UserRecord::default());
        assert_eq!(store.stats().await.users, 0);
    }
}
