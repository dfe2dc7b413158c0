//! Durable job records.
//!
//! [`JobStore`] is the only mutable shared resource in the service: a
//! file-backed JSON document store holding one [`Job`] per submission. Every
//! mutating call persists before returning, so a crash leaves the store
//! consistent with the call either having happened or not.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tracks the lifecycle status of a job.
///
/// Transitions exactly once: `Pending → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One tracked analysis request from submission to terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub query: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Aggregated stage outputs; present iff status is `completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure reason; present iff status is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Opaque annotations, e.g. the original upload filename.
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("duplicate job id: {0}")]
    Duplicate(String),

    #[error("failed to persist job store: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode job store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// In-memory job map with write-through JSON persistence.
///
/// Safe for concurrent `create`/`update`/`get`/`list` from multiple in-flight
/// pipelines. The orchestrator guarantees at most one terminal update per id;
/// a duplicate terminal update is treated as an idempotent no-op anyway.
pub struct JobStore {
    path: Option<PathBuf>,
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    /// Purely in-memory store (tests, ephemeral deployments).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// File-backed store. Existing records at `path` are loaded; a missing
    /// file starts empty.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let jobs = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let list: Vec<Job> = serde_json::from_str(&data)?;
            list.into_iter().map(|j| (j.id.clone(), j)).collect()
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            HashMap::new()
        };
        Ok(Self {
            path: Some(path),
            jobs: RwLock::new(jobs),
        })
    }

    /// Insert a new pending job record.
    pub fn create(
        &self,
        id: &str,
        query: &str,
        meta: HashMap<String, String>,
    ) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: id.to_string(),
            query: query.to_string(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
            meta,
        };
        let mut map = self.jobs.write().expect("job store lock poisoned");
        if map.contains_key(id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        map.insert(id.to_string(), job.clone());
        self.persist(&map)?;
        Ok(job)
    }

    /// Record a terminal transition for `id`.
    ///
    /// Returns `NotFound` for unknown ids. If the job is already terminal the
    /// call is a no-op, so a duplicate terminal update can never flip
    /// `completed` to `failed` or vice versa.
    pub fn update(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<Job, StoreError> {
        let mut map = self.jobs.write().expect("job store lock poisoned");
        let job = map
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if job.status.is_terminal() {
            return Ok(job.clone());
        }
        job.status = status;
        job.updated_at = Utc::now();
        if result.is_some() {
            job.result = result;
        }
        if error.is_some() {
            job.error = error;
        }
        let updated = job.clone();
        self.persist(&map)?;
        Ok(updated)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        let map = self.jobs.read().expect("job store lock poisoned");
        map.get(id).cloned()
    }

    /// The most recent jobs by creation time, newest first, at most `limit`.
    pub fn list(&self, limit: usize) -> Vec<Job> {
        let map = self.jobs.read().expect("job store lock poisoned");
        let mut jobs: Vec<Job> = map.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    // Called with the write lock held so persisted snapshots are ordered
    // consistently with in-memory mutations.
    fn persist(&self, map: &HashMap<String, Job>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let list: Vec<&Job> = map.values().collect();
        let data = serde_json::to_string_pretty(&list)?;
        fs::write(path, data)?;
        Ok(())
    }
}
