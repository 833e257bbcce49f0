//! apo-store
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! In-memory job store backing the REST surface described in §6 (`POST
//! /jobs`, `GET /jobs`, `GET /jobs/{id}`, `GET /jobs/{id}/status`, `DELETE
//! /jobs/{id}`). The HTTP layer itself is out of scope (§1); this crate only
//! implements the storage and lifecycle semantics the endpoints need.

use apo_core::{Job, JobStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors returned by [`JobStore`] operations.
#[derive(Debug)]
pub enum StoreError {
    /// No job exists with the given ID.
    NotFound(Uuid),
    /// A job with the given ID is already present.
    DuplicateId(Uuid),
    /// The job is already in a terminal status and cannot be cancelled.
    AlreadyTerminal(Uuid),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "no job found with id {id}"),
            StoreError::DuplicateId(id) => write!(f, "job {id} already exists"),
            StoreError::AlreadyTerminal(id) => {
                write!(f, "job {id} is already in a terminal status")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Shared, in-memory registry of [`Job`]s.
///
/// Cloning a [`JobStore`] is cheap and yields a handle to the same
/// underlying map (`Arc<RwLock<..>>`), matching how the workflow engine and
/// the REST layer would hold independent handles to a single store.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<BTreeMap<Uuid, Job>>>,
}

impl JobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly submitted job. Fails if `job.job_id` is already
    /// present (§6 `POST /jobs` assigns a fresh ID, so this should only fire
    /// on a caller bug).
    pub async fn create(&self, job: Job) -> Result<Uuid, StoreError> {
        let mut guard = self.jobs.write().await;
        if guard.contains_key(&job.job_id) {
            return Err(StoreError::DuplicateId(job.job_id));
        }
        let id = job.job_id;
        guard.insert(id, job);
        Ok(id)
    }

    /// Fetch a snapshot of a job by ID (§6 `GET /jobs/{id}`).
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// List all jobs, oldest-ID first (§6 `GET /jobs`).
    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Apply `f` to the stored job in place. Used by the engine to advance
    /// `status`/`progress`/`current_stage`/`result`/`errors` as a run
    /// proceeds (§3: job fields are only ever mutated by the engine).
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut guard = self.jobs.write().await;
        let job = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(job);
        Ok(())
    }

    /// Mark a non-terminal job `Failed` with a cancellation error (§6
    /// `DELETE /jobs/{id}`; §7 `CancelRequested`). No-op error if the job is
    /// already `Completed`/`Failed`.
    pub async fn cancel(&self, id: Uuid) -> Result<(), StoreError> {
        let mut guard = self.jobs.write().await;
        let job = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal(id));
        }
        job.status = JobStatus::Failed;
        job.error = Some("cancelled".to_string());
        Ok(())
    }

    /// Remove and return a job, regardless of status.
    pub async fn remove(&self, id: Uuid) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    /// Number of jobs currently tracked.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// `true` if the store holds no jobs.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_core::JobOptions;

    fn sample_job() -> Job {
        Job::new(JobOptions {
            keyword: "cloud security".into(),
            company_url: "https://example.com".into(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = JobStore::new();
        let job = sample_job();
        let id = job.job_id;
        store.create(job).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.job_id, id);
        assert_eq!(fetched.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let store = JobStore::new();
        let job = sample_job();
        let dup = job.clone();
        store.create(job).await.unwrap();
        assert!(matches!(
            store.create(dup).await,
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let store = JobStore::new();
        let job = sample_job();
        let id = job.job_id;
        store.create(job).await.unwrap();
        store
            .update(id, |j| {
                j.status = JobStatus::Running;
                j.progress = 42;
            })
            .await
            .unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Running);
        assert_eq!(fetched.progress, 42);
    }

    #[tokio::test]
    async fn cancel_marks_failed() {
        let store = JobStore::new();
        let job = sample_job();
        let id = job.job_id;
        store.create(job).await.unwrap();
        store.cancel(id).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(fetched.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn cancel_terminal_job_errors() {
        let store = JobStore::new();
        let mut job = sample_job();
        job.status = JobStatus::Completed;
        let id = job.job_id;
        store.create(job).await.unwrap();
        assert!(matches!(
            store.cancel(id).await,
            Err(StoreError::AlreadyTerminal(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_all_jobs() {
        let store = JobStore::new();
        store.create(sample_job()).await.unwrap();
        store.create(sample_job()).await.unwrap();
        assert_eq!(store.list().await.len(), 2);
    }

    #[tokio::test]
    async fn not_found_on_missing_id() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(matches!(
            store.cancel(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
