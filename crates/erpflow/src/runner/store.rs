use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::job::Job;
use crate::error::RunnerError;

/// Read-by-id and upsert of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Job>, RunnerError>;

    async fn upsert(&self, job: &Job) -> Result<(), RunnerError>;
}

/// In-process job store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, replacing any record with the same id.
    pub fn with_job(self, job: Job) -> Self {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(job.id.clone(), job);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, id: &str) -> Result<Option<Job>, RunnerError> {
        let jobs = self
            .jobs
            .lock()
            .map_err(|_| RunnerError::Store("job store lock poisoned".to_string()))?;
        Ok(jobs.get(id).cloned())
    }

    async fn upsert(&self, job: &Job) -> Result<(), RunnerError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| RunnerError::Store("job store lock poisoned".to_string()))?;
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }
}
