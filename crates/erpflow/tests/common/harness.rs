//! Test harnesses for isolated workflow and runner execution.
//!
//! `run_workflow` drives the standard 16 steps against a scripted mock page
//! with all waits disabled. `RunnerHarness` wires a `JobRunner` to in-memory
//! queues, a mock session provider and a job store of the test's choosing.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;

use erpflow::runner::JOB_TYPE_ESTIMATION;
use erpflow::{
    AggregateResult, EngineConfig, Job, JobMessage, JobOutcome, JobPayload, JobRunner, JobStore,
    MemoryJobStore, MemoryQueue, MessageQueue, MockPage, MockSessions, NotificationMessage,
    Timings, Workflow,
};
use erpflow::workflow::NoopProgress;

/// Engine configuration for dry runs: real retry budgets, no waiting.
pub fn dry_run_config() -> Arc<EngineConfig> {
    Arc::new(EngineConfig::new("https://erp.example.com").with_timings(Timings::immediate()))
}

/// Runs the standard workflow once against `page`.
pub async fn run_workflow(page: &MockPage, payload: &JobPayload) -> AggregateResult {
    let workflow = Workflow::from_config(dry_run_config());
    workflow.run(page, payload, &NoopProgress).await
}

/// A job runner with every collaborator reachable from the test.
pub struct RunnerHarness {
    pub runner: JobRunner,
    pub sessions: Arc<MockSessions>,
    pub store: Arc<dyn JobStore>,
    pub jobs: Arc<MemoryQueue<JobMessage>>,
    pub notifications: Arc<MemoryQueue<NotificationMessage>>,
}

impl RunnerHarness {
    /// Standard workflow over `page`, in-memory job store.
    pub fn new(page: MockPage) -> Self {
        Self::with_parts(MockSessions::new(page), Arc::new(MemoryJobStore::new()))
    }

    pub fn with_parts(sessions: MockSessions, store: Arc<dyn JobStore>) -> Self {
        let sessions = Arc::new(sessions);
        let jobs: Arc<MemoryQueue<JobMessage>> = Arc::new(MemoryQueue::new());
        let notifications: Arc<MemoryQueue<NotificationMessage>> = Arc::new(MemoryQueue::new());

        let runner = JobRunner::new(
            dry_run_config(),
            sessions.clone(),
            Arc::clone(&store),
            jobs.clone(),
            notifications.clone(),
        );

        Self {
            runner,
            sessions,
            store,
            jobs,
            notifications,
        }
    }

    /// Stores a pending estimation job and queues its message.
    pub async fn submit(&self, job_id: &str, sender: &str, payload: Value) {
        let job = Job::new(job_id, JOB_TYPE_ESTIMATION).with_sender(sender);
        self.store.upsert(&job).await.expect("seed job");
        self.jobs
            .publish(JobMessage::new(job_id, JOB_TYPE_ESTIMATION, payload))
            .await
            .expect("queue job message");
    }

    /// Handles the next queued message, if any.
    pub async fn process_next(&self) -> Option<JobOutcome> {
        let message = self.jobs.receive().await.expect("read job queue")?;
        Some(self.runner.handle(message).await.expect("handle job message"))
    }

    pub async fn job(&self, job_id: &str) -> Job {
        self.store
            .get(job_id)
            .await
            .expect("read job store")
            .expect("job exists")
    }
}
