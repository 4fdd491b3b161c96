//! Per-message job lifecycle: load, run inside a scoped session, persist,
//! notify, and retry with backoff when a fault escapes the workflow.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::anomaly::{AnomalyDetector, BasicAnomalyDetector};
use super::job::{Job, JobStatus, RetryDecision, JOB_TYPE_ESTIMATION};
use super::message::{JobMessage, NotificationMessage};
use super::queue::MessageQueue;
use super::retry::RetryPolicy;
use super::store::JobStore;
use crate::config::{DuplicateDeliveryPolicy, EngineConfig};
use crate::driver::SessionProvider;
use crate::error::{panic_message, RunnerError};
use crate::payload::JobPayload;
use crate::sanitize;
use crate::workflow::{AggregateResult, LogProgress, Workflow};

/// How one message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    /// The message was re-published after `delay`.
    Retrying { attempt: u32, delay: Duration },
    /// Already terminal and duplicates are skipped.
    Skipped,
}

pub struct JobRunner {
    workflow: Workflow,
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn JobStore>,
    jobs: Arc<dyn MessageQueue<JobMessage>>,
    notifications: Arc<dyn MessageQueue<NotificationMessage>>,
    anomalies: Arc<dyn AnomalyDetector>,
    retry: RetryPolicy,
    duplicates: DuplicateDeliveryPolicy,
}

impl JobRunner {
    pub fn new(
        config: Arc<EngineConfig>,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn JobStore>,
        jobs: Arc<dyn MessageQueue<JobMessage>>,
        notifications: Arc<dyn MessageQueue<NotificationMessage>>,
    ) -> Self {
        let duplicates = config.duplicate_delivery;
        Self {
            workflow: Workflow::from_config(config),
            sessions,
            store,
            jobs,
            notifications,
            anomalies: Arc::new(BasicAnomalyDetector),
            retry: RetryPolicy::default(),
            duplicates,
        }
    }

    /// Replaces the standard workflow, e.g. with a shortened step list.
    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.duplicates = workflow.config().duplicate_delivery;
        self.workflow = workflow;
        self
    }

    pub fn with_anomaly_detector(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.anomalies = detector;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// The inbound queue this runner re-publishes retries to.
    pub fn job_queue(&self) -> Arc<dyn MessageQueue<JobMessage>> {
        Arc::clone(&self.jobs)
    }

    pub async fn handle(&self, message: JobMessage) -> Result<JobOutcome, RunnerError> {
        let span = info_span!("job", job_id = %message.job_id, job_type = %message.job_type);
        self.handle_inner(message).instrument(span).await
    }

    async fn handle_inner(&self, message: JobMessage) -> Result<JobOutcome, RunnerError> {
        let mut job = match self.store.get(&message.job_id).await? {
            Some(job) => job,
            None if message.job_type != JOB_TYPE_ESTIMATION => {
                Job::new(message.job_id.clone(), message.job_type.clone())
            }
            None => return Err(RunnerError::JobNotFound(message.job_id.clone())),
        };

        if message.job_type != JOB_TYPE_ESTIMATION {
            warn!("Unsupported job type");
            job.fail(format!("Unsupported job type '{}'", message.job_type));
            self.persist_and_notify(&job).await?;
            return Ok(JobOutcome::Failed);
        }

        if job.status.is_terminal() && self.duplicates == DuplicateDeliveryPolicy::SkipTerminal {
            info!(status = %job.status, "Job already finished, skipping duplicate delivery");
            return Ok(JobOutcome::Skipped);
        }

        let payload = match JobPayload::from_json(message.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Job payload rejected");
                job.fail(format!("Invalid job payload: {}", e));
                self.persist_and_notify(&job).await?;
                return Ok(JobOutcome::Failed);
            }
        };

        job.mark_processing();
        job.metadata = payload.metadata();
        self.store.upsert(&job).await?;
        info!(attempt = job.retry_count + 1, "Job processing started");

        match self.run_in_session(&job.id, &payload).await {
            Ok(mut result) => {
                let findings = self.anomalies.inspect(&job, &result);
                if !findings.is_empty() {
                    warn!(count = findings.len(), "Anomalies detected");
                    result.errors.extend(findings);
                }
                job.complete(result);
                self.persist_and_notify(&job).await?;
                info!(status = %job.status, "Job finished");
                Ok(if job.status == JobStatus::Completed {
                    JobOutcome::Completed
                } else {
                    JobOutcome::Failed
                })
            }
            Err(fault) => {
                error!(error = %fault, retry_count = job.retry_count, "Job run faulted");
                match job.record_fault(fault.to_string(), &self.retry) {
                    RetryDecision::Retry { attempt, delay } => {
                        self.persist_and_notify(&job).await?;
                        info!(attempt, delay_secs = delay.as_secs(), "Retry scheduled");
                        tokio::time::sleep(delay).await;
                        self.jobs.publish(message).await?;
                        Ok(JobOutcome::Retrying { attempt, delay })
                    }
                    RetryDecision::GiveUp => {
                        self.persist_and_notify(&job).await?;
                        error!(retries = job.retry_count, "Retries exhausted, job failed");
                        Ok(JobOutcome::Failed)
                    }
                }
            }
        }
    }

    /// Runs the workflow with a session that is released whatever happens,
    /// including a panic outside the step boundary.
    async fn run_in_session(
        &self,
        job_id: &str,
        payload: &JobPayload,
    ) -> Result<AggregateResult, RunnerError> {
        let page = self.sessions.acquire().await?;
        let progress = LogProgress::new(job_id);

        let run = self
            .workflow
            .run(page.as_ref(), payload, &progress)
            .instrument(info_span!("workflow", job_id = %job_id));
        let outcome = AssertUnwindSafe(run).catch_unwind().await;
        self.sessions.release(page).await;

        outcome.map_err(|panic| RunnerError::Panicked(panic_message(panic.as_ref())))
    }

    async fn persist_and_notify(&self, job: &Job) -> Result<(), RunnerError> {
        self.store.upsert(job).await?;
        let recipient = job
            .sender
            .as_deref()
            .map(sanitize::redact_address)
            .unwrap_or_else(|| "<none>".to_string());
        debug!(status = %job.status, recipient = %recipient, "Publishing notification");
        self.notifications
            .publish(NotificationMessage::from(job))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timings;
    use crate::driver::{MockPage, MockSessions};
    use crate::runner::queue::MemoryQueue;
    use crate::runner::store::MemoryJobStore;
    use crate::error::StepError;
    use crate::workflow::step::{Step, StepAction, StepResult};
    use crate::workflow::StepContext;
    use async_trait::async_trait;
    use serde_json::json;

    struct Succeeds;

    #[async_trait]
    impl Step for Succeeds {
        fn action(&self) -> StepAction {
            StepAction::OpenLoginPage
        }

        async fn execute(&self, _ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
            Ok(StepResult::success("ok").with_data("screenshot", "cG5n"))
        }
    }

    struct Harness {
        runner: JobRunner,
        sessions: Arc<MockSessions>,
        store: Arc<MemoryJobStore>,
        jobs: Arc<MemoryQueue<JobMessage>>,
        notifications: Arc<MemoryQueue<NotificationMessage>>,
    }

    fn harness(store: MemoryJobStore, sessions: MockSessions, policy: DuplicateDeliveryPolicy) -> Harness {
        let mut config = EngineConfig::new("https://erp.example.com").with_timings(Timings::immediate());
        config.duplicate_delivery = policy;
        let config = Arc::new(config);

        let sessions = Arc::new(sessions);
        let store = Arc::new(store);
        let jobs: Arc<MemoryQueue<JobMessage>> = Arc::new(MemoryQueue::new());
        let notifications: Arc<MemoryQueue<NotificationMessage>> = Arc::new(MemoryQueue::new());

        let runner = JobRunner::new(
            Arc::clone(&config),
            sessions.clone(),
            store.clone(),
            jobs.clone(),
            notifications.clone(),
        )
        .with_workflow(Workflow::with_steps(config, vec![Box::new(Succeeds)]));

        Harness {
            runner,
            sessions,
            store,
            jobs,
            notifications,
        }
    }

    fn message(job_id: &str) -> JobMessage {
        JobMessage::new(job_id, JOB_TYPE_ESTIMATION, json!({"job": {"client": "Acme"}}))
    }

    #[tokio::test]
    async fn test_completes_and_notifies() {
        let job = Job::new("job-1", JOB_TYPE_ESTIMATION).with_sender("ops@example.com");
        let h = harness(
            MemoryJobStore::new().with_job(job),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::SkipTerminal,
        );

        let outcome = h.runner.handle(message("job-1")).await.unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        let stored = h.store.get("job-1").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.metadata["client"], "Acme");
        assert_eq!(h.sessions.released(), 1);

        let sent = h.notifications.snapshot();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_address.as_deref(), Some("ops@example.com"));
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let h = harness(
            MemoryJobStore::new(),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::SkipTerminal,
        );

        let err = h.runner.handle(message("ghost")).await.unwrap_err();
        assert!(matches!(err, RunnerError::JobNotFound(_)));
        assert_eq!(h.sessions.acquired(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_with_notification() {
        let h = harness(
            MemoryJobStore::new(),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::SkipTerminal,
        );

        let outcome = h
            .runner
            .handle(JobMessage::new("job-2", "invoice-sync", json!({})))
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Failed);
        let sent = h.notifications.snapshot();
        assert_eq!(sent[0].status, JobStatus::Failed);
        assert!(sent[0].error.as_deref().unwrap().contains("invoice-sync"));
        assert_eq!(h.sessions.acquired(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_without_retry() {
        let h = harness(
            MemoryJobStore::new().with_job(Job::new("job-3", JOB_TYPE_ESTIMATION)),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::SkipTerminal,
        );

        let outcome = h
            .runner
            .handle(JobMessage::new("job-3", JOB_TYPE_ESTIMATION, json!({"job": "not an object"})))
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Failed);
        assert!(h.jobs.is_empty());
        let stored = h.store.get("job-3").await.unwrap().unwrap();
        assert!(stored.error.unwrap().starts_with("Invalid job payload"));
    }

    #[tokio::test]
    async fn test_duplicate_delivery_policy() {
        let mut done = Job::new("job-4", JOB_TYPE_ESTIMATION);
        done.fail("earlier failure");

        let skip = harness(
            MemoryJobStore::new().with_job(done.clone()),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::SkipTerminal,
        );
        assert_eq!(skip.runner.handle(message("job-4")).await.unwrap(), JobOutcome::Skipped);
        assert!(skip.notifications.is_empty());

        let reprocess = harness(
            MemoryJobStore::new().with_job(done),
            MockSessions::new(MockPage::new()),
            DuplicateDeliveryPolicy::Reprocess,
        );
        assert_eq!(
            reprocess.runner.handle(message("job-4")).await.unwrap(),
            JobOutcome::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_fault_schedules_retry() {
        let h = harness(
            MemoryJobStore::new().with_job(Job::new("job-5", JOB_TYPE_ESTIMATION)),
            MockSessions::failing(MockPage::new(), 1),
            DuplicateDeliveryPolicy::SkipTerminal,
        );

        let outcome = h.runner.handle(message("job-5")).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Retrying {
                attempt: 1,
                delay: Duration::from_secs(120)
            }
        );
        assert_eq!(h.jobs.len(), 1);
        let stored = h.store.get("job-5").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Retrying);
        assert_eq!(h.notifications.snapshot()[0].status, JobStatus::Retrying);

        let retried = h.jobs.receive().await.unwrap().unwrap();
        assert_eq!(h.runner.handle(retried).await.unwrap(), JobOutcome::Completed);
        assert_eq!(h.sessions.released(), 1);
    }
}
