use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use crate::workflow::AggregateResult;

/// Job type tag handled by this engine.
pub const JOB_TYPE_ESTIMATION: &str = "erp-estimation-workflow";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Retrying => "retrying",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "retrying" => Some(JobStatus::Retrying),
            _ => None,
        }
    }

    /// No further processing is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens after a fault escaped the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-publish after `delay`. `attempt` is the new retry count.
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

/// Persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub status: JobStatus,
    /// Secret-free summary of the request.
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregateResult>,
    pub retry_count: u32,
    /// Who gets the outcome notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            status: JobStatus::Pending,
            metadata: serde_json::Value::Null,
            result: None,
            retry_count: 0,
            sender: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// A pending estimation job with a generated id.
    pub fn estimation() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), JOB_TYPE_ESTIMATION)
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.error = None;
    }

    /// Stores the workflow outcome and derives the status from it.
    pub fn complete(&mut self, result: AggregateResult) {
        if result.success {
            self.status = JobStatus::Completed;
            self.error = None;
        } else {
            self.status = JobStatus::Failed;
            self.error = Some(result.message.clone());
        }
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Fails the job without running the workflow.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Records an unhandled fault and decides whether another attempt is
    /// allowed. The retry counter only grows while below the ceiling.
    pub fn record_fault(&mut self, error: impl Into<String>, policy: &RetryPolicy) -> RetryDecision {
        self.error = Some(error.into());
        if self.retry_count < policy.max_retries {
            self.retry_count += 1;
            self.status = JobStatus::Retrying;
            RetryDecision::Retry {
                attempt: self.retry_count,
                delay: policy.delay_for(self.retry_count),
            }
        } else {
            self.status = JobStatus::Failed;
            self.completed_at = Some(Utc::now());
            RetryDecision::GiveUp
        }
    }
}
