use serde::{Deserialize, Serialize};

use super::job::{Job, JobStatus};
use crate::workflow::AggregateResult;

/// Inbound queue message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub job_id: String,
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl JobMessage {
    pub fn new(job_id: impl Into<String>, job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_id: job_id.into(),
            job_type: job_type.into(),
            payload,
        }
    }
}

/// Outbound message published after every terminal or retrying state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
    pub retry_count: u32,
}

impl From<&Job> for NotificationMessage {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            result: job.result.clone(),
            error: job.error.clone(),
            recipient_address: job.sender.clone(),
            retry_count: job.retry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_message_from_wire() {
        let message: JobMessage = serde_json::from_value(json!({
            "jobId": "job-7",
            "jobType": "erp-estimation-workflow",
            "payload": {"job": {"client": "Acme"}}
        }))
        .unwrap();

        assert_eq!(message.job_id, "job-7");
        assert_eq!(message.payload["job"]["client"], "Acme");
    }

    #[test]
    fn test_notification_carries_recipient() {
        let mut job = Job::new("job-7", "erp-estimation-workflow").with_sender("ops@example.com");
        job.fail("Unsupported job type 'x'");

        let value = serde_json::to_value(NotificationMessage::from(&job)).unwrap();
        assert_eq!(value["recipientAddress"], "ops@example.com");
        assert_eq!(value["status"], "failed");
        assert!(value.get("result").is_none());
    }
}
