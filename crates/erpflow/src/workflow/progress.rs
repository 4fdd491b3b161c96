use std::sync::Mutex;

use tracing::{info, warn};

/// Events emitted by the orchestrator while a workflow runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StepStarted {
        number: u8,
        description: &'static str,
    },
    StepFinished {
        number: u8,
        success: bool,
        message: String,
    },
    Completed {
        summary: String,
    },
    Failed {
        step: u8,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the tracing pipeline, tagged with the job id.
pub struct LogProgress {
    job_id: String,
}

impl LogProgress {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StepStarted {
                number,
                description,
            } => {
                info!(job_id = %self.job_id, step = number, "{}", description);
            }
            ProgressEvent::StepFinished {
                number,
                success: true,
                message,
            } => {
                info!(job_id = %self.job_id, step = number, "Step completed: {}", message);
            }
            ProgressEvent::StepFinished {
                number,
                success: false,
                message,
            } => {
                warn!(job_id = %self.job_id, step = number, "Step failed: {}", message);
            }
            ProgressEvent::Completed { summary } => {
                info!(job_id = %self.job_id, "{}", summary);
            }
            ProgressEvent::Failed { step, error } => {
                warn!(job_id = %self.job_id, step, "Workflow aborted: {}", error);
            }
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
