use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use base64::Engine as _;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use super::context::StepContext;
use super::progress::{ProgressEvent, ProgressReporter};
use super::step::{DataMap, Step, StepResult, WorkflowStep};
use super::steps;
use crate::config::{EngineConfig, SelectorCatalog};
use crate::driver::Page;
use crate::error::{panic_message, DriverError};
use crate::payload::JobPayload;

pub const SCREENSHOT_KEY: &str = "screenshot";

/// Outcome of one workflow run, including the audit trail of every step
/// that was attempted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub success: bool,
    pub message: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl AggregateResult {
    /// The captured screenshot, decoded from the data map.
    pub fn screenshot(&self) -> Option<Vec<u8>> {
        self.data
            .get(SCREENSHOT_KEY)
            .and_then(|v| v.as_str())
            .and_then(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded).ok())
    }

    /// The last step in the trail that did not complete.
    pub fn failed_step(&self) -> Option<&WorkflowStep> {
        self.steps.iter().rev().find(|s| !s.completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    /// Executing the step with this 1-based number.
    Running(u8),
    Succeeded,
    Failed { step: u8, reason: String },
}

impl RunState {
    /// Fails the step in flight: `Running(n)` becomes `Failed` at `n`.
    /// Other states have no step in flight and are returned unchanged.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        match self {
            RunState::Running(step) => RunState::Failed {
                step,
                reason: reason.into(),
            },
            other => other,
        }
    }

    /// Ends a run that had no failure.
    pub fn succeed(self) -> Self {
        match self {
            RunState::Failed { .. } => self,
            _ => RunState::Succeeded,
        }
    }
}

/// Sequential step state machine. Runs every step in order, stops at the
/// first failure and never raises: faults inside a step, panics included,
/// become failed step results.
pub struct Workflow {
    config: Arc<EngineConfig>,
    selectors: SelectorCatalog,
    steps: Vec<Box<dyn Step>>,
}

impl Workflow {
    /// Production constructor with the standard 16 steps.
    pub fn from_config(config: Arc<EngineConfig>) -> Self {
        Self::with_steps(config, steps::standard())
    }

    pub fn with_steps(config: Arc<EngineConfig>, steps: Vec<Box<dyn Step>>) -> Self {
        let selectors = config.selector_catalog();
        Self {
            config,
            selectors,
            steps,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub async fn run(
        &self,
        page: &dyn Page,
        payload: &JobPayload,
        progress: &dyn ProgressReporter,
    ) -> AggregateResult {
        let mut state = RunState::NotStarted;
        let mut trail = Vec::with_capacity(self.steps.len());
        let mut data = DataMap::new();
        let mut errors = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            let action = step.action();
            let mut record = WorkflowStep::pending(action);
            state = RunState::Running(record.number);

            progress.report(ProgressEvent::StepStarted {
                number: record.number,
                description: action.description(),
            });

            let span = info_span!("step", number = record.number, action = %action);
            let result = self
                .execute_step(step.as_ref(), page, payload, &data)
                .instrument(span)
                .await;

            record.finish(&result);
            progress.report(ProgressEvent::StepFinished {
                number: record.number,
                success: result.success,
                message: result.message.clone(),
            });
            trail.push(record);
            errors.extend(result.errors.iter().cloned());

            if !result.success {
                if result.errors.is_empty() {
                    errors.push(result.message.clone());
                }
                state = state.fail(result.message);
                break;
            }

            if let Some(step_data) = result.data {
                data.extend(step_data);
            }

            if index + 1 < self.steps.len() {
                let settle = self.config.timings.step_settle();
                if !settle.is_zero() {
                    tokio::time::sleep(settle).await;
                }
            }
        }

        match state.succeed() {
            RunState::Failed { step, reason } => {
                let description = trail
                    .last()
                    .map(|s| s.description.clone())
                    .unwrap_or_default();
                let message = format!("Step {} ({}) failed: {}", step, description, reason);
                progress.report(ProgressEvent::Failed {
                    step,
                    error: reason,
                });
                AggregateResult {
                    success: false,
                    message,
                    steps: trail,
                    data,
                    errors,
                }
            }
            _ => {
                match final_capture(page).await {
                    Ok(captured) => data.extend(captured),
                    Err(e) => {
                        warn!(error = %e, "Final capture failed");
                        errors.push(format!("Final capture failed: {}", e));
                    }
                }
                let message = format!(
                    "Estimation workflow completed: {} of {} steps",
                    trail.len(),
                    self.steps.len()
                );
                info!("{}", message);
                progress.report(ProgressEvent::Completed {
                    summary: message.clone(),
                });
                AggregateResult {
                    success: true,
                    message,
                    steps: trail,
                    data,
                    errors,
                }
            }
        }
    }

    async fn execute_step(
        &self,
        step: &dyn Step,
        page: &dyn Page,
        payload: &JobPayload,
        data: &DataMap,
    ) -> StepResult {
        let ctx = StepContext {
            page,
            payload,
            config: &self.config,
            selectors: &self.selectors,
            data,
        };

        match AssertUnwindSafe(step.execute(&ctx)).catch_unwind().await {
            Ok(Ok(result)) => {
                debug!(success = result.success, "{}", result.message);
                result
            }
            Ok(Err(e)) => StepResult::from(e),
            Err(panic) => StepResult::failure(format!(
                "Step panicked: {}",
                panic_message(panic.as_ref())
            )),
        }
    }
}

/// Records where the run ended up, for the notification and audit.
async fn final_capture(page: &dyn Page) -> Result<DataMap, DriverError> {
    let mut captured = DataMap::new();
    captured.insert("finalUrl".to_string(), page.url().await?.into());
    captured.insert("finalTitle".to_string(), page.title().await?.into());
    captured.insert(
        "completedAt".to_string(),
        chrono::Utc::now().to_rfc3339().into(),
    );
    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timings;
    use crate::driver::MockPage;
    use crate::error::StepError;
    use crate::workflow::progress::{NoopProgress, RecordingProgress};
    use crate::workflow::step::StepAction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Succeed,
        Fail,
        Error,
        Panic,
    }

    struct ScriptedStep {
        action: StepAction,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Step for ScriptedStep {
        fn action(&self) -> StepAction {
            self.action
        }

        async fn execute(&self, _ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => Ok(StepResult::success("ok").with_data(
                    &format!("step{}", self.action.number()),
                    true,
                )),
                Behaviour::Fail => Ok(StepResult::failure("scripted failure")),
                Behaviour::Error => Err(StepError::ElementNotFound {
                    field: "Quantity".to_string(),
                    tried: 3,
                }),
                Behaviour::Panic => panic!("selector table corrupted"),
            }
        }
    }

    fn scripted(behaviours: Vec<Behaviour>) -> (Workflow, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = behaviours
            .into_iter()
            .zip(StepAction::ALL)
            .map(|(behaviour, action)| {
                Box::new(ScriptedStep {
                    action,
                    behaviour,
                    calls: Arc::clone(&calls),
                }) as Box<dyn Step>
            })
            .collect();
        let config = Arc::new(
            EngineConfig::new("https://erp.example.com").with_timings(Timings::immediate()),
        );
        (Workflow::with_steps(config, steps), calls)
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let (workflow, calls) = scripted(vec![Behaviour::Succeed, Behaviour::Succeed]);
        let page = MockPage::new().with_title("Estimate #42");

        let result = workflow.run(&page, &JobPayload::default(), &NoopProgress).await;

        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.completed));
        assert_eq!(result.data["step1"], true);
        assert_eq!(result.data["finalTitle"], "Estimate #42");
    }

    #[tokio::test]
    async fn test_failure_stops_the_run() {
        let (workflow, calls) = scripted(vec![
            Behaviour::Succeed,
            Behaviour::Succeed,
            Behaviour::Fail,
            Behaviour::Succeed,
        ]);
        let page = MockPage::new();

        let result = workflow.run(&page, &JobPayload::default(), &NoopProgress).await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.failed_step().map(|s| s.number), Some(3));
        assert!(result.message.starts_with("Step 3"));
        assert_eq!(result.errors, vec!["scripted failure".to_string()]);
        assert!(!result.data.contains_key("finalTitle"));
    }

    #[tokio::test]
    async fn test_step_error_becomes_failed_result() {
        let (workflow, _) = scripted(vec![Behaviour::Error, Behaviour::Succeed]);
        let page = MockPage::new();

        let result = workflow.run(&page, &JobPayload::default(), &NoopProgress).await;

        assert!(!result.success);
        assert_eq!(result.steps.len(), 1);
        assert!(result.steps[0]
            .error
            .as_deref()
            .unwrap()
            .contains("'Quantity' not found"));
    }

    #[tokio::test]
    async fn test_panicking_step_is_contained() {
        let (workflow, calls) = scripted(vec![Behaviour::Succeed, Behaviour::Panic, Behaviour::Succeed]);
        let page = MockPage::new();

        let result = workflow.run(&page, &JobPayload::default(), &NoopProgress).await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(result.message.contains("selector table corrupted"));
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let (workflow, _) = scripted(vec![Behaviour::Succeed, Behaviour::Fail]);
        let page = MockPage::new();
        let progress = RecordingProgress::default();

        workflow.run(&page, &JobPayload::default(), &progress).await;

        let events = progress.events();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], ProgressEvent::StepStarted { number: 1, .. }));
        assert!(matches!(
            events[3],
            ProgressEvent::StepFinished {
                number: 2,
                success: false,
                ..
            }
        ));
        assert!(matches!(events[4], ProgressEvent::Failed { step: 2, .. }));
    }

    #[test]
    fn test_run_state_transitions() {
        assert_eq!(
            RunState::Running(7).fail("Quantity rejected"),
            RunState::Failed {
                step: 7,
                reason: "Quantity rejected".to_string()
            }
        );
        assert_eq!(RunState::NotStarted.fail("x"), RunState::NotStarted);
        assert_eq!(RunState::Running(16).succeed(), RunState::Succeeded);

        let failed = RunState::Running(2).fail("offline");
        assert_eq!(failed.clone().succeed(), failed);
    }

    #[test]
    fn test_screenshot_round_trips_through_data() {
        let mut result = AggregateResult::default();
        result.data.insert(
            SCREENSHOT_KEY.to_string(),
            base64::engine::general_purpose::STANDARD
                .encode(b"png-bytes")
                .into(),
        );
        assert_eq!(result.screenshot(), Some(b"png-bytes".to_vec()));
    }
}
