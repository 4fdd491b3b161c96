//! The estimation workflow: step contract, per-field form filling, the
//! 16-step library and the orchestrator that runs them in order.

pub mod context;
pub mod forms;
pub mod orchestrator;
pub mod progress;
pub mod step;
pub mod steps;

pub use context::StepContext;
pub use forms::{FieldKind, FieldOutcome, FieldSpec, FORM_DATA_PREFIX};
pub use orchestrator::{AggregateResult, RunState, Workflow, SCREENSHOT_KEY};
pub use progress::{LogProgress, NoopProgress, ProgressEvent, ProgressReporter, RecordingProgress};
pub use step::{template, DataMap, Step, StepAction, StepResult, WorkflowStep};
