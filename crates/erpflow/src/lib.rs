pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod payload;
pub mod resolver;
pub mod runner;
pub mod sanitize;
pub mod workflow;

pub use config::{load_config, load_config_from_str, DuplicateDeliveryPolicy, EngineConfig, Timings};
pub use db::{Database, SqliteJobStore};
pub use driver::{ClickOptions, MockPage, MockSessions, NodeHandle, Page, SessionProvider};
pub use error::{ConfigError, DriverError, ErpflowError, Result, RunnerError, StepError};
pub use logging::LogFormat;
pub use matcher::{select_best_match, MatchDecision, MatchKind};
pub use payload::JobPayload;
pub use resolver::{NodeResolver, Resolution};
pub use runner::{
    Job, JobMessage, JobOutcome, JobRunner, JobStatus, JobStore, MemoryJobStore, MemoryQueue,
    MessageQueue, NotificationMessage, RetryPolicy, WorkerPool,
};
pub use workflow::{AggregateResult, StepAction, StepResult, Workflow, WorkflowStep};
