//! Queue-driven job execution with durable status and bounded retries.

pub mod anomaly;
pub mod coordinator;
pub mod job;
pub mod message;
pub mod pool;
pub mod queue;
pub mod retry;
pub mod store;

pub use anomaly::{AnomalyDetector, BasicAnomalyDetector};
pub use coordinator::{JobOutcome, JobRunner};
pub use job::{Job, JobStatus, RetryDecision, JOB_TYPE_ESTIMATION};
pub use message::{JobMessage, NotificationMessage};
pub use pool::WorkerPool;
pub use queue::{MemoryQueue, MessageQueue};
pub use retry::{RetryPolicy, MAX_JOB_RETRIES};
pub use store::{JobStore, MemoryJobStore};
