use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErpflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid selector override '{key}': {reason}")]
    InvalidSelector { key: String, reason: String },
}

/// Failures reported by the UI automation driver.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("Navigation to '{url}' timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Browsing context closed: {0}")]
    ContextClosed(String),

    #[error("Node is detached from the document: {0}")]
    Detached(String),

    #[error("Click intercepted by another element: {0}")]
    ClickIntercepted(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Driver operation failed: {0}")]
    Failed(String),
}

impl DriverError {
    pub fn is_context_closed(&self) -> bool {
        matches!(self, DriverError::ContextClosed(_))
    }
}

/// Failures raised inside a workflow step. The orchestrator converts every
/// one of them into a failed step result.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("{section} credentials not provided (missing: {missing})")]
    CredentialsMissing { section: String, missing: String },

    #[error("Required element '{field}' not found after trying {tried} selector(s)")]
    ElementNotFound { field: String, tried: usize },

    #[error("Element '{field}' is present but {reason}")]
    ElementUnusable { field: String, reason: String },

    #[error("Navigation to {url} timed out after {timeout_secs}s; the ERP server may be offline or unreachable")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Required process '{name}' could not be added: {reason}")]
    RequiredProcess { name: String, reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Job '{0}' not found in the job store")]
    JobNotFound(String),

    #[error("Job store failure: {0}")]
    Store(String),

    #[error("Queue failure: {0}")]
    Queue(String),

    #[error("Automation session unavailable: {0}")]
    Session(#[from] DriverError),

    #[error("Workflow panicked: {0}")]
    Panicked(String),

    #[error("Failed to serialize job data: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<crate::db::DatabaseError> for RunnerError {
    fn from(err: crate::db::DatabaseError) -> Self {
        RunnerError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ErpflowError>;

/// Extracts the message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
