use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::selectors::SelectorCatalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: String,
    pub target: TargetConfig,
    #[serde(default)]
    pub timings: Timings,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub duplicate_delivery: DuplicateDeliveryPolicy,
    /// Overrides for the built-in selector catalog, keyed by logical name.
    #[serde(default)]
    pub selectors: HashMap<String, Vec<String>>,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

impl EngineConfig {
    /// Configuration with all defaults for the given ERP base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            target: TargetConfig {
                base_url: base_url.into(),
                login_path: default_login_path(),
                estimation_path: default_estimation_path(),
            },
            timings: Timings::default(),
            worker_count: default_worker_count(),
            database_path: None,
            duplicate_delivery: DuplicateDeliveryPolicy::default(),
            selectors: HashMap::new(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn selector_catalog(&self) -> SelectorCatalog {
        SelectorCatalog::builtin().with_overrides(&self.selectors)
    }

    pub fn login_url(&self) -> String {
        self.target.url_for(&self.target.login_path)
    }

    pub fn estimation_url(&self) -> String {
        self.target.url_for(&self.target.estimation_path)
    }

    /// Configured database path, falling back to `~/.erpflow/data/erpflow.db`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) => Some(PathBuf::from(shellexpand_home(path))),
            None => crate::db::default_database_path(),
        }
    }
}

fn shellexpand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_estimation_path")]
    pub estimation_path: String,
}

fn default_login_path() -> String {
    "/Account/Login".to_string()
}

fn default_estimation_path() -> String {
    "/Estimation/NewEstimate".to_string()
}

impl TargetConfig {
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Fixed waits and retry budgets, all in milliseconds unless named otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timings {
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Pause between successful steps.
    #[serde(default = "default_step_settle_ms")]
    pub step_settle_ms: u64,
    /// Pause after each field interaction.
    #[serde(default = "default_field_settle_ms")]
    pub field_settle_ms: u64,
    /// Wait for a search dropdown to populate after typing.
    #[serde(default = "default_dropdown_wait_ms")]
    pub dropdown_wait_ms: u64,
    #[serde(default = "default_resolve_retries")]
    pub resolve_retries: u32,
    #[serde(default = "default_resolve_delay_ms")]
    pub resolve_delay_ms: u64,
    #[serde(default = "default_modal_attempts")]
    pub modal_attempts: u32,
    #[serde(default = "default_modal_cooldown_ms")]
    pub modal_cooldown_ms: u64,
    /// Sweeps while waiting for a filtered process row to appear.
    #[serde(default = "default_row_wait_retries")]
    pub row_wait_retries: u32,
    #[serde(default = "default_row_wait_delay_ms")]
    pub row_wait_delay_ms: u64,
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_step_settle_ms() -> u64 {
    1_000
}

fn default_field_settle_ms() -> u64 {
    300
}

fn default_dropdown_wait_ms() -> u64 {
    1_500
}

fn default_resolve_retries() -> u32 {
    3
}

fn default_resolve_delay_ms() -> u64 {
    500
}

fn default_modal_attempts() -> u32 {
    3
}

fn default_modal_cooldown_ms() -> u64 {
    2_000
}

fn default_row_wait_retries() -> u32 {
    5
}

fn default_row_wait_delay_ms() -> u64 {
    1_000
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            step_settle_ms: default_step_settle_ms(),
            field_settle_ms: default_field_settle_ms(),
            dropdown_wait_ms: default_dropdown_wait_ms(),
            resolve_retries: default_resolve_retries(),
            resolve_delay_ms: default_resolve_delay_ms(),
            modal_attempts: default_modal_attempts(),
            modal_cooldown_ms: default_modal_cooldown_ms(),
            row_wait_retries: default_row_wait_retries(),
            row_wait_delay_ms: default_row_wait_delay_ms(),
        }
    }
}

impl Timings {
    /// Same retry budgets, no waiting. Used for dry runs against a mock page.
    pub fn immediate() -> Self {
        Self {
            step_settle_ms: 0,
            field_settle_ms: 0,
            dropdown_wait_ms: 0,
            resolve_delay_ms: 0,
            modal_cooldown_ms: 0,
            row_wait_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn field_settle(&self) -> Duration {
        Duration::from_millis(self.field_settle_ms)
    }

    pub fn dropdown_wait(&self) -> Duration {
        Duration::from_millis(self.dropdown_wait_ms)
    }

    pub fn resolve_delay(&self) -> Duration {
        Duration::from_millis(self.resolve_delay_ms)
    }

    pub fn modal_cooldown(&self) -> Duration {
        Duration::from_millis(self.modal_cooldown_ms)
    }

    pub fn row_wait_delay(&self) -> Duration {
        Duration::from_millis(self.row_wait_delay_ms)
    }
}

/// What to do when a message arrives for a job that already finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDeliveryPolicy {
    /// Run the workflow again regardless of the stored status.
    Reprocess,
    /// Acknowledge and drop messages for Completed or Failed jobs.
    #[default]
    SkipTerminal,
}
