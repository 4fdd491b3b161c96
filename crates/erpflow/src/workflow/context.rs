use std::time::Duration;

use super::step::DataMap;
use crate::config::{EngineConfig, SelectorCatalog, Timings};
use crate::driver::Page;
use crate::payload::JobPayload;
use crate::resolver::NodeResolver;

/// Everything a step can see: the live page, the request, configuration,
/// and the data merged from steps that already succeeded.
pub struct StepContext<'a> {
    pub page: &'a dyn Page,
    pub payload: &'a JobPayload,
    pub config: &'a EngineConfig,
    pub selectors: &'a SelectorCatalog,
    pub data: &'a DataMap,
}

impl<'a> StepContext<'a> {
    pub fn timings(&self) -> &'a Timings {
        &self.config.timings
    }

    pub fn resolver(&self) -> NodeResolver<'a> {
        let timings = self.timings();
        NodeResolver::new(self.page, timings.resolve_retries, timings.resolve_delay())
    }

    pub fn candidates(&self, key: &str) -> &'a [String] {
        self.selectors.candidates(key)
    }

    pub fn candidates_for(&self, key: &str, name: &str) -> Vec<String> {
        self.selectors.candidates_for(key, name)
    }

    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
