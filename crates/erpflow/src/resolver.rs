//! Ordered-fallback node resolution.
//!
//! The ERP screen re-renders asynchronously and its markup drifts between
//! releases, so every element is described by a list of candidate selectors
//! tried in order. A node only counts as resolved when it is both visible
//! and enabled.

use std::time::Duration;

use tracing::{debug, trace};

use crate::driver::{ClickOptions, NodeHandle, Page};
use crate::error::{DriverError, StepError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unusable {
    Hidden,
    Disabled,
}

impl Unusable {
    pub fn describe(&self) -> &'static str {
        match self {
            Unusable::Hidden => "not visible",
            Unusable::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub node: NodeHandle,
    /// The candidate selector that produced the node.
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedNode),
    /// A node exists for some candidate but cannot be interacted with.
    Unusable(ResolvedNode, Unusable),
    NotFound,
}

impl Resolution {
    pub fn found(self) -> Option<ResolvedNode> {
        match self {
            Resolution::Found(node) => Some(node),
            _ => None,
        }
    }
}

pub struct NodeResolver<'a> {
    page: &'a dyn Page,
    retries: u32,
    delay: Duration,
}

impl<'a> NodeResolver<'a> {
    pub fn new(page: &'a dyn Page, retries: u32, delay: Duration) -> Self {
        Self {
            page,
            retries,
            delay,
        }
    }

    /// One pass over `candidates`, returning the first visible and enabled
    /// node. Only a closed context aborts the sweep; any other query
    /// failure counts as the candidate being absent.
    pub async fn sweep(&self, candidates: &[String]) -> Result<Resolution, DriverError> {
        let mut unusable = None;

        for selector in candidates {
            let node = match self.page.query(selector).await {
                Ok(Some(node)) => node,
                Ok(None) => continue,
                Err(e) if e.is_context_closed() => return Err(e),
                Err(e) => {
                    trace!(selector = %selector, error = %e, "Candidate query failed");
                    continue;
                }
            };

            let state = match self.usability(&node).await {
                Ok(state) => state,
                Err(e) if e.is_context_closed() => return Err(e),
                Err(_) => continue,
            };

            let resolved = ResolvedNode {
                node,
                selector: selector.clone(),
            };
            match state {
                None => return Ok(Resolution::Found(resolved)),
                Some(reason) => {
                    if unusable.is_none() {
                        unusable = Some((resolved, reason));
                    }
                }
            }
        }

        Ok(match unusable {
            Some((node, reason)) => Resolution::Unusable(node, reason),
            None => Resolution::NotFound,
        })
    }

    async fn usability(&self, node: &NodeHandle) -> Result<Option<Unusable>, DriverError> {
        if !self.page.is_visible(node).await? {
            return Ok(Some(Unusable::Hidden));
        }
        if !self.page.is_enabled(node).await? {
            return Ok(Some(Unusable::Disabled));
        }
        Ok(None)
    }

    /// Sweeps with the resolver's configured retry budget.
    pub async fn resolve(&self, candidates: &[String]) -> Result<Resolution, DriverError> {
        self.resolve_with_retry(candidates, self.retries, self.delay)
            .await
    }

    /// Repeats the full sweep up to `retries` times (at least once), pausing
    /// `delay` between sweeps.
    pub async fn resolve_with_retry(
        &self,
        candidates: &[String],
        retries: u32,
        delay: Duration,
    ) -> Result<Resolution, DriverError> {
        let sweeps = retries.max(1);
        let mut last = Resolution::NotFound;

        for sweep in 1..=sweeps {
            last = self.sweep(candidates).await?;
            if matches!(last, Resolution::Found(_)) {
                return Ok(last);
            }
            if sweep < sweeps && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(last)
    }

    /// Resolves a node the current step cannot proceed without.
    pub async fn require(
        &self,
        field: &str,
        candidates: &[String],
    ) -> Result<ResolvedNode, StepError> {
        match self.resolve(candidates).await? {
            Resolution::Found(node) => Ok(node),
            Resolution::Unusable(_, reason) => Err(StepError::ElementUnusable {
                field: field.to_string(),
                reason: reason.describe().to_string(),
            }),
            Resolution::NotFound => Err(StepError::ElementNotFound {
                field: field.to_string(),
                tried: candidates.len(),
            }),
        }
    }

    /// Resolves a node whose absence is tolerated, with the same retry
    /// budget as required nodes. Unusable nodes are treated as absent.
    pub async fn optional(
        &self,
        field: &str,
        candidates: &[String],
    ) -> Result<Option<ResolvedNode>, DriverError> {
        match self.resolve(candidates).await? {
            Resolution::Found(node) => Ok(Some(node)),
            Resolution::Unusable(node, reason) => {
                debug!(field, selector = %node.selector, reason = reason.describe(), "Optional element not usable");
                Ok(None)
            }
            Resolution::NotFound => {
                debug!(field, "Optional element not present");
                Ok(None)
            }
        }
    }

    /// Clicks a node, retrying once with `force` when an overlay
    /// intercepts the normal click.
    pub async fn click(&self, node: &NodeHandle) -> Result<(), DriverError> {
        match self.page.click(node, ClickOptions::default()).await {
            Err(DriverError::ClickIntercepted(by)) => {
                debug!(selector = %node.selector, intercepted_by = %by, "Click intercepted, forcing");
                self.page.click(node, ClickOptions::forced()).await
            }
            other => other,
        }
    }
}
