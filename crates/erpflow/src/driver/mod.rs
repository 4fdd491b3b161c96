//! UI automation driver seam.
//!
//! The engine never talks to a browser directly. Everything it needs from
//! the ERP screen goes through [`Page`], and sessions are leased from a
//! [`SessionProvider`]. Production wiring plugs a real browser driver in
//! here; tests use [`mock::MockPage`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverError;

pub mod mock;

pub use mock::{MockNode, MockPage, MockSessions};

/// Opaque handle to a node located on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub id: String,
    /// The selector that located this node.
    pub selector: String,
}

impl NodeHandle {
    pub fn new(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selector: selector.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Bypass actionability checks, e.g. when an overlay intercepts the click.
    pub force: bool,
}

impl ClickOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Primitives the automation engine requires from a live UI session.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Returns the first node matching `selector`, if any.
    async fn query(&self, selector: &str) -> Result<Option<NodeHandle>, DriverError>;

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DriverError>;

    async fn click(&self, node: &NodeHandle, options: ClickOptions) -> Result<(), DriverError>;

    /// Replaces the node's current value with `text`.
    async fn fill(&self, node: &NodeHandle, text: &str) -> Result<(), DriverError>;

    async fn press(&self, node: &NodeHandle, key: &str) -> Result<(), DriverError>;

    async fn is_visible(&self, node: &NodeHandle) -> Result<bool, DriverError>;

    async fn is_enabled(&self, node: &NodeHandle) -> Result<bool, DriverError>;

    async fn text(&self, node: &NodeHandle) -> Result<String, DriverError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    async fn url(&self) -> Result<String, DriverError>;

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError>;
}

/// Leases isolated automation sessions to job executions.
///
/// Every session acquired for a job must be handed back through
/// [`SessionProvider::release`] on every exit path.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Page>, DriverError>;

    async fn release(&self, page: Box<dyn Page>);
}
