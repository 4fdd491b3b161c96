//! Scriptable in-memory page used by tests and dry runs.
//!
//! A `MockPage` is a cheap handle over shared state, so a test can keep a
//! clone to inspect what the engine did after the session was released.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{ClickOptions, NodeHandle, Page, SessionProvider};
use crate::error::DriverError;

const OPTION_PREFIX: &str = "option:";

#[derive(Debug, Clone)]
pub struct MockNode {
    pub visible: bool,
    pub enabled: bool,
    pub text: String,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            visible: true,
            enabled: true,
            text: String::new(),
        }
    }
}

impl MockNode {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct MockState {
    permissive: bool,
    nodes: HashMap<String, MockNode>,
    lists: HashMap<String, Vec<String>>,
    search_results: HashMap<String, Vec<String>>,
    absent: Vec<String>,
    disabled: Vec<String>,
    appear_after: HashMap<String, u32>,
    close_on_click: Vec<String>,
    intercepted: Vec<String>,
    navigation_timeout: bool,
    title: String,
    url: String,
    screenshot: Vec<u8>,
    last_fill: Option<String>,

    navigations: Vec<String>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    forced_clicks: Vec<String>,
    selections: Vec<String>,
    presses: Vec<(String, String)>,
    scripts: Vec<String>,
    queries: usize,
}

impl MockState {
    fn matches_any(patterns: &[String], selector: &str) -> bool {
        patterns.iter().any(|p| selector.contains(p.as_str()))
    }

    /// Looks up the node a selector would resolve to. Counts against
    /// `appear_after` budgets only when `counting` is set.
    fn lookup(&mut self, selector: &str, counting: bool) -> Option<MockNode> {
        if Self::matches_any(&self.absent, selector) {
            return None;
        }
        if counting {
            for (fragment, remaining) in self.appear_after.iter_mut() {
                if selector.contains(fragment.as_str()) && *remaining > 0 {
                    *remaining -= 1;
                    return None;
                }
            }
        } else if self
            .appear_after
            .iter()
            .any(|(fragment, remaining)| selector.contains(fragment.as_str()) && *remaining > 0)
        {
            return None;
        }
        if let Some(node) = self.nodes.get(selector) {
            return Some(node.clone());
        }
        if self.permissive {
            let mut node = MockNode::default();
            if Self::matches_any(&self.disabled, selector) {
                node.enabled = false;
            }
            return Some(node);
        }
        None
    }

    fn option_text(id: &str) -> Option<&str> {
        id.strip_prefix(OPTION_PREFIX)
            .and_then(|rest| rest.split_once(':'))
            .map(|(_, text)| text)
    }
}

#[derive(Clone)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// A page where only explicitly registered nodes exist.
    pub fn new() -> Self {
        let state = MockState {
            title: "Estimation - ERP".to_string(),
            url: "about:blank".to_string(),
            screenshot: b"\x89PNG mock".to_vec(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A page where every selector resolves to a visible, enabled node
    /// unless configured otherwise.
    pub fn permissive() -> Self {
        let page = Self::new();
        page.lock().permissive = true;
        page
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_node(self, selector: &str, node: MockNode) -> Self {
        self.lock().nodes.insert(selector.to_string(), node);
        self
    }

    /// Registers the items `query_all(selector)` returns.
    pub fn with_list(self, selector: &str, items: &[&str]) -> Self {
        self.lock().lists.insert(
            selector.to_string(),
            items.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Registers the dropdown options shown after `term` is typed into a
    /// search field.
    pub fn with_search_results(self, term: &str, options: &[&str]) -> Self {
        self.lock().search_results.insert(
            term.to_string(),
            options.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Selectors containing `fragment` resolve to nothing.
    pub fn hide_containing(self, fragment: &str) -> Self {
        self.lock().absent.push(fragment.to_string());
        self
    }

    /// Selectors containing `fragment` resolve to disabled nodes.
    pub fn disable_containing(self, fragment: &str) -> Self {
        self.lock().disabled.push(fragment.to_string());
        self
    }

    /// Selectors containing `fragment` only resolve after `queries` lookups.
    pub fn appear_after(self, fragment: &str, queries: u32) -> Self {
        self.lock()
            .appear_after
            .insert(fragment.to_string(), queries);
        self
    }

    /// Clicking a node whose selector contains `fragment` closes the context.
    pub fn close_context_on_click(self, fragment: &str) -> Self {
        self.lock().close_on_click.push(fragment.to_string());
        self
    }

    /// Non-forced clicks on matching nodes are intercepted by an overlay.
    pub fn intercept_clicks_on(self, fragment: &str) -> Self {
        self.lock().intercepted.push(fragment.to_string());
        self
    }

    pub fn with_navigation_timeout(self) -> Self {
        self.lock().navigation_timeout = true;
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.lock().title = title.to_string();
        self
    }

    pub fn with_screenshot(self, bytes: &[u8]) -> Self {
        self.lock().screenshot = bytes.to_vec();
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    /// Returns the value last filled into a node whose selector contains `fragment`.
    pub fn filled_value(&self, fragment: &str) -> Option<String> {
        self.lock()
            .fills
            .iter()
            .rev()
            .find(|(selector, _)| selector.contains(fragment))
            .map(|(_, value)| value.clone())
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn forced_clicks(&self) -> Vec<String> {
        self.lock().forced_clicks.clone()
    }

    /// Dropdown options clicked, in order.
    pub fn selections(&self) -> Vec<String> {
        self.lock().selections.clone()
    }

    pub fn presses(&self) -> Vec<(String, String)> {
        self.lock().presses.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn query_count(&self) -> usize {
        self.lock().queries
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        if state.navigation_timeout {
            return Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<NodeHandle>, DriverError> {
        let mut state = self.lock();
        state.queries += 1;
        Ok(state
            .lookup(selector, true)
            .map(|_| NodeHandle::new(selector, selector)))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DriverError> {
        let mut state = self.lock();
        state.queries += 1;
        if MockState::matches_any(&state.absent, selector) {
            return Ok(Vec::new());
        }
        let items = match state.lists.get(selector) {
            Some(items) => items.clone(),
            None => state
                .last_fill
                .as_ref()
                .and_then(|term| state.search_results.get(term))
                .cloned()
                .unwrap_or_default(),
        };
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, text)| NodeHandle::new(format!("{OPTION_PREFIX}{i}:{text}"), selector))
            .collect())
    }

    async fn click(&self, node: &NodeHandle, options: ClickOptions) -> Result<(), DriverError> {
        let mut state = self.lock();
        if let Some(text) = MockState::option_text(&node.id) {
            let text = text.to_string();
            state.selections.push(text);
            return Ok(());
        }
        if MockState::matches_any(&state.close_on_click, &node.selector) {
            return Err(DriverError::ContextClosed(format!(
                "page closed while clicking {}",
                node.selector
            )));
        }
        if !options.force && MockState::matches_any(&state.intercepted, &node.selector) {
            return Err(DriverError::ClickIntercepted(node.selector.clone()));
        }
        if options.force {
            state.forced_clicks.push(node.selector.clone());
        }
        state.clicks.push(node.selector.clone());
        Ok(())
    }

    async fn fill(&self, node: &NodeHandle, text: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.fills.push((node.selector.clone(), text.to_string()));
        state.last_fill = Some(text.to_string());
        Ok(())
    }

    async fn press(&self, node: &NodeHandle, key: &str) -> Result<(), DriverError> {
        self.lock()
            .presses
            .push((node.selector.clone(), key.to_string()));
        Ok(())
    }

    async fn is_visible(&self, node: &NodeHandle) -> Result<bool, DriverError> {
        if node.id.starts_with(OPTION_PREFIX) {
            return Ok(true);
        }
        self.lock()
            .lookup(&node.selector, false)
            .map(|n| n.visible)
            .ok_or_else(|| DriverError::Detached(node.selector.clone()))
    }

    async fn is_enabled(&self, node: &NodeHandle) -> Result<bool, DriverError> {
        if node.id.starts_with(OPTION_PREFIX) {
            return Ok(true);
        }
        self.lock()
            .lookup(&node.selector, false)
            .map(|n| n.enabled)
            .ok_or_else(|| DriverError::Detached(node.selector.clone()))
    }

    async fn text(&self, node: &NodeHandle) -> Result<String, DriverError> {
        if let Some(text) = MockState::option_text(&node.id) {
            return Ok(text.to_string());
        }
        self.lock()
            .lookup(&node.selector, false)
            .map(|n| n.text)
            .ok_or_else(|| DriverError::Detached(node.selector.clone()))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.lock().scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.lock().title.clone())
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.lock().url.clone())
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, DriverError> {
        Ok(self.lock().screenshot.clone())
    }
}

/// Session provider that hands out clones of one shared mock page.
pub struct MockSessions {
    page: MockPage,
    failures_remaining: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl MockSessions {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            failures_remaining: AtomicUsize::new(0),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// The first `count` acquisitions fail with a driver error.
    pub fn failing(page: MockPage, count: usize) -> Self {
        let sessions = Self::new(page);
        sessions.failures_remaining.store(count, Ordering::SeqCst);
        sessions
    }

    pub fn page(&self) -> &MockPage {
        &self.page
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    async fn acquire(&self) -> Result<Box<dyn Page>, DriverError> {
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DriverError::Failed("browser session could not be launched".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.page.clone()))
    }

    async fn release(&self, _page: Box<dyn Page>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
