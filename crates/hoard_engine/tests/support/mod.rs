#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use hoard_core::{BackoffPolicy, HarvestConfig, ItemId, RetryPolicy, StrategyName};
use hoard_engine::{
    BridgeError, Cookie, DiscoveryError, DiscoveryStrategy, ElementSnapshot, EngineEvent,
    ProgressSink, SessionBridge, SCROLL_TO_BOTTOM_SCRIPT,
};
use tokio_util::sync::CancellationToken;

pub const SITE: &str = "https://site.test/";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(hoard_logging::initialize_for_tests);
}

pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_retries,
        BackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(2)),
    )
}

/// Config with no real waiting, writing under `output_root`.
pub fn fast_config(output_root: &std::path::Path) -> HarvestConfig {
    HarvestConfig {
        output_root: output_root.to_path_buf(),
        max_retries: 3,
        backoff_base_ms: 5,
        jitter_ceiling_ms: 2,
        request_timeout_ms: 2_000,
        page_settle_ms: 0,
        warm_up_dwell_ms: 0,
        concurrency: 2,
        ..HarvestConfig::default()
    }
}

pub fn ids(raw: &[&str]) -> BTreeSet<ItemId> {
    raw.iter().map(|id| ItemId::from(*id)).collect()
}

#[derive(Default)]
pub struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn retry_delays(&self) -> Vec<(u32, Duration)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Retrying { attempt, delay, .. } => Some((*attempt, *delay)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Default)]
struct BridgeState {
    current: Option<String>,
    parked: Vec<Option<String>>,
    scrolls: usize,
    navigations: Vec<String>,
    tabs_opened: usize,
}

/// In-memory browser: fixed pages by URL, plus an infinite-scroll page where
/// each scroll reveals the next batch of items.
#[derive(Default)]
pub struct ScriptedBridge {
    pages: HashMap<String, Vec<String>>,
    scroll_batches: Vec<Vec<String>>,
    fail_cookies: bool,
    fail_after_navigations: Option<usize>,
    state: Arc<Mutex<BridgeState>>,
}

/// Observer that stays valid after the bridge is boxed into a session.
#[derive(Clone)]
pub struct BridgeRecorder {
    state: Arc<Mutex<BridgeState>>,
}

impl BridgeRecorder {
    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn tabs_opened(&self) -> usize {
        self.state.lock().unwrap().tabs_opened
    }

    pub fn open_tabs(&self) -> usize {
        self.state.lock().unwrap().parked.len()
    }
}

pub fn artwork_href(id: &str) -> String {
    format!("{SITE}artworks/{id}?ref=gallery")
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, item_ids: &[&str]) -> Self {
        self.pages
            .insert(url.into(), item_ids.iter().map(|id| artwork_href(id)).collect());
        self
    }

    pub fn with_scroll_batches(mut self, batches: Vec<Vec<String>>) -> Self {
        self.scroll_batches = batches
            .into_iter()
            .map(|batch| batch.iter().map(|id| artwork_href(id)).collect())
            .collect();
        self
    }

    pub fn failing_cookies(mut self) -> Self {
        self.fail_cookies = true;
        self
    }

    pub fn failing_after_navigations(mut self, count: usize) -> Self {
        self.fail_after_navigations = Some(count);
        self
    }

    pub fn recorder(&self) -> BridgeRecorder {
        BridgeRecorder {
            state: self.state.clone(),
        }
    }

    fn visible_links(&self, state: &BridgeState) -> Vec<String> {
        let Some(current) = state.current.as_ref() else {
            return Vec::new();
        };
        if let Some(links) = self.pages.get(current) {
            return links.clone();
        }
        let revealed = state.scrolls.min(self.scroll_batches.len());
        self.scroll_batches[..revealed].concat()
    }
}

#[async_trait::async_trait]
impl SessionBridge for ScriptedBridge {
    async fn current_cookies(&self) -> Result<Vec<Cookie>, BridgeError> {
        if self.fail_cookies {
            return Err(BridgeError::Unavailable("driver not running".into()));
        }
        Ok(vec![Cookie {
            name: "session".into(),
            value: "abc".into(),
            domain: ".site.test".into(),
            path: "/".into(),
        }])
    }

    async fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = self.fail_after_navigations {
            if state.navigations.len() >= limit {
                return Err(BridgeError::Navigation {
                    url: url.to_string(),
                    message: "tab crashed".into(),
                });
            }
        }
        state.navigations.push(url.to_string());
        state.current = Some(url.to_string());
        state.scrolls = 0;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BridgeError> {
        let mut state = self.state.lock().unwrap();
        if script == SCROLL_TO_BOTTOM_SCRIPT {
            state.scrolls += 1;
            return Ok(serde_json::Value::Null);
        }
        let extent = self.visible_links(&state).len() as u64 * 100;
        Ok(serde_json::Value::from(extent))
    }

    async fn find_elements(&self, _selector: &str) -> Result<Vec<ElementSnapshot>, BridgeError> {
        let state = self.state.lock().unwrap();
        Ok(self
            .visible_links(&state)
            .into_iter()
            .map(|href| ElementSnapshot::new([("href", href)]))
            .collect())
    }

    async fn open_tab(&self) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        let previous = state.current.take();
        state.parked.push(previous);
        state.tabs_opened += 1;
        Ok(())
    }

    async fn close_tab(&self) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        match state.parked.pop() {
            Some(previous) => {
                state.current = previous;
                Ok(())
            }
            None => Err(BridgeError::Tab("no tab to close".into())),
        }
    }
}

/// Strategy returning a fixed id set.
pub struct FixedStrategy {
    pub name: StrategyName,
    pub ids: Vec<&'static str>,
}

#[async_trait::async_trait]
impl DiscoveryStrategy for FixedStrategy {
    fn name(&self) -> StrategyName {
        self.name
    }

    async fn discover(&self, _target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        Ok(ids(&self.ids))
    }
}

pub struct FailingStrategy(pub StrategyName);

#[async_trait::async_trait]
impl DiscoveryStrategy for FailingStrategy {
    fn name(&self) -> StrategyName {
        self.0
    }

    async fn discover(&self, _target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        Err(DiscoveryError::Bridge(BridgeError::Unavailable(
            "renderer gone".into(),
        )))
    }
}

/// Finds its ids, then pulls the plug on the run.
pub struct CancellingStrategy {
    pub token: CancellationToken,
    pub ids: Vec<&'static str>,
}

#[async_trait::async_trait]
impl DiscoveryStrategy for CancellingStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::BulkListing
    }

    async fn discover(&self, _target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        self.token.cancel();
        Ok(ids(&self.ids))
    }
}
