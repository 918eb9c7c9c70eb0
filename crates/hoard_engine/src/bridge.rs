//! Capability interface over an interactive browser session.
//!
//! The engine never assumes a particular automation backend: anything that can
//! hand over cookies, navigate, run a script and query elements can drive
//! discovery. The session is a singleton, so all access goes through
//! [`BrowserSession`], which serialises callers.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
}

fn root_path() -> String {
    "/".to_string()
}

/// Attribute snapshot of one rendered element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    attributes: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn new<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("browser session unavailable: {0}")]
    Unavailable(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("script failed: {0}")]
    Script(String),
    #[error("invalid selector {0:?}")]
    Selector(String),
    #[error("tab operation failed: {0}")]
    Tab(String),
}

#[async_trait::async_trait]
pub trait SessionBridge: Send + Sync {
    async fn current_cookies(&self) -> Result<Vec<Cookie>, BridgeError>;
    async fn navigate(&self, url: &str) -> Result<(), BridgeError>;
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BridgeError>;
    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementSnapshot>, BridgeError>;
    async fn open_tab(&self) -> Result<(), BridgeError>;
    async fn close_tab(&self) -> Result<(), BridgeError>;
}

/// Exclusive access wrapper around the one browser session of a run.
pub struct BrowserSession {
    bridge: Mutex<Box<dyn SessionBridge>>,
}

impl BrowserSession {
    pub fn new(bridge: Box<dyn SessionBridge>) -> Self {
        Self {
            bridge: Mutex::new(bridge),
        }
    }

    /// Hold the session for a whole sequence of page interactions.
    pub async fn acquire(&self) -> MutexGuard<'_, Box<dyn SessionBridge>> {
        self.bridge.lock().await
    }

    pub async fn cookies(&self) -> Result<Vec<Cookie>, BridgeError> {
        self.acquire().await.current_cookies().await
    }

    /// Visit `url` in a throwaway tab, the way a person would open an item
    /// before its data is requested.
    pub async fn warm_up(&self, url: &str, dwell: Duration) -> Result<(), BridgeError> {
        let bridge = self.acquire().await;
        bridge.open_tab().await?;
        let visited = bridge.navigate(url).await;
        if visited.is_ok() {
            tokio::time::sleep(jittered(dwell)).await;
        }
        let closed = bridge.close_tab().await;
        visited.and(closed)
    }
}

/// `dwell` plus up to half of it again.
fn jittered(dwell: Duration) -> Duration {
    let extra = rand::thread_rng().gen_range(0.0..0.5);
    dwell + dwell.mul_f64(extra)
}

/// Read cookies exported from a browser profile as a JSON array of
/// `{name, value, domain, path}` objects.
pub fn load_cookie_file(path: &Path) -> Result<Vec<Cookie>, BridgeError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| BridgeError::Unavailable(format!("{}: {err}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|err| BridgeError::Unavailable(format!("{}: {err}", path.display())))
}
