use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BackoffPolicy, RetryPolicy, StrategyName};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Immutable run configuration, handed to the aggregator at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub strategies: BTreeSet<StrategyName>,
    /// Upper bound for the pagination strategy (pages 1..=max_pages).
    pub max_pages: u32,
    /// Largest page count accepted from an item's metadata.
    pub max_pages_per_item: u32,
    pub scroll_max_rounds: u32,
    /// Consecutive no-growth rounds that end the scroll strategy.
    pub stability_threshold: u32,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub jitter_ceiling_ms: u64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub output_root: PathBuf,
    pub concurrency: usize,
    pub warm_up: bool,
    pub warm_up_dwell_ms: u64,
    /// Pause after navigation or scrolling so the page can render.
    pub page_settle_ms: u64,
    pub fetch_composites: bool,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyName::ALL.into_iter().collect(),
            max_pages: 120,
            max_pages_per_item: 200,
            scroll_max_rounds: 80,
            stability_threshold: 3,
            max_retries: 5,
            backoff_base_ms: 700,
            jitter_ceiling_ms: 300,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            output_root: PathBuf::from("downloads"),
            concurrency: 3,
            warm_up: true,
            warm_up_dwell_ms: 600,
            page_settle_ms: 900,
            fetch_composites: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en;q=0.9".to_string(),
        }
    }
}

impl HarvestConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: HarvestConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.max_retries == 0, "max_retries must be at least 1"),
            (self.concurrency == 0, "concurrency must be at least 1"),
            (
                self.stability_threshold == 0,
                "stability_threshold must be at least 1",
            ),
            (
                self.scroll_max_rounds == 0,
                "scroll_max_rounds must be at least 1",
            ),
            (self.max_pages == 0, "max_pages must be at least 1"),
            (
                self.max_pages_per_item == 0,
                "max_pages_per_item must be at least 1",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid((*message).to_string())),
            None => Ok(()),
        }
    }

    pub fn is_enabled(&self, strategy: StrategyName) -> bool {
        self.strategies.contains(&strategy)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.jitter_ceiling_ms),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn warm_up_dwell(&self) -> Duration {
        Duration::from_millis(self.warm_up_dwell_ms)
    }
}
