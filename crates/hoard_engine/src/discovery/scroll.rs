use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use hoard_core::{DiscoveryRound, ItemId, StrategyName};
use hoard_logging::{hoard_debug, hoard_info, hoard_warn};
use tokio_util::sync::CancellationToken;

use super::{ids_from_links, DiscoveryError, DiscoveryStrategy};
use crate::bridge::{BrowserSession, SessionBridge};
use crate::site::SiteApi;

pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";
pub const CONTENT_EXTENT_SCRIPT: &str = "return document.body.scrollHeight;";

/// Keeps triggering lazy loading until neither the page nor the id set grows
/// for `stability_threshold` consecutive rounds.
pub struct ScrollStrategy {
    session: Arc<BrowserSession>,
    site: Arc<dyn SiteApi>,
    max_rounds: u32,
    stability_threshold: u32,
    settle: Duration,
    cancel: CancellationToken,
}

impl ScrollStrategy {
    pub fn new(
        session: Arc<BrowserSession>,
        site: Arc<dyn SiteApi>,
        max_rounds: u32,
        stability_threshold: u32,
        settle: Duration,
    ) -> Self {
        Self {
            session,
            site,
            max_rounds,
            stability_threshold,
            settle,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between rounds once `cancel` fires, keeping what was found.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn scan(&self, bridge: &dyn SessionBridge) -> Result<Vec<ItemId>, DiscoveryError> {
        let links = bridge.find_elements(self.site.item_link_selector()).await?;
        Ok(ids_from_links(self.site.as_ref(), &links))
    }

    async fn round(&self, bridge: &dyn SessionBridge) -> Result<(u64, Vec<ItemId>), DiscoveryError> {
        bridge.execute_script(SCROLL_TO_BOTTOM_SCRIPT).await?;
        tokio::time::sleep(self.settle).await;
        let extent = bridge
            .execute_script(CONTENT_EXTENT_SCRIPT)
            .await?
            .as_u64()
            .unwrap_or(0);
        Ok((extent, self.scan(bridge).await?))
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for ScrollStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Scroll
    }

    async fn discover(&self, target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        let bridge = self.session.acquire().await;
        bridge.navigate(&self.site.gallery_url(target_id)).await?;
        tokio::time::sleep(self.settle).await;

        let mut state = DiscoveryRound::new();
        while state.rounds() < self.max_rounds {
            if self.cancel.is_cancelled() {
                hoard_warn!("[scroll] cancelled after {} round(s)", state.rounds());
                return Ok(state.into_items());
            }
            match self.round(&**bridge).await {
                Ok((extent, ids)) => {
                    state.observe(extent, ids);
                }
                Err(err) if state.is_empty() => return Err(err),
                Err(err) => {
                    hoard_warn!("[scroll] round {}: {err}", state.rounds() + 1);
                    break;
                }
            }
            hoard_debug!(
                "[scroll] ids={} stable={}/{}",
                state.len(),
                state.no_growth_streak(),
                self.stability_threshold
            );
            if state.is_stable(self.stability_threshold) {
                break;
            }
        }

        // Content may have rendered during the last settle delay.
        match self.scan(&**bridge).await {
            Ok(ids) => {
                let added = state.absorb(ids);
                if added > 0 {
                    hoard_debug!("[scroll] final sweep added {added} id(s)");
                }
            }
            Err(err) => hoard_warn!("[scroll] final sweep failed: {err}"),
        }

        hoard_info!(
            "[scroll] {} id(s) after {} round(s)",
            state.len(),
            state.rounds()
        );
        Ok(state.into_items())
    }
}
