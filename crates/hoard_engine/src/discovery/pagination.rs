use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use hoard_core::{ItemId, StrategyName};
use hoard_logging::{hoard_info, hoard_warn};
use tokio_util::sync::CancellationToken;

use super::{ids_from_links, DiscoveryError, DiscoveryStrategy};
use crate::bridge::{BridgeError, BrowserSession, ElementSnapshot, SessionBridge};
use crate::site::SiteApi;

/// Walks `?p=1..=max_pages` until a page adds nothing new.
pub struct PaginationStrategy {
    session: Arc<BrowserSession>,
    site: Arc<dyn SiteApi>,
    max_pages: u32,
    settle: Duration,
    cancel: CancellationToken,
}

impl PaginationStrategy {
    pub fn new(
        session: Arc<BrowserSession>,
        site: Arc<dyn SiteApi>,
        max_pages: u32,
        settle: Duration,
    ) -> Self {
        Self {
            session,
            site,
            max_pages,
            settle,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between pages once `cancel` fires, keeping what was found.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn scan_page(
        &self,
        bridge: &dyn SessionBridge,
        url: &str,
    ) -> Result<Vec<ElementSnapshot>, BridgeError> {
        bridge.navigate(url).await?;
        tokio::time::sleep(self.settle).await;
        bridge.find_elements(self.site.item_link_selector()).await
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for PaginationStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Pagination
    }

    async fn discover(&self, target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        let bridge = self.session.acquire().await;
        let mut ids = BTreeSet::new();

        for page in 1..=self.max_pages {
            if self.cancel.is_cancelled() {
                hoard_warn!("[pagination] cancelled before p={page}");
                break;
            }
            let url = self.site.gallery_page_url(target_id, page);
            let links = match self.scan_page(&**bridge, &url).await {
                Ok(links) => links,
                Err(err) if ids.is_empty() => return Err(err.into()),
                Err(err) => {
                    hoard_warn!("[pagination] p={page}: {err}; keeping {} id(s)", ids.len());
                    break;
                }
            };

            let before = ids.len();
            ids.extend(ids_from_links(self.site.as_ref(), &links));
            hoard_info!("[pagination] p={page}: {} id(s) so far", ids.len());
            if ids.len() == before {
                break;
            }
        }
        Ok(ids)
    }
}
