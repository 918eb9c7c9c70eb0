use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use hoard_core::{ItemId, StrategyName};
use hoard_logging::hoard_info;

use super::{ids_from_links, DiscoveryError, DiscoveryStrategy};
use crate::bridge::BrowserSession;
use crate::site::SiteApi;

/// Loads one page and collects the items it links to.
pub struct LinkScanStrategy {
    session: Arc<BrowserSession>,
    site: Arc<dyn SiteApi>,
    page: Option<String>,
    settle: Duration,
}

impl LinkScanStrategy {
    /// Scans the landing page of whatever target it is asked about.
    pub fn new(session: Arc<BrowserSession>, site: Arc<dyn SiteApi>, settle: Duration) -> Self {
        Self {
            session,
            site,
            page: None,
            settle,
        }
    }

    /// Scans `url` regardless of the target.
    pub fn for_page(
        session: Arc<BrowserSession>,
        site: Arc<dyn SiteApi>,
        url: impl Into<String>,
        settle: Duration,
    ) -> Self {
        Self {
            page: Some(url.into()),
            ..Self::new(session, site, settle)
        }
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for LinkScanStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::LinkScan
    }

    async fn discover(&self, target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        let url = match &self.page {
            Some(url) => url.clone(),
            None => self.site.gallery_url(target_id),
        };
        let bridge = self.session.acquire().await;
        bridge.navigate(&url).await?;
        tokio::time::sleep(self.settle).await;
        let links = bridge.find_elements(self.site.item_link_selector()).await?;

        let ids: BTreeSet<ItemId> = ids_from_links(self.site.as_ref(), &links)
            .into_iter()
            .collect();
        hoard_info!("[link_scan] {url}: {} id(s)", ids.len());
        Ok(ids)
    }
}
