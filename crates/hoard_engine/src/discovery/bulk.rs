use std::collections::BTreeSet;
use std::sync::Arc;

use hoard_core::{ItemId, StrategyName};

use super::{DiscoveryError, DiscoveryStrategy};
use crate::http::JsonClient;
use crate::site::SiteApi;
use crate::ProgressSink;

/// One API call that lists every item of a target, when the site has one.
pub struct BulkListingStrategy {
    site: Arc<dyn SiteApi>,
    http: JsonClient,
    sink: Arc<dyn ProgressSink>,
}

impl BulkListingStrategy {
    pub fn new(site: Arc<dyn SiteApi>, http: JsonClient, sink: Arc<dyn ProgressSink>) -> Self {
        Self { site, http, sink }
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for BulkListingStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::BulkListing
    }

    async fn discover(&self, target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError> {
        let url = self.site.bulk_listing_url(target_id);
        let referer = self.site.gallery_url(target_id);
        let payload = self
            .http
            .get_json(&url, &referer, self.sink.as_ref())
            .await
            .map_err(DiscoveryError::Request)?;
        Ok(self.site.parse_bulk_listing(&payload).into_iter().collect())
    }
}
