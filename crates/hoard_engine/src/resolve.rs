use std::sync::{Arc, LazyLock};

use hoard_core::{AssetRef, FailureKind, HarvestConfig, ItemId};
use hoard_logging::{hoard_debug, hoard_warn};
use regex::Regex;

use crate::http::JsonClient;
use crate::site::{ItemMeta, SiteApi};
use crate::{EngineEvent, ProgressSink};

static PAGE_ZERO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_p0(\.[a-z0-9]+)$").expect("page zero pattern"));

/// Maps a work item to the original assets it consists of.
pub struct AssetResolver {
    site: Arc<dyn SiteApi>,
    http: JsonClient,
    fetch_composites: bool,
    max_pages_per_item: u32,
}

impl AssetResolver {
    pub fn new(site: Arc<dyn SiteApi>, http: JsonClient, fetch_composites: bool) -> Self {
        Self {
            site,
            http,
            fetch_composites,
            max_pages_per_item: HarvestConfig::default().max_pages_per_item,
        }
    }

    /// Metadata claiming more pages than this is rejected as malformed.
    pub fn with_page_limit(mut self, max_pages_per_item: u32) -> Self {
        self.max_pages_per_item = max_pages_per_item;
        self
    }

    /// Page listing first, item metadata second; the first non-empty tier
    /// wins. Thumbnails that slip through either tier are dropped.
    pub async fn resolve(&self, item: &ItemId, sink: &dyn ProgressSink) -> Vec<AssetRef> {
        let referer = self.site.item_page_url(item);

        let mut assets = self.from_page_listing(item, &referer, sink).await;
        if assets.is_empty() {
            assets = self.from_item_meta(item, &referer, sink).await;
        }

        let before = assets.len();
        assets.retain(|asset| self.site.is_original_asset(asset));
        if assets.len() < before {
            hoard_debug!(
                "item {item}: dropped {} non-original url(s)",
                before - assets.len()
            );
        }
        if assets.is_empty() {
            hoard_warn!("item {item}: no original asset urls found");
        }

        sink.emit(EngineEvent::ItemResolved {
            item_id: item.clone(),
            assets: assets.len(),
        });
        assets
    }

    async fn from_page_listing(
        &self,
        item: &ItemId,
        referer: &str,
        sink: &dyn ProgressSink,
    ) -> Vec<AssetRef> {
        let url = self.site.page_listing_url(item);
        match self.http.get_json(&url, referer, sink).await {
            Ok(payload) => self
                .site
                .parse_page_listing(&payload)
                .into_iter()
                .enumerate()
                .map(|(page, url)| AssetRef::page(item, url, page as u32))
                .collect(),
            Err(reason) => {
                hoard_debug!("item {item}: page listing unavailable ({reason})");
                Vec::new()
            }
        }
    }

    async fn from_item_meta(
        &self,
        item: &ItemId,
        referer: &str,
        sink: &dyn ProgressSink,
    ) -> Vec<AssetRef> {
        let url = self.site.item_meta_url(item);
        let meta = self
            .http
            .get_json(&url, referer, sink)
            .await
            .and_then(|payload| self.site.parse_item_meta(&payload))
            .and_then(|meta| self.check_page_count(item, meta));
        let meta = match meta {
            Ok(meta) => meta,
            Err(reason) => {
                hoard_debug!("item {item}: metadata unavailable ({reason})");
                return Vec::new();
            }
        };

        if meta.composite && self.fetch_composites {
            if let Some(archive) = self.composite_url(item, referer, sink).await {
                return vec![AssetRef::composite(item, archive)];
            }
            hoard_warn!("item {item}: composite archive unavailable, keeping static pages");
        }
        self.expand_pages(item, &meta)
    }

    async fn composite_url(
        &self,
        item: &ItemId,
        referer: &str,
        sink: &dyn ProgressSink,
    ) -> Option<String> {
        let url = self.site.composite_meta_url(item);
        match self.http.get_json(&url, referer, sink).await {
            Ok(payload) => self.site.parse_composite_meta(&payload),
            Err(reason) => {
                hoard_debug!("item {item}: composite metadata unavailable ({reason})");
                None
            }
        }
    }

    fn check_page_count(&self, item: &ItemId, meta: ItemMeta) -> Result<ItemMeta, FailureKind> {
        if meta.page_count > self.max_pages_per_item {
            hoard_warn!(
                "item {item}: metadata claims {} pages, limit is {}",
                meta.page_count,
                self.max_pages_per_item
            );
            return Err(FailureKind::MalformedPayload);
        }
        Ok(meta)
    }

    /// Derive every page URL from the first one by rewriting its `_p0` token.
    fn expand_pages(&self, item: &ItemId, meta: &ItemMeta) -> Vec<AssetRef> {
        let Some(first) = meta.first_page_url.as_deref() else {
            return Vec::new();
        };
        if !PAGE_ZERO.is_match(first) {
            return vec![AssetRef::page(item, first, 0)];
        }
        (0..meta.page_count.max(1))
            .map(|page| {
                let url = PAGE_ZERO
                    .replace(first, format!("_p{page}${{1}}").as_str())
                    .into_owned();
                AssetRef::page(item, url, page)
            })
            .collect()
    }
}
