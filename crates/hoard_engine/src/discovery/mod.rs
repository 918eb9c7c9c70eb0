//! Interchangeable ways of enumerating a target's items.
//!
//! Each strategy sees only part of the truth; the aggregator unions them.

mod bulk;
mod link_scan;
mod pagination;
mod scroll;

use std::collections::BTreeSet;

use hoard_core::{FailureKind, ItemId, StrategyName};
use thiserror::Error;

use crate::bridge::{BridgeError, ElementSnapshot};
use crate::site::SiteApi;

pub use bulk::BulkListingStrategy;
pub use link_scan::LinkScanStrategy;
pub use pagination::PaginationStrategy;
pub use scroll::{ScrollStrategy, CONTENT_EXTENT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("listing request failed: {0}")]
    Request(FailureKind),
}

#[async_trait::async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> StrategyName;
    async fn discover(&self, target_id: &str) -> Result<BTreeSet<ItemId>, DiscoveryError>;
}

/// Item ids referenced by rendered links.
pub(crate) fn ids_from_links(site: &dyn SiteApi, links: &[ElementSnapshot]) -> Vec<ItemId> {
    links
        .iter()
        .filter_map(|link| link.attribute("href"))
        .filter_map(|href| site.item_id_from_link(href))
        .collect()
}
