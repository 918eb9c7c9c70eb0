//! Hoard engine: discovery, resolution and download over a browser session.
mod aggregator;
mod bridge;
mod discovery;
mod fetch;
mod filename;
mod http;
mod persist;
mod resolve;
mod retry;
mod site;
mod static_bridge;
mod types;

pub use aggregator::{FrontierAggregator, RunError, LOOSE_ITEMS_DIR};
pub use bridge::{load_cookie_file, BridgeError, BrowserSession, Cookie, ElementSnapshot, SessionBridge};
pub use discovery::{
    BulkListingStrategy, DiscoveryError, DiscoveryStrategy, LinkScanStrategy, PaginationStrategy,
    ScrollStrategy, CONTENT_EXTENT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT,
};
pub use fetch::FetchWorker;
pub use filename::{asset_file_name, page_token, sanitize_component};
pub use http::{build_client, HttpSettings, JsonClient};
pub use persist::{ensure_output_dir, PartialFile, PersistError};
pub use resolve::AssetResolver;
pub use retry::{with_retries, Attempted};
pub use site::{AjaxGallerySite, ItemMeta, SiteApi, Target};
pub use static_bridge::StaticPageBridge;
pub use types::{EngineEvent, LogSink, ProgressSink};
