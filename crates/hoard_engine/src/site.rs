//! Site-specific endpoints and payload shapes.
//!
//! Everything that differs between sites lives behind [`SiteApi`]; discovery
//! and resolution only talk to this trait.

use std::sync::LazyLock;

use hoard_core::{AssetKind, AssetRef, FailureKind, ItemId};
use regex::Regex;
use serde_json::Value;
use url::Url;

/// Fields of an item's metadata the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMeta {
    pub first_page_url: Option<String>,
    pub page_count: u32,
    /// Animated item available as a single archive.
    pub composite: bool,
}

/// What a user asked to harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A user's whole gallery, enumerated by the discovery strategies.
    Gallery(String),
    /// One item, resolved and fetched without discovery.
    Item(ItemId),
    /// Any other page; the items it links to form the frontier.
    Page(String),
}

pub trait SiteApi: Send + Sync {
    /// Classify user input (an id or a URL); `None` when it names nothing
    /// this site can harvest.
    fn parse_target(&self, input: &str) -> Option<Target>;

    /// Canonical page of an item, used for warm-up and as request referer.
    fn item_page_url(&self, item: &ItemId) -> String;
    /// Landing page of a target's gallery.
    fn gallery_url(&self, target: &str) -> String;
    /// One page (1-based) of a target's paginated gallery.
    fn gallery_page_url(&self, target: &str, page: u32) -> String;
    /// CSS selector matching links to items on rendered gallery pages.
    fn item_link_selector(&self) -> &str;
    fn item_id_from_link(&self, href: &str) -> Option<ItemId>;

    fn bulk_listing_url(&self, target: &str) -> String;
    fn parse_bulk_listing(&self, payload: &Value) -> Vec<ItemId>;

    fn page_listing_url(&self, item: &ItemId) -> String;
    /// Original-asset URLs, one per page, in page order.
    fn parse_page_listing(&self, payload: &Value) -> Vec<String>;

    fn item_meta_url(&self, item: &ItemId) -> String;
    /// A missing body or a page count that is not a `u32` is malformed.
    fn parse_item_meta(&self, payload: &Value) -> Result<ItemMeta, FailureKind>;

    fn composite_meta_url(&self, item: &ItemId) -> String;
    fn parse_composite_meta(&self, payload: &Value) -> Option<String>;

    /// Whether `asset` points at a full-size original rather than a thumbnail.
    fn is_original_asset(&self, asset: &AssetRef) -> bool;
}

/// `illustType` value of animated items.
const COMPOSITE_ILLUST_TYPE: u64 = 2;

static DEFAULT_ORIGIN: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://www.pixiv.net/").expect("default origin"));
static DEFAULT_ORIGINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://i\.pximg\.net/img-original/").expect("original pattern")
});
static DEFAULT_ARCHIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://i\.pximg\.net/img-zip-ugoira/").expect("archive pattern")
});
static ANY_ORIGINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("/img-original/").expect("original pattern"));
static ANY_ARCHIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("/img-zip-ugoira/").expect("archive pattern"));
static ARTWORK_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/artworks/(\d+)$").expect("artwork link pattern"));
static USER_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/users/(\d+)").expect("user link pattern"));

/// A gallery site exposing an `/ajax/` JSON API next to its rendered pages.
#[derive(Debug, Clone)]
pub struct AjaxGallerySite {
    origin: Url,
    original_pattern: Regex,
    archive_pattern: Regex,
}

impl AjaxGallerySite {
    pub fn new(origin: Url, original_pattern: Regex, archive_pattern: Regex) -> Self {
        Self {
            origin,
            original_pattern,
            archive_pattern,
        }
    }

    /// Same site layout served from `origin`, accepting any asset whose URL
    /// contains `/img-original/` or `/img-zip-ugoira/`.
    pub fn with_origin(origin: Url) -> Self {
        Self::new(origin, ANY_ORIGINAL.clone(), ANY_ARCHIVE.clone())
    }

    fn join(&self, path: &str) -> String {
        self.origin
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.origin, path.trim_start_matches('/')))
    }
}

impl Default for AjaxGallerySite {
    fn default() -> Self {
        Self::new(
            DEFAULT_ORIGIN.clone(),
            DEFAULT_ORIGINAL.clone(),
            DEFAULT_ARCHIVE.clone(),
        )
    }
}

impl SiteApi for AjaxGallerySite {
    /// Numeric ids and `/users/{id}` URLs are galleries, `/artworks/{id}`
    /// URLs single items, and any other http(s) URL a page to scan.
    fn parse_target(&self, input: &str) -> Option<Target> {
        let input = input.trim();
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            return Some(Target::Gallery(input.to_string()));
        }
        let url = Url::parse(input).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if let Some(user) = USER_LINK.captures(url.path()).and_then(|c| c.get(1)) {
            return Some(Target::Gallery(user.as_str().to_string()));
        }
        if let Some(item) = self.item_id_from_link(url.as_str()) {
            return Some(Target::Item(item));
        }
        Some(Target::Page(url.to_string()))
    }

    fn item_page_url(&self, item: &ItemId) -> String {
        self.join(&format!("/artworks/{item}"))
    }

    fn gallery_url(&self, target: &str) -> String {
        self.join(&format!("/users/{target}/artworks"))
    }

    fn gallery_page_url(&self, target: &str, page: u32) -> String {
        self.join(&format!("/users/{target}/artworks?p={page}"))
    }

    fn item_link_selector(&self) -> &str {
        r#"a[href*="/artworks/"]"#
    }

    fn item_id_from_link(&self, href: &str) -> Option<ItemId> {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        ARTWORK_LINK
            .captures(path)
            .and_then(|captures| captures.get(1))
            .map(|id| ItemId::new(id.as_str()))
    }

    fn bulk_listing_url(&self, target: &str) -> String {
        self.join(&format!("/ajax/user/{target}/profile/all?lang=en"))
    }

    fn parse_bulk_listing(&self, payload: &Value) -> Vec<ItemId> {
        ["illusts", "manga"]
            .iter()
            // Empty sections come back as `[]` instead of `{}`.
            .filter_map(|section| payload["body"][section].as_object())
            .flat_map(|entries| entries.keys())
            .filter(|key| !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()))
            .map(|key| ItemId::new(key.as_str()))
            .collect()
    }

    fn page_listing_url(&self, item: &ItemId) -> String {
        self.join(&format!("/ajax/illust/{item}/pages?lang=en"))
    }

    fn parse_page_listing(&self, payload: &Value) -> Vec<String> {
        payload["body"]
            .as_array()
            .map(|pages| {
                pages
                    .iter()
                    .filter_map(|page| page["urls"]["original"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn item_meta_url(&self, item: &ItemId) -> String {
        self.join(&format!("/ajax/illust/{item}?lang=en"))
    }

    fn parse_item_meta(&self, payload: &Value) -> Result<ItemMeta, FailureKind> {
        let body = payload["body"]
            .as_object()
            .ok_or(FailureKind::MalformedPayload)?;
        let page_count = match body.get("pageCount") {
            None | Some(Value::Null) => 1,
            Some(value) => as_u64_lenient(value)
                .and_then(|count| u32::try_from(count).ok())
                .ok_or(FailureKind::MalformedPayload)?,
        };
        let illust_type = body.get("illustType").and_then(as_u64_lenient).unwrap_or(0);
        Ok(ItemMeta {
            first_page_url: payload["body"]["urls"]["original"]
                .as_str()
                .map(str::to_string),
            page_count,
            composite: illust_type == COMPOSITE_ILLUST_TYPE,
        })
    }

    fn composite_meta_url(&self, item: &ItemId) -> String {
        self.join(&format!("/ajax/illust/{item}/ugoira_meta?lang=en"))
    }

    fn parse_composite_meta(&self, payload: &Value) -> Option<String> {
        payload["body"]["originalSrc"]
            .as_str()
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string)
    }

    fn is_original_asset(&self, asset: &AssetRef) -> bool {
        match asset.kind {
            AssetKind::Static => self.original_pattern.is_match(&asset.url),
            AssetKind::Composite => self.archive_pattern.is_match(&asset.url),
        }
    }
}

/// Numbers sometimes arrive as strings.
fn as_u64_lenient(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
