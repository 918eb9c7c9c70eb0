use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The enumeration technique that first (or also) observed an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    BulkListing,
    Pagination,
    Scroll,
    /// One scan of a page's item links, without scrolling or paging.
    LinkScan,
}

impl StrategyName {
    /// The gallery strategies enabled by default.
    pub const ALL: [StrategyName; 3] = [
        StrategyName::BulkListing,
        StrategyName::Pagination,
        StrategyName::Scroll,
    ];
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyName::BulkListing => write!(f, "bulk_listing"),
            StrategyName::Pagination => write!(f, "pagination"),
            StrategyName::Scroll => write!(f, "scroll"),
            StrategyName::LinkScan => write!(f, "link_scan"),
        }
    }
}

/// Site-assigned identifier of a work item.
///
/// Ordering is numeric for all-digit identifiers, so `"9" < "10"`. Numeric
/// identifiers sort before anything else; non-numeric ones fall back to
/// lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        digits(&self.0).is_some()
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_numeric(&self.0, &other.0)
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Compare two identifiers by numeric value without parsing, so ids longer
/// than `u64` still order correctly.
pub fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (digits(a), digits(b)) {
        (Some(x), Some(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| x.cmp(y))
            // "7" and "007" are equal in value but distinct ids.
            .then_with(|| a.len().cmp(&b.len())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn digits(raw: &str) -> Option<&str> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.trim_start_matches('0'))
}

/// One entry of the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: ItemId,
    pub discovered_by: BTreeSet<StrategyName>,
}
