use std::path::PathBuf;

use crate::{FailureKind, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// One page image of an item.
    Static,
    /// Multi-frame animation delivered as a single archive.
    Composite,
}

/// One fetchable binary belonging to a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub owner_item_id: ItemId,
    pub url: String,
    pub page_index: u32,
    pub kind: AssetKind,
}

impl AssetRef {
    pub fn page(owner: &ItemId, url: impl Into<String>, page_index: u32) -> Self {
        Self {
            owner_item_id: owner.clone(),
            url: url.into(),
            page_index,
            kind: AssetKind::Static,
        }
    }

    pub fn composite(owner: &ItemId, url: impl Into<String>) -> Self {
        Self {
            owner_item_id: owner.clone(),
            url: url.into(),
            page_index: 0,
            kind: AssetKind::Composite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalState {
    Written,
    /// The destination already existed; no request was made.
    Skipped,
    Failed(FailureKind),
}

/// Terminal record of one asset fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub asset: AssetRef,
    pub attempts: u32,
    pub final_state: FinalState,
    pub path: PathBuf,
}

impl FetchOutcome {
    pub fn is_written(&self) -> bool {
        self.final_state == FinalState::Written
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match &self.final_state {
            FinalState::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}
