use std::collections::{BTreeMap, BTreeSet};

use crate::{ItemId, StrategyName, WorkItem};

/// Deduplicated union of every strategy's findings, kept in numeric id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    items: BTreeMap<ItemId, BTreeSet<StrategyName>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one strategy's output. Returns how many ids were new to the frontier.
    pub fn record<I>(&mut self, strategy: StrategyName, ids: I) -> usize
    where
        I: IntoIterator<Item = ItemId>,
    {
        let mut added = 0;
        for id in ids {
            let sources = self.items.entry(id).or_insert_with(|| {
                added += 1;
                BTreeSet::new()
            });
            sources.insert(strategy);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Work items in ascending numeric id order.
    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
            .into_iter()
            .map(|(id, discovered_by)| WorkItem { id, discovered_by })
            .collect()
    }
}
