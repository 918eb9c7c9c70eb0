use std::collections::BTreeSet;

use crate::ItemId;

/// Transient state of one incremental discovery run.
///
/// A round counts as growth when either the rendered content extent or the
/// number of known ids increased; lazy-loaded pages can grow before new ids
/// become parseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRound {
    items_so_far: BTreeSet<ItemId>,
    no_growth_streak: u32,
    last_extent: u64,
    rounds: u32,
}

impl DiscoveryRound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scan into the round state; returns whether it grew.
    pub fn observe<I>(&mut self, extent: u64, ids: I) -> bool
    where
        I: IntoIterator<Item = ItemId>,
    {
        let before = self.items_so_far.len();
        self.items_so_far.extend(ids);
        let grew = extent > self.last_extent || self.items_so_far.len() > before;

        self.last_extent = self.last_extent.max(extent);
        self.rounds += 1;
        if grew {
            self.no_growth_streak = 0;
        } else {
            self.no_growth_streak += 1;
        }
        grew
    }

    /// Add ids without counting a round (final sweep).
    pub fn absorb<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ItemId>,
    {
        let before = self.items_so_far.len();
        self.items_so_far.extend(ids);
        self.items_so_far.len() - before
    }

    pub fn is_stable(&self, threshold: u32) -> bool {
        self.no_growth_streak >= threshold
    }

    pub fn no_growth_streak(&self) -> u32 {
        self.no_growth_streak
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn len(&self) -> usize {
        self.items_so_far.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items_so_far.is_empty()
    }

    pub fn into_items(self) -> BTreeSet<ItemId> {
        self.items_so_far
    }
}
