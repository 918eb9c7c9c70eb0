//! Hoard core: pure data model, ordering, retry policy and run accounting.
mod asset;
mod backoff;
mod config;
mod discovery;
mod failure;
mod frontier;
mod item;
mod summary;

pub use asset::{AssetKind, AssetRef, FetchOutcome, FinalState};
pub use backoff::{BackoffPolicy, RetryPolicy};
pub use config::{ConfigError, HarvestConfig};
pub use discovery::DiscoveryRound;
pub use failure::{ErrorClass, FailureKind};
pub use frontier::Frontier;
pub use item::{compare_numeric, ItemId, StrategyName, WorkItem};
pub use summary::{CoverageWarning, RecordedFailure, RunSummary};
