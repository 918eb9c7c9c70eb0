use std::time::Duration;

use hoard_core::{FailureKind, FetchOutcome, FinalState, ItemId, StrategyName};
use hoard_logging::{hoard_debug, hoard_info, hoard_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StrategyFinished {
        strategy: StrategyName,
        found: usize,
        new: usize,
    },
    StrategyFailed {
        strategy: StrategyName,
        message: String,
    },
    /// A transient failure; the request is retried after `delay`.
    Retrying {
        url: String,
        attempt: u32,
        delay: Duration,
        reason: FailureKind,
    },
    ItemResolved {
        item_id: ItemId,
        assets: usize,
    },
    AssetFinished(FetchOutcome),
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards engine events to the log facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::StrategyFinished {
                strategy,
                found,
                new,
            } => hoard_info!("[{strategy}] found {found} id(s), {new} new"),
            EngineEvent::StrategyFailed { strategy, message } => {
                hoard_warn!("[{strategy}] failed, coverage reduced: {message}")
            }
            EngineEvent::Retrying {
                url,
                attempt,
                delay,
                reason,
            } => hoard_warn!(
                "[retry] {reason} on attempt {} for {url}, sleeping {delay:?}",
                attempt + 1
            ),
            EngineEvent::ItemResolved { item_id, assets } => {
                hoard_info!("item {item_id}: {assets} asset(s)")
            }
            EngineEvent::AssetFinished(outcome) => match &outcome.final_state {
                FinalState::Written => hoard_info!("[ok] {}", outcome.path.display()),
                FinalState::Skipped => hoard_debug!("[skip] {}", outcome.path.display()),
                FinalState::Failed(reason) => hoard_warn!(
                    "[fail] {} after {} attempt(s): {reason}",
                    outcome.asset.url,
                    outcome.attempts
                ),
            },
        }
    }
}
