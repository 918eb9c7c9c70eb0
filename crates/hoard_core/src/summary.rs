use std::fmt;

use crate::{FailureKind, FetchOutcome, FinalState, ItemId, StrategyName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    pub item_id: ItemId,
    pub url: Option<String>,
    pub reason: FailureKind,
}

/// A discovery strategy that failed; the run continued with reduced recall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageWarning {
    pub strategy: StrategyName,
    pub message: String,
}

/// Final report of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub target_id: String,
    pub discovered: usize,
    pub resolved: usize,
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<RecordedFailure>,
    pub coverage_warnings: Vec<CoverageWarning>,
    /// Items never started because the run was cancelled.
    pub not_started: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(target_id: impl Into<String>, discovered: usize) -> Self {
        Self {
            target_id: target_id.into(),
            discovered,
            resolved: 0,
            written: 0,
            skipped: 0,
            failures: Vec::new(),
            coverage_warnings: Vec::new(),
            not_started: 0,
            cancelled: false,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn record_resolution(&mut self, item_id: &ItemId, asset_count: usize) {
        if asset_count == 0 {
            self.failures.push(RecordedFailure {
                item_id: item_id.clone(),
                url: None,
                reason: FailureKind::ResolutionEmpty,
            });
        } else {
            self.resolved += 1;
        }
    }

    pub fn record_outcome(&mut self, outcome: &FetchOutcome) {
        match &outcome.final_state {
            FinalState::Written => self.written += 1,
            FinalState::Skipped => self.skipped += 1,
            FinalState::Failed(reason) => self.failures.push(RecordedFailure {
                item_id: outcome.asset.owner_item_id.clone(),
                url: Some(outcome.asset.url.clone()),
                reason: reason.clone(),
            }),
        }
    }

    pub fn record_not_started(&mut self) {
        self.not_started += 1;
        self.cancelled = true;
    }

    pub fn warn_coverage(&mut self, strategy: StrategyName, message: impl Into<String>) {
        self.coverage_warnings.push(CoverageWarning {
            strategy,
            message: message.into(),
        });
    }

    pub fn failed_item_ids(&self) -> Vec<&ItemId> {
        let mut ids: Vec<&ItemId> = self.failures.iter().map(|f| &f.item_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "target {}: discovered={} resolved={} written={} skipped={} failed={}",
            self.target_id,
            self.discovered,
            self.resolved,
            self.written,
            self.skipped,
            self.failed()
        )?;
        if !self.coverage_warnings.is_empty() {
            writeln!(f, "coverage warnings: {}", self.coverage_warnings.len())?;
            for warning in &self.coverage_warnings {
                writeln!(f, "  [{}] {}", warning.strategy, warning.message)?;
            }
        }
        if self.cancelled {
            writeln!(f, "cancelled: {} item(s) not started", self.not_started)?;
        }
        for failure in &self.failures {
            match &failure.url {
                Some(url) => writeln!(f, "  failed {} {}: {}", failure.item_id, url, failure.reason)?,
                None => writeln!(f, "  failed {}: {}", failure.item_id, failure.reason)?,
            }
        }
        Ok(())
    }
}
