use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use hoard_core::{
    ConfigError, CoverageWarning, FailureKind, FetchOutcome, FinalState, Frontier, HarvestConfig,
    ItemId, RunSummary, StrategyName, WorkItem,
};
use hoard_logging::{hoard_info, hoard_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bridge::{BridgeError, BrowserSession, SessionBridge};
use crate::discovery::{
    BulkListingStrategy, DiscoveryStrategy, LinkScanStrategy, PaginationStrategy, ScrollStrategy,
};
use crate::fetch::FetchWorker;
use crate::filename::{asset_file_name, sanitize_component};
use crate::http::{build_client, HttpSettings, JsonClient};
use crate::persist::{ensure_output_dir, PersistError};
use crate::resolve::AssetResolver;
use crate::site::{SiteApi, Target};
use crate::{EngineEvent, ProgressSink};

/// Directory under the output root shared by single items and scanned pages.
pub const LOOSE_ITEMS_DIR: &str = "items";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("session bridge failed to initialise: {0}")]
    BridgeUnavailable(BridgeError),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    /// The target directory could not be created; no item of the target
    /// was started.
    #[error("output directory {path:?}: {source}")]
    Output { path: PathBuf, source: PersistError },
}

enum ItemReport {
    NotStarted,
    Processed {
        item_id: ItemId,
        asset_count: usize,
        outcomes: Vec<FetchOutcome>,
        interrupted: bool,
    },
}

/// Runs the enabled discovery strategies, unions their findings into one
/// ordered frontier and drives resolution and download over it.
pub struct FrontierAggregator {
    config: Arc<HarvestConfig>,
    session: Arc<BrowserSession>,
    site: Arc<dyn SiteApi>,
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
    resolver: AssetResolver,
    worker: FetchWorker,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl FrontierAggregator {
    /// Seed an HTTP client from the bridge's cookies and build every enabled
    /// strategy. Failing to read cookies means nothing else can work.
    pub async fn connect(
        config: HarvestConfig,
        bridge: Box<dyn SessionBridge>,
        site: Arc<dyn SiteApi>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let cookies = bridge
            .current_cookies()
            .await
            .map_err(RunError::BridgeUnavailable)?;
        let client = build_client(&HttpSettings::from_config(&config), &cookies)?;

        let config = Arc::new(config);
        let session = Arc::new(BrowserSession::new(bridge));
        let json = JsonClient::new(client.clone(), config.retry_policy());
        let cancel = CancellationToken::new();

        let strategies = config
            .strategies
            .iter()
            .map(|name| -> Box<dyn DiscoveryStrategy> {
                match name {
                    StrategyName::BulkListing => Box::new(BulkListingStrategy::new(
                        site.clone(),
                        json.clone(),
                        sink.clone(),
                    )),
                    StrategyName::Pagination => Box::new(
                        PaginationStrategy::new(
                            session.clone(),
                            site.clone(),
                            config.max_pages,
                            config.page_settle(),
                        )
                        .with_cancellation(cancel.clone()),
                    ),
                    StrategyName::Scroll => Box::new(
                        ScrollStrategy::new(
                            session.clone(),
                            site.clone(),
                            config.scroll_max_rounds,
                            config.stability_threshold,
                            config.page_settle(),
                        )
                        .with_cancellation(cancel.clone()),
                    ),
                    StrategyName::LinkScan => Box::new(LinkScanStrategy::new(
                        session.clone(),
                        site.clone(),
                        config.page_settle(),
                    )),
                }
            })
            .collect();

        Ok(Self {
            resolver: AssetResolver::new(site.clone(), json, config.fetch_composites)
                .with_page_limit(config.max_pages_per_item),
            worker: FetchWorker::new(client, config.retry_policy()),
            config,
            session,
            site,
            strategies,
            sink,
            cancel,
        })
    }

    /// Replace the configured strategies.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Cancelling stops new items and assets from starting; in-flight
    /// downloads finish or time out. Assets of an already started item that
    /// never ran are recorded as cancelled failures.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn target_dir(&self, target_id: &str) -> PathBuf {
        self.config
            .output_root
            .join(sanitize_component(target_id))
    }

    /// Union of every strategy's output in numeric id order, plus a warning
    /// per strategy that failed or was skipped.
    pub async fn frontier(&self, target_id: &str) -> (Vec<WorkItem>, Vec<CoverageWarning>) {
        self.discover_with(&self.strategies, target_id).await
    }

    async fn discover_with(
        &self,
        strategies: &[Box<dyn DiscoveryStrategy>],
        target_id: &str,
    ) -> (Vec<WorkItem>, Vec<CoverageWarning>) {
        let mut frontier = Frontier::new();
        let mut warnings = Vec::new();

        for strategy in strategies {
            let name = strategy.name();
            if self.cancel.is_cancelled() {
                warnings.push(CoverageWarning {
                    strategy: name,
                    message: "skipped after cancellation".to_string(),
                });
                continue;
            }
            match strategy.discover(target_id).await {
                Ok(ids) => {
                    let found = ids.len();
                    let new = frontier.record(name, ids);
                    self.sink.emit(EngineEvent::StrategyFinished {
                        strategy: name,
                        found,
                        new,
                    });
                }
                Err(err) => {
                    self.sink.emit(EngineEvent::StrategyFailed {
                        strategy: name,
                        message: err.to_string(),
                    });
                    warnings.push(CoverageWarning {
                        strategy: name,
                        message: err.to_string(),
                    });
                }
            }
        }

        hoard_info!("target {target_id}: {} unique item(s)", frontier.len());
        (frontier.into_items(), warnings)
    }

    /// Harvest whatever `target` names: a gallery through discovery, a single
    /// item directly, or the items linked from a page.
    pub async fn harvest(&self, target: &Target) -> Result<RunSummary, RunError> {
        match target {
            Target::Gallery(target_id) => self.run(target_id).await,
            Target::Item(item) => self.run_items(item.as_str(), [item.clone()]).await,
            Target::Page(url) => self.run_page(url).await,
        }
    }

    /// Discover a gallery with the configured strategies and fetch it into
    /// its own directory.
    pub async fn run(&self, target_id: &str) -> Result<RunSummary, RunError> {
        let (items, warnings) = self.frontier(target_id).await;
        self.process(target_id, &self.target_dir(target_id), items, warnings)
            .await
    }

    /// Fetch the given items without discovery, into [`LOOSE_ITEMS_DIR`].
    pub async fn run_items(
        &self,
        label: &str,
        ids: impl IntoIterator<Item = ItemId>,
    ) -> Result<RunSummary, RunError> {
        let items = ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| WorkItem {
                id,
                discovered_by: BTreeSet::new(),
            })
            .collect();
        self.process(label, &self.loose_items_dir(), items, Vec::new())
            .await
    }

    /// Fetch every item linked from `url`, into [`LOOSE_ITEMS_DIR`].
    pub async fn run_page(&self, url: &str) -> Result<RunSummary, RunError> {
        let scan: [Box<dyn DiscoveryStrategy>; 1] = [Box::new(LinkScanStrategy::for_page(
            self.session.clone(),
            self.site.clone(),
            url,
            self.config.page_settle(),
        ))];
        let (items, warnings) = self.discover_with(&scan, url).await;
        self.process(url, &self.loose_items_dir(), items, warnings)
            .await
    }

    fn loose_items_dir(&self) -> PathBuf {
        self.config.output_root.join(LOOSE_ITEMS_DIR)
    }

    async fn process(
        &self,
        label: &str,
        target_dir: &Path,
        items: Vec<WorkItem>,
        warnings: Vec<CoverageWarning>,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::new(label, items.len());
        summary.coverage_warnings = warnings;

        ensure_output_dir(target_dir).map_err(|source| RunError::Output {
            path: target_dir.to_path_buf(),
            source,
        })?;

        let total = items.len();
        let reports: Vec<ItemReport> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| self.process_item(index + 1, total, item, target_dir))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        for report in reports {
            match report {
                ItemReport::NotStarted => summary.record_not_started(),
                ItemReport::Processed {
                    item_id,
                    asset_count,
                    outcomes,
                    interrupted,
                } => {
                    summary.record_resolution(&item_id, asset_count);
                    for outcome in &outcomes {
                        summary.record_outcome(outcome);
                    }
                    summary.cancelled |= interrupted;
                }
            }
        }
        summary.cancelled |= self.cancel.is_cancelled();
        summary.failures.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(summary)
    }

    async fn process_item(
        &self,
        position: usize,
        total: usize,
        item: WorkItem,
        target_dir: &Path,
    ) -> ItemReport {
        if self.cancel.is_cancelled() {
            return ItemReport::NotStarted;
        }
        let id = item.id;
        hoard_info!("[{position}/{total}] item {id}");
        let item_page = self.site.item_page_url(&id);

        if self.config.warm_up {
            if let Err(err) = self
                .session
                .warm_up(&item_page, self.config.warm_up_dwell())
                .await
            {
                hoard_warn!("item {id}: warm-up failed: {err}");
            }
        }

        let mut assets = self.resolver.resolve(&id, self.sink.as_ref()).await;
        assets.sort_by_key(|asset| asset.page_index);

        let mut outcomes = Vec::with_capacity(assets.len());
        let mut interrupted = false;
        for asset in &assets {
            let destination = target_dir.join(asset_file_name(asset));
            let outcome = if self.cancel.is_cancelled() {
                // Started items report what they will never fetch.
                interrupted = true;
                FetchOutcome {
                    asset: asset.clone(),
                    attempts: 0,
                    final_state: FinalState::Failed(FailureKind::Cancelled),
                    path: destination,
                }
            } else {
                self.worker
                    .fetch(asset, &destination, &item_page, self.sink.as_ref())
                    .await
            };
            self.sink.emit(EngineEvent::AssetFinished(outcome.clone()));
            outcomes.push(outcome);
        }

        ItemReport::Processed {
            item_id: id,
            asset_count: assets.len(),
            outcomes,
            interrupted,
        }
    }
}
