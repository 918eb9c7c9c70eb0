mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use hoard_core::RunSummary;
use hoard_engine::{
    build_client, load_cookie_file, FrontierAggregator, HttpSettings, LogSink, SiteApi,
    StaticPageBridge,
};
use hoard_logging::{hoard_error, hoard_info, hoard_warn};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    hoard_logging::initialize(cli.log_destination(), cli.log_level());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            hoard_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.harvest_config()?;
    let site: Arc<dyn SiteApi> = Arc::new(cli.site()?);
    let targets = cli.parsed_targets(site.as_ref())?;

    let cookies = match &cli.cookies {
        Some(path) => load_cookie_file(path)?,
        None => {
            hoard_warn!("no cookie file given, requests are anonymous");
            Vec::new()
        }
    };
    let page_client = build_client(&HttpSettings::from_config(&config), &cookies)?;
    let bridge = StaticPageBridge::new(page_client, cookies);

    let aggregator =
        FrontierAggregator::connect(config, Box::new(bridge), site, Arc::new(LogSink)).await?;

    let cancel = aggregator.cancellation_token();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            hoard_warn!("interrupt received, finishing in-flight downloads");
            interrupt.cancel();
        }
    });

    let mut aborted = 0;
    for target in &targets {
        if cancel.is_cancelled() {
            hoard_warn!("interrupted, skipping {target:?}");
            continue;
        }
        hoard_info!("harvesting {target:?}");
        match aggregator.harvest(target).await {
            Ok(summary) => report(&summary),
            Err(err) => {
                hoard_error!("{target:?}: {err}");
                aborted += 1;
            }
        }
    }
    if aborted > 0 {
        bail!("{aborted} of {} target(s) aborted", targets.len());
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    println!("{summary}");
    let failed = summary.failed_item_ids();
    if !failed.is_empty() {
        let listed: Vec<&str> = failed.iter().map(|id| id.as_str()).collect();
        hoard_warn!("rerun to retry item(s): {}", listed.join(" "));
    }
}
