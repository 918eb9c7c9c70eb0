mod support;

use std::sync::Arc;
use std::time::Duration;

use hoard_core::{HarvestConfig, StrategyName};
use hoard_engine::{
    build_client, AjaxGallerySite, BrowserSession, BulkListingStrategy, DiscoveryError,
    DiscoveryStrategy, HttpSettings, JsonClient, LinkScanStrategy, PaginationStrategy,
    ScrollStrategy, SiteApi,
};
use pretty_assertions::assert_eq;
use support::{fast_retry, ids, init_logging, ScriptedBridge, TestSink, SITE};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site() -> Arc<dyn SiteApi> {
    Arc::new(AjaxGallerySite::with_origin(Url::parse(SITE).unwrap()))
}

fn page_url(page: u32) -> String {
    site().gallery_page_url("7", page)
}

fn batches(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|batch| batch.iter().map(|id| id.to_string()).collect())
        .collect()
}

fn scroll_strategy(bridge: ScriptedBridge, max_rounds: u32, threshold: u32) -> ScrollStrategy {
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    ScrollStrategy::new(session, site(), max_rounds, threshold, Duration::ZERO)
}

#[tokio::test]
async fn pagination_stops_at_first_page_without_new_ids() {
    init_logging();
    let bridge = ScriptedBridge::new()
        .with_page(page_url(1), &["1", "2", "3"])
        .with_page(page_url(2), &["4", "5", "3"])
        .with_page(page_url(3), &["4", "5"])
        .with_page(page_url(4), &["6"]);
    let recorder = bridge.recorder();
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = PaginationStrategy::new(session, site(), 120, Duration::ZERO);

    let found = strategy.discover("7").await.unwrap();

    assert_eq!(found, ids(&["1", "2", "3", "4", "5"]));
    assert_eq!(recorder.navigations(), vec![page_url(1), page_url(2), page_url(3)]);
}

#[tokio::test]
async fn pagination_respects_the_page_bound() {
    let bridge = ScriptedBridge::new()
        .with_page(page_url(1), &["1"])
        .with_page(page_url(2), &["2"])
        .with_page(page_url(3), &["3"]);
    let recorder = bridge.recorder();
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = PaginationStrategy::new(session, site(), 2, Duration::ZERO);

    assert_eq!(strategy.discover("7").await.unwrap(), ids(&["1", "2"]));
    assert_eq!(recorder.navigations().len(), 2);
}

#[tokio::test]
async fn pagination_keeps_partial_results_when_a_later_page_fails() {
    let bridge = ScriptedBridge::new()
        .with_page(page_url(1), &["1", "2"])
        .failing_after_navigations(1);
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = PaginationStrategy::new(session, site(), 10, Duration::ZERO);

    assert_eq!(strategy.discover("7").await.unwrap(), ids(&["1", "2"]));
}

#[tokio::test]
async fn pagination_fails_when_nothing_could_be_loaded() {
    let bridge = ScriptedBridge::new().failing_after_navigations(0);
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = PaginationStrategy::new(session, site(), 10, Duration::ZERO);

    let err = strategy.discover("7").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Bridge(_)));
}

#[tokio::test]
async fn scroll_terminates_exactly_threshold_rounds_after_growth_stops() {
    init_logging();
    // Growth in rounds 1..=4, nothing new afterwards.
    let k = 4;
    let threshold = 3;
    let bridge = ScriptedBridge::new().with_scroll_batches(batches(&[
        &["10", "11"],
        &["12"],
        &["13", "14"],
        &["15"],
    ]));
    let recorder = bridge.recorder();
    let strategy = scroll_strategy(bridge, 80, threshold);

    let found = strategy.discover("7").await.unwrap();

    assert_eq!(found, ids(&["10", "11", "12", "13", "14", "15"]));
    assert_eq!(recorder.scrolls(), (k + threshold) as usize);
    assert_eq!(recorder.navigations(), vec![site().gallery_url("7")]);
}

#[tokio::test]
async fn scroll_never_stops_before_the_threshold() {
    // Nothing ever loads: still needs `threshold` quiet rounds to give up.
    let bridge = ScriptedBridge::new();
    let recorder = bridge.recorder();
    let strategy = scroll_strategy(bridge, 80, 5);

    assert!(strategy.discover("7").await.unwrap().is_empty());
    assert_eq!(recorder.scrolls(), 5);
}

#[tokio::test]
async fn scroll_is_capped_by_max_rounds() {
    let endless: Vec<Vec<String>> = (0..50).map(|i| vec![(100 + i).to_string()]).collect();
    let bridge = ScriptedBridge::new().with_scroll_batches(endless);
    let recorder = bridge.recorder();
    let strategy = scroll_strategy(bridge, 6, 3);

    let found = strategy.discover("7").await.unwrap();

    assert_eq!(recorder.scrolls(), 6);
    assert_eq!(found.len(), 6);
}

#[tokio::test]
async fn scroll_reports_bridge_failure_as_discovery_error() {
    let bridge = ScriptedBridge::new().failing_after_navigations(0);
    let strategy = scroll_strategy(bridge, 10, 3);

    let err = strategy.discover("7").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Bridge(_)));
    assert_eq!(strategy.name(), StrategyName::Scroll);
}

#[tokio::test]
async fn pagination_stops_between_pages_once_cancelled() {
    let bridge = ScriptedBridge::new()
        .with_page(page_url(1), &["1"])
        .with_page(page_url(2), &["2"]);
    let recorder = bridge.recorder();
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let strategy =
        PaginationStrategy::new(session, site(), 10, Duration::ZERO).with_cancellation(cancel);

    assert!(strategy.discover("7").await.unwrap().is_empty());
    assert!(recorder.navigations().is_empty());
}

#[tokio::test]
async fn scroll_stops_between_rounds_once_cancelled() {
    let bridge = ScriptedBridge::new().with_scroll_batches(batches(&[&["10"], &["11"]]));
    let recorder = bridge.recorder();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let strategy = scroll_strategy(bridge, 80, 3).with_cancellation(cancel);

    assert!(strategy.discover("7").await.unwrap().is_empty());
    assert_eq!(recorder.scrolls(), 0);
}

#[tokio::test]
async fn link_scan_reads_a_fixed_page_once() {
    let page = format!("{SITE}bookmark_new_illust.php");
    let bridge = ScriptedBridge::new().with_page(page.clone(), &["5", "3", "5"]);
    let recorder = bridge.recorder();
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = LinkScanStrategy::for_page(session, site(), page.clone(), Duration::ZERO);

    assert_eq!(strategy.name(), StrategyName::LinkScan);
    assert_eq!(strategy.discover("ignored").await.unwrap(), ids(&["3", "5"]));
    assert_eq!(recorder.navigations(), vec![page]);
    assert_eq!(recorder.scrolls(), 0);
}

#[tokio::test]
async fn link_scan_defaults_to_the_gallery_landing_page() {
    let bridge = ScriptedBridge::new().with_page(site().gallery_url("7"), &["8", "9"]);
    let recorder = bridge.recorder();
    let session = Arc::new(BrowserSession::new(Box::new(bridge)));
    let strategy = LinkScanStrategy::new(session, site(), Duration::ZERO);

    assert_eq!(strategy.discover("7").await.unwrap(), ids(&["8", "9"]));
    assert_eq!(recorder.navigations(), vec![site().gallery_url("7")]);
}

fn bulk_strategy(server: &MockServer, max_retries: u32) -> BulkListingStrategy {
    let site: Arc<dyn SiteApi> = Arc::new(AjaxGallerySite::with_origin(
        Url::parse(&server.uri()).unwrap(),
    ));
    let client = build_client(&HttpSettings::from_config(&HarvestConfig::default()), &[]).unwrap();
    BulkListingStrategy::new(
        site,
        JsonClient::new(client, fast_retry(max_retries)),
        TestSink::new(),
    )
}

#[tokio::test]
async fn bulk_listing_collects_numeric_keys_of_every_section() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/7/profile/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": false,
            "body": {
                "illusts": { "10": null, "2": null, "pickup": null },
                "manga": { "31": null },
                "novels": []
            }
        })))
        .mount(&server)
        .await;

    let found = bulk_strategy(&server, 3).discover("7").await.unwrap();
    assert_eq!(found, ids(&["2", "10", "31"]));
}

#[tokio::test]
async fn bulk_listing_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/7/profile/all"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/7/profile/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "body": { "illusts": { "5": null }, "manga": [] }
        })))
        .mount(&server)
        .await;

    let found = bulk_strategy(&server, 3).discover("7").await.unwrap();
    assert_eq!(found, ids(&["5"]));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn bulk_listing_gives_up_on_permanent_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/7/profile/all"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = bulk_strategy(&server, 5).discover("7").await.unwrap_err();
    assert_eq!(
        err,
        DiscoveryError::Request(hoard_core::FailureKind::HttpStatus(403))
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
