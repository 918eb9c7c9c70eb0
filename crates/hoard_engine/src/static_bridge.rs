use std::sync::Mutex;

use reqwest::header::REFERER;
use scraper::{Html, Selector};
use url::Url;

use crate::bridge::{BridgeError, Cookie, ElementSnapshot, SessionBridge};

/// Attributes a browser reports as absolute URLs.
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    html: String,
}

#[derive(Debug, Default)]
struct TabState {
    current: Option<LoadedPage>,
    /// Pages of the tabs underneath the current one.
    parked: Vec<Option<LoadedPage>>,
}

/// Session backend without a browser: pages are fetched over HTTP and queried
/// as static HTML. Scripts cannot run, so lazily loaded content never appears
/// and the scroll strategy settles after its stability threshold.
pub struct StaticPageBridge {
    client: reqwest::Client,
    cookies: Vec<Cookie>,
    tabs: Mutex<TabState>,
}

impl StaticPageBridge {
    /// `client` should already carry `cookies`; they are only kept so they can
    /// be handed to the engine's own HTTP client.
    pub fn new(client: reqwest::Client, cookies: Vec<Cookie>) -> Self {
        Self {
            client,
            cookies,
            tabs: Mutex::new(TabState::default()),
        }
    }

    fn with_tabs<T>(&self, f: impl FnOnce(&mut TabState) -> T) -> Result<T, BridgeError> {
        let mut tabs = self
            .tabs
            .lock()
            .map_err(|_| BridgeError::Unavailable("tab state poisoned".into()))?;
        Ok(f(&mut tabs))
    }

    fn current_page(&self) -> Result<LoadedPage, BridgeError> {
        self.with_tabs(|tabs| tabs.current.clone())?
            .ok_or_else(|| BridgeError::Script("no page loaded".into()))
    }
}

#[async_trait::async_trait]
impl SessionBridge for StaticPageBridge {
    async fn current_cookies(&self) -> Result<Vec<Cookie>, BridgeError> {
        Ok(self.cookies.clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        let navigation_error = |message: String| BridgeError::Navigation {
            url: url.to_string(),
            message,
        };
        let parsed = Url::parse(url).map_err(|err| navigation_error(err.to_string()))?;
        let referer = self
            .with_tabs(|tabs| tabs.current.as_ref().map(|page| page.url.to_string()))?;

        let mut request = self.client.get(parsed);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request
            .send()
            .await
            .map_err(|err| navigation_error(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(status.to_string()));
        }
        let final_url = response.url().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| navigation_error(err.to_string()))?;

        let page = LoadedPage {
            url: final_url,
            html: String::from_utf8_lossy(&bytes).into_owned(),
        };
        self.with_tabs(|tabs| tabs.current = Some(page))
    }

    /// `return …` queries answer with the document length, the closest thing
    /// to a content extent a static page has. Everything else is a no-op.
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BridgeError> {
        if !script.trim_start().starts_with("return") {
            return Ok(serde_json::Value::Null);
        }
        let page = self.current_page()?;
        Ok(serde_json::Value::from(page.html.len() as u64))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementSnapshot>, BridgeError> {
        let page = self.current_page()?;
        select_elements(&page, selector)
    }

    async fn open_tab(&self) -> Result<(), BridgeError> {
        self.with_tabs(|tabs| {
            let previous = tabs.current.take();
            tabs.parked.push(previous);
        })
    }

    async fn close_tab(&self) -> Result<(), BridgeError> {
        self.with_tabs(|tabs| match tabs.parked.pop() {
            Some(previous) => {
                tabs.current = previous;
                Ok(())
            }
            None => Err(BridgeError::Tab("cannot close the last tab".into())),
        })?
    }
}

fn select_elements(page: &LoadedPage, selector: &str) -> Result<Vec<ElementSnapshot>, BridgeError> {
    let selector = Selector::parse(selector).map_err(|_| BridgeError::Selector(selector.into()))?;
    let document = Html::parse_document(&page.html);

    let elements = document
        .select(&selector)
        .map(|element| {
            ElementSnapshot::new(element.value().attrs().map(|(name, value)| {
                let value = if URL_ATTRIBUTES.contains(&name) {
                    resolve_url(&page.url, value)
                } else {
                    value.to_string()
                };
                (name.to_string(), value)
            }))
        })
        .collect();
    Ok(elements)
}

fn resolve_url(base: &Url, reference: &str) -> String {
    base.join(reference.trim())
        .map(String::from)
        .unwrap_or_else(|_| reference.to_string())
}
