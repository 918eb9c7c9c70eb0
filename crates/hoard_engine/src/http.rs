use std::sync::Arc;
use std::time::Duration;

use hoard_core::{FailureKind, HarvestConfig, RetryPolicy};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use url::Url;

use crate::bridge::Cookie;
use crate::retry::with_retries;
use crate::ProgressSink;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
}

impl HttpSettings {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_config(&HarvestConfig::default())
    }
}

/// Build a client carrying the browser's cookies, so metadata and binary
/// requests are authorised exactly like the rendered pages.
pub fn build_client(
    settings: &HttpSettings,
    cookies: &[Cookie],
) -> Result<reqwest::Client, reqwest::Error> {
    let jar = Jar::default();
    for cookie in cookies {
        let host = cookie.domain.trim_start_matches('.');
        if let Ok(url) = Url::parse(&format!("https://{host}{}", cookie.path)) {
            jar.add_cookie_str(
                &format!(
                    "{}={}; Domain={}; Path={}",
                    cookie.name, cookie.value, cookie.domain, cookie.path
                ),
                &url,
            );
        }
    }

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&settings.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .cookie_provider(Arc::new(jar))
        .build()
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        return FailureKind::Timeout;
    }
    if err.is_builder() {
        return FailureKind::InvalidUrl;
    }
    FailureKind::Network
}

/// JSON metadata calls under the shared retry policy.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl JsonClient {
    pub fn new(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub async fn get_json(
        &self,
        url: &str,
        referer: &str,
        sink: &dyn ProgressSink,
    ) -> Result<serde_json::Value, FailureKind> {
        let parsed = Url::parse(url).map_err(|_| FailureKind::InvalidUrl)?;
        with_retries(&self.retry, url, sink, |_| self.get_once(parsed.clone(), referer))
            .await
            .result
    }

    async fn get_once(&self, url: Url, referer: &str) -> Result<serde_json::Value, FailureKind> {
        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FailureKind::HttpStatus(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|_| FailureKind::MalformedPayload)
    }
}
