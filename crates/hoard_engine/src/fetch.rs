use std::path::Path;

use futures_util::StreamExt;
use hoard_core::{AssetRef, FailureKind, FetchOutcome, FinalState, RetryPolicy};
use hoard_logging::hoard_debug;
use reqwest::header::{CONTENT_TYPE, REFERER};
use url::Url;

use crate::http::map_reqwest_error;
use crate::persist::PartialFile;
use crate::retry::with_retries;
use crate::ProgressSink;

/// Destination suffixes that are accepted whatever content type the server declares.
const ARCHIVE_EXTENSIONS: &[&str] = &[".zip"];

/// Downloads one asset to disk with retries, content validation and atomic writes.
#[derive(Debug, Clone)]
pub struct FetchWorker {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl FetchWorker {
    pub fn new(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Fetch `asset` into `destination`. An existing destination is never
    /// touched and costs no request.
    pub async fn fetch(
        &self,
        asset: &AssetRef,
        destination: &Path,
        referer: &str,
        sink: &dyn ProgressSink,
    ) -> FetchOutcome {
        let finish = |attempts: u32, final_state: FinalState| FetchOutcome {
            asset: asset.clone(),
            attempts,
            final_state,
            path: destination.to_path_buf(),
        };

        if destination.exists() {
            return finish(0, FinalState::Skipped);
        }
        let url = match Url::parse(&asset.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return finish(0, FinalState::Failed(FailureKind::InvalidUrl)),
        };

        let attempted = with_retries(&self.retry, &asset.url, sink, |_| {
            self.attempt(url.clone(), destination, referer)
        })
        .await;

        let final_state = match attempted.result {
            Ok(()) => FinalState::Written,
            Err(reason) => FinalState::Failed(reason),
        };
        finish(attempted.attempts, final_state)
    }

    async fn attempt(&self, url: Url, destination: &Path, referer: &str) -> Result<(), FailureKind> {
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

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_acceptable(&content_type, destination) {
            // Typically a login or error page served with 200.
            return Err(FailureKind::ContentTypeMismatch { content_type });
        }

        let mut partial = PartialFile::create(destination).map_err(storage_error)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            partial.write_chunk(&chunk).await.map_err(storage_error)?;
        }
        let bytes = partial.bytes_written();
        let path = partial.commit().await.map_err(storage_error)?;
        hoard_debug!("wrote {bytes} bytes to {}", path.display());
        Ok(())
    }
}

fn is_acceptable(content_type: &str, destination: &Path) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("image") || content_type.contains("octet-stream") {
        return true;
    }
    let name = destination.to_string_lossy().to_ascii_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn storage_error(err: crate::PersistError) -> FailureKind {
    FailureKind::Storage(err.to_string())
}
