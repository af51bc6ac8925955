//! Remote recording fetching with an on-disk cache
//!
//! This module handles:
//! 1. Resolving redirects by opening the requested URL once
//! 2. Mapping the resolved URL to its cache path
//! 3. Downloading the file when it is not cached yet
//! 4. Fetching the optional `_about.json` sidecar of plain-text recordings

use anyhow::{Context, Result};
use neoview_core::cache::{extension_of, sidecar_path, sidecar_url};
use neoview_core::{CacheError, DownloadCache};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Recording fetcher backed by the download cache
pub struct FileFetcher {
    /// HTTP client
    client: reqwest::Client,
    /// Flat cache of downloaded files
    cache: DownloadCache,
    /// Extensions whose files may come with an `_about.json` sidecar
    sidecar_extensions: &'static [&'static str],
}

impl FileFetcher {
    /// Create a new fetcher with the given cache directory
    ///
    /// There is no deadline on a whole transfer; a download only fails when
    /// the connection cannot be opened in `connect_timeout` or the upstream
    /// stays silent for `read_timeout`.
    pub fn new(
        cache_dir: PathBuf,
        connect_timeout: Duration,
        read_timeout: Duration,
        sidecar_extensions: &'static [&'static str],
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let cache = DownloadCache::new(cache_dir).context("Failed to create download cache")?;

        Ok(Self {
            client,
            cache,
            sidecar_extensions,
        })
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache.base_dir
    }

    /// Fetch a recording, returning its local path
    ///
    /// The URL is opened once to follow redirects; the cache path is derived
    /// from the final URL. The response body is only read when the file is
    /// not cached yet.
    pub async fn fetch(&self, raw_url: &str) -> Result<PathBuf, FetchError> {
        let url = Url::parse(raw_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{}: unsupported scheme {:?}",
                raw_url,
                url.scheme()
            )));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: response.status(),
            });
        }

        let resolved = response.url().clone();
        let path = self.cache.derive_cache_path(&resolved)?;

        if DownloadCache::is_cached(&path) {
            debug!(url = %resolved, path = %path.display(), "Using cached recording");
        } else {
            info!(url = %resolved, path = %path.display(), "Downloading recording");
            self.download(response, &path).await?;
        }

        let wants_sidecar = extension_of(&path)
            .is_some_and(|ext| self.sidecar_extensions.contains(&ext.as_str()));
        if wants_sidecar {
            self.fetch_sidecar(&resolved, &path).await;
        }

        Ok(path)
    }

    /// Stream a response body into the cache
    async fn download(&self, mut response: reqwest::Response, path: &Path) -> Result<(), FetchError> {
        let mut entry = self.cache.begin_entry(path)?;
        while let Some(chunk) = response.chunk().await? {
            entry.write_chunk(&chunk)?;
        }
        entry.commit()?;
        Ok(())
    }

    /// Try to download the metadata sidecar; every failure is ignored
    async fn fetch_sidecar(&self, resolved: &Url, path: &Path) {
        let url = sidecar_url(resolved);
        match self.try_fetch_sidecar(&url, &sidecar_path(path)).await {
            Ok(true) => debug!(url = %url, "Fetched recording metadata"),
            Ok(false) => debug!(url = %url, "No recording metadata available"),
            Err(e) => debug!(url = %url, error = %e, "Failed to fetch recording metadata"),
        }
    }

    async fn try_fetch_sidecar(&self, url: &Url, path: &Path) -> Result<bool, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        self.download(response, path).await?;
        Ok(true)
    }
}
