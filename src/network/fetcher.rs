//! Stylesheet fetchers
//!
//! A [`Fetcher`] turns an absolute URL into raw bytes. The resolver picks one
//! by scheme: `http`/`https` go to the network fetcher, `file` to the
//! filesystem fetcher.

use crate::utils::FetchError;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Default timeout for remote stylesheet requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of external stylesheet bytes
pub trait Fetcher: Send + Sync {
    /// Retrieve the resource at `url`
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) fetcher backed by reqwest
#[derive(Debug)]
pub struct HttpFetcher {
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            client: OnceLock::new(),
        }
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The client is built on first use so documents without links never spawn one
    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .user_agent(concat!("styleweld/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|err| {
                    log::warn!("Failed to configure HTTP client, using defaults: {err}");
                    reqwest::blocking::Client::new()
                })
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        log::debug!("Fetching stylesheet {url}");
        let response = self
            .client()
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Filesystem fetcher for `file://` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Local path for a `file://` URL
    ///
    /// `file://authority/path` maps to the relative path `authority/path`;
    /// `file:///path` and `file://localhost/path` map to `/path`.
    pub fn path_for(url: &Url) -> PathBuf {
        let path = urlencoding::decode(url.path()).unwrap_or(Cow::Borrowed(url.path()));
        match url.host_str() {
            Some(host) if !host.is_empty() && host != "localhost" => {
                PathBuf::from(format!("{host}{path}"))
            }
            _ => PathBuf::from(path.into_owned()),
        }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = Self::path_for(url);
        log::debug!("Reading stylesheet {}", path.display());
        std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound,
            _ => FetchError::Io(err),
        })
    }
}

/// Fetcher that rejects every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl Fetcher for NoFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Unsupported(url.to_string()))
    }
}
