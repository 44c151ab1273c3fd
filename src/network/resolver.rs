//! Stylesheet resolution
//!
//! Turns `<style>` content and `<link>` hrefs into parsed stylesheets,
//! going through the shared cache when one is configured.

use super::cache::{CacheKey, StylesheetCache};
use super::fetcher::{FileFetcher, Fetcher, HttpFetcher};
use crate::css::{CssParser, Stylesheet};
use crate::utils::{FetchError, InlineError, Result};
use std::sync::Arc;
use url::Url;

/// Where a stylesheet comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylesheetSource<'a> {
    /// CSS text embedded in the document or passed by the caller
    Embedded(&'a str),
    /// `href` of a `<link rel="stylesheet">`
    Link(&'a str),
}

/// Resolves and loads stylesheets through injected fetchers
#[derive(Clone)]
pub struct StylesheetResolver {
    network: Arc<dyn Fetcher>,
    filesystem: Arc<dyn Fetcher>,
    parser: CssParser,
}

impl std::fmt::Debug for StylesheetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylesheetResolver").finish_non_exhaustive()
    }
}

impl StylesheetResolver {
    /// Create a resolver with the default HTTP and filesystem fetchers
    pub fn new() -> Self {
        Self::with_fetchers(Arc::new(HttpFetcher::new()), Arc::new(FileFetcher::new()))
    }

    /// Create a resolver with custom fetchers
    pub fn with_fetchers(network: Arc<dyn Fetcher>, filesystem: Arc<dyn Fetcher>) -> Self {
        Self {
            network,
            filesystem,
            parser: CssParser::new(),
        }
    }

    /// Resolve an `href` against an optional base URL
    pub fn resolve_url(href: &str, base_url: Option<&Url>) -> Result<Url> {
        let href = href.trim();
        match Url::parse(href) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
                Some(base) => base
                    .join(href)
                    .map_err(|err| InlineError::invalid_url(href, err)),
                None => Err(InlineError::invalid_url(
                    href,
                    "relative URL without a base URL",
                )),
            },
            Err(err) => Err(InlineError::invalid_url(href, err)),
        }
    }

    /// Fetch the text of an absolute stylesheet URL
    pub fn load(&self, url: &Url) -> Result<String> {
        let fetcher = match url.scheme() {
            "http" | "https" => &self.network,
            "file" => &self.filesystem,
            scheme => {
                return Err(InlineError::invalid_url(
                    url.as_str(),
                    format!("unsupported scheme `{scheme}`"),
                ));
            }
        };
        let bytes = fetcher
            .fetch(url)
            .map_err(|err| InlineError::missing_stylesheet(url.as_str(), err))?;
        if bytes.is_empty() {
            return Err(InlineError::missing_stylesheet(url.as_str(), FetchError::Empty));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Resolve a stylesheet source into a parsed stylesheet
    pub fn resolve(
        &self,
        source: StylesheetSource<'_>,
        base_url: Option<&Url>,
        cache: Option<&StylesheetCache>,
    ) -> Result<Arc<Stylesheet>> {
        match source {
            StylesheetSource::Embedded(css) => match cache {
                Some(cache) => {
                    cache.get_or_insert(CacheKey::inline(css), || Ok(self.parser.parse(css)))
                }
                None => Ok(Arc::new(self.parser.parse(css))),
            },
            StylesheetSource::Link(href) => {
                let url = Self::resolve_url(href, base_url)?;
                self.resolve_url_source(&url, cache)
            }
        }
    }

    /// Load and parse an already resolved stylesheet URL
    pub fn resolve_url_source(
        &self,
        url: &Url,
        cache: Option<&StylesheetCache>,
    ) -> Result<Arc<Stylesheet>> {
        let compute = || -> Result<Stylesheet> {
            let css = self.load(url)?;
            Ok(self.parser.parse(&css))
        };
        match cache {
            Some(cache) => cache.get_or_insert(CacheKey::url(url), compute),
            None => compute().map(Arc::new),
        }
    }
}

impl Default for StylesheetResolver {
    fn default() -> Self {
        Self::new()
    }
}
