//! Inliner configuration

use super::CssInliner;
use crate::network::{FileFetcher, Fetcher, HttpFetcher, StylesheetCache};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Default number of DOM nodes to preallocate per document
pub const DEFAULT_NODE_CAPACITY: usize = 32;

/// Position of `<link>` stylesheets relative to `<style>` elements in the cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylesheetOrder {
    /// All `<style>` elements first, then all `<link>` elements
    #[default]
    EmbeddedFirst,
    /// `<style>` and `<link>` interleaved in document order
    Document,
}

/// Options controlling how CSS is inlined
#[derive(Clone)]
pub struct InlineOptions {
    /// Use `<style>` elements as stylesheets
    pub inline_style_tags: bool,
    /// Keep `<style>` elements in the output
    pub keep_style_tags: bool,
    /// Keep `<link rel="stylesheet">` elements in the output
    pub keep_link_tags: bool,
    /// Load stylesheets referenced by `<link>` elements
    pub load_remote_stylesheets: bool,
    /// Base URL for relative `href`s
    pub base_url: Option<Url>,
    /// Additional CSS applied after every document stylesheet
    pub extra_css: Option<String>,
    /// Shared cache of parsed external stylesheets
    pub cache: Option<Arc<StylesheetCache>>,
    /// Omit stylesheets that cannot be loaded instead of failing
    pub skip_missing_stylesheets: bool,
    pub stylesheet_order: StylesheetOrder,
    /// Number of DOM nodes to preallocate
    pub preallocate_node_capacity: usize,
    /// Fetcher for `http` and `https` URLs
    pub network_fetcher: Arc<dyn Fetcher>,
    /// Fetcher for `file` URLs
    pub file_fetcher: Arc<dyn Fetcher>,
}

impl InlineOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self {
            inline_style_tags: true,
            keep_style_tags: false,
            keep_link_tags: false,
            load_remote_stylesheets: true,
            base_url: None,
            extra_css: None,
            cache: None,
            skip_missing_stylesheets: false,
            stylesheet_order: StylesheetOrder::default(),
            preallocate_node_capacity: DEFAULT_NODE_CAPACITY,
            network_fetcher: Arc::new(HttpFetcher::new()),
            file_fetcher: Arc::new(FileFetcher::new()),
        }
    }

    pub fn inline_style_tags(mut self, value: bool) -> Self {
        self.inline_style_tags = value;
        self
    }

    pub fn keep_style_tags(mut self, value: bool) -> Self {
        self.keep_style_tags = value;
        self
    }

    pub fn keep_link_tags(mut self, value: bool) -> Self {
        self.keep_link_tags = value;
        self
    }

    pub fn load_remote_stylesheets(mut self, value: bool) -> Self {
        self.load_remote_stylesheets = value;
        self
    }

    pub fn base_url(mut self, value: Option<Url>) -> Self {
        self.base_url = value;
        self
    }

    pub fn extra_css(mut self, value: Option<String>) -> Self {
        self.extra_css = value;
        self
    }

    /// Share a stylesheet cache between inliners
    pub fn cache(mut self, value: impl Into<Option<Arc<StylesheetCache>>>) -> Self {
        self.cache = value.into();
        self
    }

    pub fn skip_missing_stylesheets(mut self, value: bool) -> Self {
        self.skip_missing_stylesheets = value;
        self
    }

    pub fn stylesheet_order(mut self, value: StylesheetOrder) -> Self {
        self.stylesheet_order = value;
        self
    }

    pub fn preallocate_node_capacity(mut self, value: usize) -> Self {
        self.preallocate_node_capacity = value;
        self
    }

    /// Replace the fetcher used for `http`/`https` stylesheets
    pub fn network_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.network_fetcher = fetcher;
        self
    }

    /// Replace the fetcher used for `file` stylesheets
    pub fn file_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.file_fetcher = fetcher;
        self
    }

    /// Create an inliner with these options
    pub fn build(self) -> CssInliner {
        CssInliner::new(self)
    }
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InlineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineOptions")
            .field("inline_style_tags", &self.inline_style_tags)
            .field("keep_style_tags", &self.keep_style_tags)
            .field("keep_link_tags", &self.keep_link_tags)
            .field("load_remote_stylesheets", &self.load_remote_stylesheets)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("extra_css", &self.extra_css)
            .field("cache", &self.cache.as_ref().map(|c| c.capacity()))
            .field("skip_missing_stylesheets", &self.skip_missing_stylesheets)
            .field("stylesheet_order", &self.stylesheet_order)
            .field("preallocate_node_capacity", &self.preallocate_node_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = InlineOptions::default();
        assert!(options.inline_style_tags);
        assert!(!options.keep_style_tags);
        assert!(!options.keep_link_tags);
        assert!(options.load_remote_stylesheets);
        assert!(options.base_url.is_none());
        assert!(options.cache.is_none());
        assert!(!options.skip_missing_stylesheets);
        assert_eq!(options.stylesheet_order, StylesheetOrder::EmbeddedFirst);
        assert_eq!(options.preallocate_node_capacity, DEFAULT_NODE_CAPACITY);
    }

    #[test]
    fn test_builder() {
        let cache = Arc::new(StylesheetCache::new(8).unwrap());
        let options = InlineOptions::new()
            .keep_style_tags(true)
            .load_remote_stylesheets(false)
            .extra_css(Some("p { margin: 0 }".into()))
            .cache(cache.clone())
            .stylesheet_order(StylesheetOrder::Document);
        assert!(options.keep_style_tags);
        assert!(!options.load_remote_stylesheets);
        assert_eq!(options.extra_css.as_deref(), Some("p { margin: 0 }"));
        assert!(Arc::ptr_eq(options.cache.as_ref().unwrap(), &cache));
        assert_eq!(options.stylesheet_order, StylesheetOrder::Document);
    }

    #[test]
    fn test_debug_does_not_panic() {
        let rendered = format!("{:?}", InlineOptions::default());
        assert!(rendered.starts_with("InlineOptions"));
    }
}
