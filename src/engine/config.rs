//! Serializable inliner configuration
//!
//! `InlineConfig` mirrors [`InlineOptions`] with plain data types so it can be
//! loaded from JSON files or handed over by bindings. Converting it into
//! options validates the base URL and the cache size.

use super::options::{DEFAULT_NODE_CAPACITY, InlineOptions, StylesheetOrder};
use crate::network::StylesheetCache;
use crate::utils::{InlineError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Plain-data inliner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlineConfig {
    pub inline_style_tags: bool,
    pub keep_style_tags: bool,
    pub keep_link_tags: bool,
    pub load_remote_stylesheets: bool,
    pub base_url: Option<String>,
    pub extra_css: Option<String>,
    /// Capacity of a fresh stylesheet cache; `None` disables caching
    pub cache_size: Option<usize>,
    pub skip_missing_stylesheets: bool,
    pub stylesheet_order: StylesheetOrder,
    pub preallocate_node_capacity: usize,
}

impl InlineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            inline_style_tags: true,
            keep_style_tags: false,
            keep_link_tags: false,
            load_remote_stylesheets: true,
            base_url: None,
            extra_css: None,
            cache_size: None,
            skip_missing_stylesheets: false,
            stylesheet_order: StylesheetOrder::default(),
            preallocate_node_capacity: DEFAULT_NODE_CAPACITY,
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| InlineError::Parse(format!("invalid configuration: {err}")))
    }

    /// Render the configuration as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| InlineError::Parse(format!("invalid configuration: {err}")))
    }
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<InlineConfig> for InlineOptions {
    type Error = InlineError;

    fn try_from(config: InlineConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| Url::parse(url).map_err(|err| InlineError::invalid_url(url, err)))
            .transpose()?;
        let cache = config
            .cache_size
            .map(|size| StylesheetCache::new(size).map(Arc::new))
            .transpose()?;

        Ok(InlineOptions::new()
            .inline_style_tags(config.inline_style_tags)
            .keep_style_tags(config.keep_style_tags)
            .keep_link_tags(config.keep_link_tags)
            .load_remote_stylesheets(config.load_remote_stylesheets)
            .base_url(base_url)
            .extra_css(config.extra_css)
            .cache(cache)
            .skip_missing_stylesheets(config.skip_missing_stylesheets)
            .stylesheet_order(config.stylesheet_order)
            .preallocate_node_capacity(config.preallocate_node_capacity))
    }
}
