//! Inliner orchestrating the whole pipeline
//!
//! The CssInliner drives a single call:
//! 1. Parse HTML into a DOM (document or fragment mode)
//! 2. Collect `<style>`, `<link>` and caller-supplied stylesheets
//! 3. Cascade matching rules into `style` attributes
//! 4. Serialize the DOM back to HTML

mod config;
mod options;
mod status;

pub use config::InlineConfig;
pub use options::{DEFAULT_NODE_CAPACITY, InlineOptions, StylesheetOrder};
pub use status::InlineStatus;

use crate::cascade::{AppliedStylesheet, CascadeEngine};
use crate::css::Stylesheet;
use crate::dom::{
    Document, HtmlParser, InlineControl, NodeId, ParseMode, SerializeOptions, serialize_to,
};
use crate::network::{StylesheetResolver, StylesheetSource};
use crate::utils::{InlineError, Result};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use url::Url;

/// Stylesheet reference found while walking the document
#[derive(Debug)]
enum Collected {
    Embedded(String),
    Link(Url),
}

/// Inlines CSS from a document's stylesheets into its `style` attributes
///
/// Holds no per-call state, so one instance can serve many threads.
#[derive(Debug)]
pub struct CssInliner {
    options: InlineOptions,
    parser: HtmlParser,
    resolver: StylesheetResolver,
    cascade: CascadeEngine,
}

impl CssInliner {
    /// Create an inliner with the given options
    pub fn new(options: InlineOptions) -> Self {
        Self {
            parser: HtmlParser::with_capacity(options.preallocate_node_capacity),
            resolver: StylesheetResolver::with_fetchers(
                options.network_fetcher.clone(),
                options.file_fetcher.clone(),
            ),
            cascade: CascadeEngine::new(),
            options,
        }
    }

    /// Start building options for a new inliner
    pub fn options() -> InlineOptions {
        InlineOptions::new()
    }

    /// Options this inliner was built with
    pub fn get_options(&self) -> &InlineOptions {
        &self.options
    }

    /// Inline CSS into a complete HTML document
    pub fn inline(&self, html: &str) -> Result<String> {
        let mut output = Vec::with_capacity(html.len().saturating_mul(3) / 2);
        self.inline_to(html, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Inline CSS into a complete HTML document, writing the result to `writer`
    pub fn inline_to<W: Write>(&self, html: &str, writer: &mut W) -> Result<()> {
        self.process(html, None, ParseMode::Document, writer)
    }

    /// Inline CSS into a complete HTML document, writing into a fixed buffer
    ///
    /// Returns the number of bytes written. A result larger than `buffer`
    /// fails with [`InlineError::Io`] and leaves the buffer content undefined.
    pub fn inline_to_buffer(&self, html: &str, buffer: &mut [u8]) -> Result<usize> {
        write_to_buffer(buffer, |cursor| self.inline_to(html, cursor))
    }

    /// Inline `css` into an HTML fragment
    ///
    /// The output never gains `<html>`, `<head>` or `<body>` tags.
    pub fn inline_fragment(&self, html: &str, css: &str) -> Result<String> {
        let mut output = Vec::with_capacity(html.len().saturating_mul(3) / 2);
        self.inline_fragment_to(html, css, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Inline `css` into an HTML fragment, writing the result to `writer`
    pub fn inline_fragment_to<W: Write>(
        &self,
        html: &str,
        css: &str,
        writer: &mut W,
    ) -> Result<()> {
        self.process(html, Some(css), ParseMode::Fragment, writer)
    }

    /// Inline `css` into an HTML fragment, writing into a fixed buffer
    pub fn inline_fragment_to_buffer(
        &self,
        html: &str,
        css: &str,
        buffer: &mut [u8],
    ) -> Result<usize> {
        write_to_buffer(buffer, |cursor| self.inline_fragment_to(html, css, cursor))
    }

    fn process<W: Write>(
        &self,
        html: &str,
        fragment_css: Option<&str>,
        mode: ParseMode,
        writer: &mut W,
    ) -> Result<()> {
        let mut document = self.parser.parse(html, mode);
        log::debug!("Parsed {:?} with {} nodes", mode, document.len());

        let stylesheets = self.collect_stylesheets(&document, fragment_css)?;
        self.cascade.apply(&mut document, &stylesheets)?;

        let options = SerializeOptions {
            keep_style_tags: self.options.keep_style_tags,
            keep_link_tags: self.options.keep_link_tags,
        };
        serialize_to(&document, writer, options)?;
        Ok(())
    }

    /// Resolve every stylesheet that applies to `document`, in cascade source order
    fn collect_stylesheets(
        &self,
        document: &Document,
        fragment_css: Option<&str>,
    ) -> Result<Vec<AppliedStylesheet>> {
        let mut embedded = Vec::new();
        let mut links = Vec::new();
        let mut interleaved = Vec::new();
        let mut seen_links = HashSet::new();

        for node in document.elements() {
            let Some(collected) = self.collect_element(document, node)? else {
                continue;
            };
            if let Collected::Link(url) = &collected
                && !seen_links.insert(url.clone())
            {
                log::trace!("Skipping duplicate stylesheet {}", url);
                continue;
            }
            match self.options.stylesheet_order {
                StylesheetOrder::Document => interleaved.push(collected),
                StylesheetOrder::EmbeddedFirst => match collected {
                    Collected::Embedded(_) => embedded.push(collected),
                    Collected::Link(_) => links.push(collected),
                },
            }
        }
        interleaved.extend(embedded);
        interleaved.extend(links);

        let mut stylesheets = Vec::with_capacity(interleaved.len() + 2);
        for collected in &interleaved {
            let stylesheet = match collected {
                Collected::Embedded(css) => self.resolve_embedded(css)?,
                Collected::Link(url) => {
                    match self
                        .resolver
                        .resolve_url_source(url, self.options.cache.as_deref())
                    {
                        Ok(stylesheet) => stylesheet,
                        Err(err @ InlineError::MissingStylesheet { .. })
                            if self.options.skip_missing_stylesheets =>
                        {
                            log::warn!("Skipping stylesheet: {}", err);
                            continue;
                        }
                        Err(err) => return Err(err),
                    }
                }
            };
            stylesheets.push(AppliedStylesheet::new(stylesheet, stylesheets.len()));
        }

        for css in fragment_css.into_iter().chain(self.options.extra_css.as_deref()) {
            let stylesheet = self.resolve_embedded(css)?;
            stylesheets.push(AppliedStylesheet::new(stylesheet, stylesheets.len()));
        }

        log::debug!("Collected {} stylesheet(s)", stylesheets.len());
        Ok(stylesheets)
    }

    /// Stylesheet carried by a single element, if it is used
    fn collect_element(&self, document: &Document, node: NodeId) -> Result<Option<Collected>> {
        let Some(element) = document.element(node) else {
            return Ok(None);
        };
        if element.inline_control() == InlineControl::Ignore {
            return Ok(None);
        }
        if element.is_style() {
            if !self.options.inline_style_tags {
                return Ok(None);
            }
            let css = document.text_content(node);
            if css.trim().is_empty() {
                return Ok(None);
            }
            return Ok(Some(Collected::Embedded(css)));
        }
        if element.is_stylesheet_link() {
            if !self.options.load_remote_stylesheets {
                return Ok(None);
            }
            let Some(href) = element.get_attribute("href").filter(|h| !h.trim().is_empty()) else {
                return Ok(None);
            };
            let url = StylesheetResolver::resolve_url(href, self.options.base_url.as_ref())?;
            return Ok(Some(Collected::Link(url)));
        }
        Ok(None)
    }

    fn resolve_embedded(&self, css: &str) -> Result<Arc<Stylesheet>> {
        self.resolver.resolve(
            StylesheetSource::Embedded(css),
            None,
            self.options.cache.as_deref(),
        )
    }
}

impl Default for CssInliner {
    fn default() -> Self {
        Self::new(InlineOptions::default())
    }
}

/// Run `write` against a cursor over `buffer` and report how much was written
fn write_to_buffer<F>(buffer: &mut [u8], write: F) -> Result<usize>
where
    F: FnOnce(&mut &mut [u8]) -> Result<()>,
{
    let capacity = buffer.len();
    let mut cursor: &mut [u8] = buffer;
    write(&mut cursor)?;
    Ok(capacity - cursor.len())
}

/// Inline CSS into a complete HTML document with default options
pub fn inline(html: &str) -> Result<String> {
    CssInliner::default().inline(html)
}

/// Inline `css` into an HTML fragment with default options
pub fn inline_fragment(html: &str, css: &str) -> Result<String> {
    CssInliner::default().inline_fragment(html, css)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Fetcher, NoFetcher};
    use crate::utils::FetchError;
    use pretty_assertions::assert_eq;

    struct StaticFetcher(&'static str);

    impl Fetcher for StaticFetcher {
        fn fetch(&self, _url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    fn offline() -> InlineOptions {
        InlineOptions::new()
            .network_fetcher(Arc::new(NoFetcher))
            .file_fetcher(Arc::new(NoFetcher))
    }

    #[test]
    fn test_inline_document() {
        let html = r#"<html><head><style>h1 { color: blue }</style></head><body><h1>Big Text</h1></body></html>"#;
        let output = offline().build().inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head></head><body><h1 style="color: blue;">Big Text</h1></body></html>"#
        );
    }

    #[test]
    fn test_keep_style_tags() {
        let html = "<html><head><style>p { margin: 0 }</style></head><body><p>x</p></body></html>";
        let output = offline().keep_style_tags(true).build().inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head><style>p { margin: 0 }</style></head><body><p style="margin: 0;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_inline_style_tags_disabled() {
        let html = "<html><head><style>p { margin: 0 }</style></head><body><p>x</p></body></html>";
        let output = offline()
            .inline_style_tags(false)
            .build()
            .inline(html)
            .unwrap();
        assert_eq!(output, "<html><head></head><body><p>x</p></body></html>");
    }

    #[test]
    fn test_ignored_style_tag() {
        let html = r#"<html><head><style data-css-inline="ignore">p { margin: 0 }</style></head><body><p>x</p></body></html>"#;
        let output = offline().build().inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head><style data-css-inline="ignore">p { margin: 0 }</style></head><body><p>x</p></body></html>"#
        );
    }

    #[test]
    fn test_kept_style_tag_is_used() {
        let html = r#"<html><head><style data-css-inline="keep">p { margin: 0 }</style></head><body><p>x</p></body></html>"#;
        let output = offline().build().inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head><style data-css-inline="keep">p { margin: 0 }</style></head><body><p style="margin: 0;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_inline_fragment() {
        let output = offline()
            .build()
            .inline_fragment("<main><h1>Hello</h1></main>", "h1 { color: red }")
            .unwrap();
        assert_eq!(output, r#"<main><h1 style="color: red;">Hello</h1></main>"#);
    }

    #[test]
    fn test_extra_css_applies_last() {
        let html = "<html><head><style>p { color: red }</style></head><body><p>x</p></body></html>";
        let output = offline()
            .extra_css(Some("p { color: blue }".into()))
            .build()
            .inline(html)
            .unwrap();
        assert_eq!(
            output,
            r#"<html><head></head><body><p style="color: blue;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_links_follow_styles_by_default() {
        let html = r#"<html><head><link rel="stylesheet" href="https://example.com/a.css"><style>p { color: red }</style></head><body><p>x</p></body></html>"#;
        let inliner = offline()
            .network_fetcher(Arc::new(StaticFetcher("p { color: blue }")))
            .build();
        let output = inliner.inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head></head><body><p style="color: blue;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_document_stylesheet_order() {
        let html = r#"<html><head><link rel="stylesheet" href="https://example.com/a.css"><style>p { color: red }</style></head><body><p>x</p></body></html>"#;
        let inliner = offline()
            .network_fetcher(Arc::new(StaticFetcher("p { color: blue }")))
            .stylesheet_order(StylesheetOrder::Document)
            .build();
        let output = inliner.inline(html).unwrap();
        assert_eq!(
            output,
            r#"<html><head></head><body><p style="color: red;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_missing_stylesheet() {
        let html = r#"<html><head><link rel="stylesheet" href="https://example.com/a.css"></head><body><p>x</p></body></html>"#;
        let err = offline().build().inline(html).unwrap_err();
        assert!(matches!(err, InlineError::MissingStylesheet { .. }));

        let output = offline()
            .skip_missing_stylesheets(true)
            .build()
            .inline(html)
            .unwrap();
        assert_eq!(output, "<html><head></head><body><p>x</p></body></html>");
    }

    #[test]
    fn test_remote_stylesheets_disabled() {
        let html = r#"<html><head><link rel="stylesheet" href="https://example.com/a.css"></head><body><p>x</p></body></html>"#;
        let output = offline()
            .load_remote_stylesheets(false)
            .build()
            .inline(html)
            .unwrap();
        assert_eq!(output, "<html><head></head><body><p>x</p></body></html>");
    }

    #[test]
    fn test_relative_link_without_base() {
        let html = r#"<html><head><link rel="stylesheet" href="a.css"></head><body></body></html>"#;
        let err = offline().build().inline(html).unwrap_err();
        assert!(matches!(err, InlineError::InvalidUrl { .. }));
    }

    #[test]
    fn test_buffer_too_small() {
        let html = "<html><head><style>p { color: red }</style></head><body><p>x</p></body></html>";
        let inliner = offline().build();
        let mut small = [0u8; 8];
        let err = inliner.inline_to_buffer(html, &mut small).unwrap_err();
        assert!(matches!(err, InlineError::Io(_)));

        let mut large = [0u8; 256];
        let written = inliner.inline_to_buffer(html, &mut large).unwrap();
        assert_eq!(
            std::str::from_utf8(&large[..written]).unwrap(),
            r#"<html><head></head><body><p style="color: red;">x</p></body></html>"#
        );
    }

    #[test]
    fn test_inliner_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CssInliner>();
    }
}
