//! Integration tests for styleweld
//!
//! These tests drive the public inliner API end to end.

use mockall::mock;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use styleweld::network::NoFetcher;
use styleweld::{
    CssInliner, FetchError, Fetcher, InlineConfig, InlineError, InlineOptions, InlineStatus,
    StylesheetCache,
};
use url::Url;

mock! {
    pub Network {}

    impl Fetcher for Network {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
    }
}

/// Network fetcher that must never be used
fn no_network() -> Arc<MockNetwork> {
    let mut network = MockNetwork::new();
    network.expect_fetch().never();
    Arc::new(network)
}

fn offline_inliner() -> CssInliner {
    InlineOptions::new().network_fetcher(no_network()).build()
}

fn wrap(body: &str) -> String {
    format!("<html><head></head><body>{}</body></html>", body)
}

#[test]
fn test_inline_basic_document() {
    let html = r#"<html>
<head><style>h1 { color:blue; }</style></head>
<body><h1>Big Text</h1></body>
</html>"#;
    let output = offline_inliner().inline(html).unwrap();
    assert_eq!(
        output,
        "<html><head></head>\n<body><h1 style=\"color: blue;\">Big Text</h1>\n</body></html>"
    );
}

#[test]
fn test_free_function() {
    let output = styleweld::inline("<style>p { margin: 0 }</style><p>x</p>").unwrap();
    assert_eq!(output, wrap(r#"<p style="margin: 0;">x</p>"#));
}

#[test]
fn test_selector_list_applies_to_each_selector() {
    let output = offline_inliner()
        .inline("<style>h1,h2 { color:red }</style><h1>Big</h1><h2>Small</h2><h3>None</h3>")
        .unwrap();
    assert_eq!(
        output,
        wrap(r#"<h1 style="color: red;">Big</h1><h2 style="color: red;">Small</h2><h3>None</h3>"#)
    );
}

#[test]
fn test_class_selector_beats_type_selector() {
    let html = r#"<style>p.footer { font-size:1px } p { font-size:2px }</style><p class="footer">a</p><p>b</p>"#;
    let output = offline_inliner().inline(html).unwrap();
    assert_eq!(
        output,
        wrap(r#"<p class="footer" style="font-size: 1px;">a</p><p style="font-size: 2px;">b</p>"#)
    );
}

#[test]
fn test_specificity_and_important() {
    let html = r#"<style>
        #title { color: red }
        .big { color: green; font-size: 20px }
        h1 { color: blue !important; margin: 0 }
    </style><h1 id="title" class="big" style="font-size: 10px">Hi</h1>"#;
    let output = offline_inliner().inline(html).unwrap();
    assert_eq!(
        output,
        wrap(r#"<h1 id="title" class="big" style="font-size: 10px;margin: 0;color: blue;">Hi</h1>"#)
    );
}

#[test]
fn test_combinators_and_pseudo_classes() {
    let html = r#"<style>
        ul > li:first-child { color: red }
        li + li { color: blue }
        li:nth-child(2n+1):not(:first-child) { font-weight: bold }
        a[href^="https"] { text-decoration: none }
        a:hover { color: pink }
    </style><ul><li>one</li><li>two</li><li>three</li></ul>
    <a href="https://example.com">link</a>"#;
    let output = offline_inliner().inline(html).unwrap();
    let expected = wrap(
        r#"<ul><li style="color: red;">one</li><li style="color: blue;">two</li><li style="color: blue;font-weight: bold;">three</li></ul>
    <a href="https://example.com" style="text-decoration: none;">link</a>"#,
    );
    assert_eq!(output, expected);
}

#[test]
fn test_fragment_never_gains_document_tags() {
    let inliner = offline_inliner();
    let output = inliner
        .inline_fragment(
            "<main><h1>Hello</h1><section><p>who am i</p></section></main>",
            "p { color: red } h1 { color: blue }",
        )
        .unwrap();
    assert_eq!(
        output,
        r#"<main><h1 style="color: blue;">Hello</h1><section><p style="color: red;">who am i</p></section></main>"#
    );
    assert!(!output.contains("<html"));
    assert!(!output.contains("<head"));
    assert!(!output.contains("<body"));
}

#[test]
fn test_fragment_scaffolding_not_matched() {
    let output = offline_inliner()
        .inline_fragment("<p>x</p>", "body > p { color: red } * { margin: 0 }")
        .unwrap();
    assert_eq!(output, r#"<p style="margin: 0;">x</p>"#);
}

#[test]
fn test_fragment_keeps_surrounding_whitespace() {
    let output = offline_inliner()
        .inline_fragment("\n  <p>x</p>\n", "p { color: red }")
        .unwrap();
    assert_eq!(output, "\n  <p style=\"color: red;\">x</p>\n");
}

#[test]
fn test_data_css_inline_ignore() {
    let html = r#"<style>p { color: red }</style>
    <style data-css-inline="ignore">p { margin: 0 }</style>
    <p>a</p><p data-css-inline="ignore">b</p>"#;
    let output = offline_inliner().inline(html).unwrap();
    assert_eq!(
        output,
        "<html><head>\n    <style data-css-inline=\"ignore\">p { margin: 0 }</style>\n    </head><body><p style=\"color: red;\">a</p><p data-css-inline=\"ignore\">b</p></body></html>"
    );
}

#[test]
fn test_remote_stylesheet_cached_across_calls() {
    let mut network = MockNetwork::new();
    network
        .expect_fetch()
        .withf(|url| url.as_str() == "https://example.com/css/mail.css")
        .times(1)
        .returning(|_| Ok(b"p { color: green }".to_vec()));

    let cache = Arc::new(StylesheetCache::new(4).unwrap());
    let inliner = InlineOptions::new()
        .network_fetcher(Arc::new(network))
        .base_url(Some(Url::parse("https://example.com/mail/index.html").unwrap()))
        .cache(cache.clone())
        .build();

    let html = r#"<link rel="stylesheet" href="../css/mail.css"><link rel="stylesheet" href="/css/mail.css"><p>x</p>"#;
    for _ in 0..3 {
        let output = inliner.inline(html).unwrap();
        assert_eq!(output, wrap(r#"<p style="color: green;">x</p>"#));
    }
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[test]
fn test_missing_remote_stylesheet() {
    let mut network = MockNetwork::new();
    network
        .expect_fetch()
        .returning(|_| Err(FetchError::Status(404)));
    let network = Arc::new(network);
    let html = r#"<link rel="stylesheet" href="https://example.com/gone.css"><p>x</p>"#;

    let err = InlineOptions::new()
        .network_fetcher(network.clone())
        .build()
        .inline(html)
        .unwrap_err();
    assert!(matches!(
        err,
        InlineError::MissingStylesheet {
            reason: FetchError::Status(404),
            ..
        }
    ));

    let output = InlineOptions::new()
        .network_fetcher(network)
        .skip_missing_stylesheets(true)
        .build()
        .inline(html)
        .unwrap();
    assert_eq!(output, wrap("<p>x</p>"));
}

#[test]
fn test_relative_link_without_base_url() {
    let result = offline_inliner().inline(r#"<link rel="stylesheet" href="style.css"><p>x</p>"#);
    assert_eq!(InlineStatus::of(&result), InlineStatus::InvalidUrl);
}

#[test]
fn test_file_stylesheet_next_to_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.css"), "p { color: purple }").unwrap();
    let base = Url::from_directory_path(dir.path()).unwrap();

    let inliner = InlineOptions::new()
        .network_fetcher(no_network())
        .base_url(Some(base))
        .build();
    let output = inliner
        .inline(r#"<link rel="stylesheet" href="style.css"><p>x</p>"#)
        .unwrap();
    assert_eq!(output, wrap(r#"<p style="color: purple;">x</p>"#));

    let result = inliner.inline(r#"<link rel="stylesheet" href="absent.css"><p>x</p>"#);
    assert_eq!(InlineStatus::of(&result), InlineStatus::MissingStylesheet);
}

#[test]
fn test_keep_link_tags() {
    let output = InlineOptions::new()
        .network_fetcher(no_network())
        .load_remote_stylesheets(false)
        .keep_link_tags(true)
        .build()
        .inline(r#"<link rel="stylesheet" href="https://example.com/a.css"><p>x</p>"#)
        .unwrap();
    assert_eq!(
        output,
        r#"<html><head><link rel="stylesheet" href="https://example.com/a.css"></head><body><p>x</p></body></html>"#
    );
}

#[test]
fn test_zero_cache_size_rejected() {
    assert!(matches!(
        StylesheetCache::new(0),
        Err(InlineError::InvalidCacheSize(0))
    ));
    let config = InlineConfig::from_json(r#"{"cache_size": 0}"#).unwrap();
    let result = InlineOptions::try_from(config);
    assert_eq!(InlineStatus::of(&result), InlineStatus::InvalidCacheSize);
}

#[test]
fn test_invalid_style_attribute() {
    let result = offline_inliner().inline(
        r#"<style>p { color: red }</style><p style="@media print { color: blue }">x</p>"#,
    );
    assert_eq!(InlineStatus::of(&result), InlineStatus::ParseError);
}

#[test]
fn test_output_buffer() {
    let inliner = offline_inliner();
    let html = "<style>p { color: red }</style><p>x</p>";
    let expected = wrap(r#"<p style="color: red;">x</p>"#);

    let mut buffer = vec![0u8; expected.len()];
    let written = inliner.inline_to_buffer(html, &mut buffer).unwrap();
    assert_eq!(&buffer[..written], expected.as_bytes());

    let mut small = vec![0u8; expected.len() - 1];
    let result = inliner.inline_to_buffer(html, &mut small);
    assert_eq!(InlineStatus::of(&result), InlineStatus::IoError);

    let mut fragment = [0u8; 4];
    let result = inliner.inline_fragment_to_buffer("<p>x</p>", "p { color: red }", &mut fragment);
    assert!(matches!(result, Err(InlineError::Io(_))));
}

#[test]
fn test_shared_inliner_across_threads() {
    let inliner = offline_inliner();
    let html = "<style>.a { color: red } p { margin: 0 }</style><p class=\"a\">x</p>";
    let expected = inliner.inline(html).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| inliner.inline(html).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

proptest! {
    #[test]
    fn test_output_is_deterministic(text in "[a-z ]{0,24}", class in "[a-z]{1,8}") {
        let html = format!(
            "<style>.{class} {{ color: red }} p {{ margin: 0 }}</style><p class=\"{class}\">{text}</p>"
        );
        let inliner = offline_inliner();
        let first = inliner.inline(&html).unwrap();
        let second = inliner.inline(&html).unwrap();
        prop_assert_eq!(&first, &second);
        let expected = format!("<p class=\"{class}\" style=\"margin: 0;color: red;\">{text}</p>");
        prop_assert!(first.contains(&expected));
    }

    #[test]
    fn test_arbitrary_input_does_not_panic(html in "\\PC*", css in "\\PC{0,64}") {
        let inliner = InlineOptions::new()
            .network_fetcher(Arc::new(NoFetcher))
            .file_fetcher(Arc::new(NoFetcher))
            .build();
        let _ = inliner.inline_fragment(&html, &css);
    }
}
