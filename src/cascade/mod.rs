//! Cascade resolution
//!
//! Matches every rule of every applied stylesheet against the document,
//! orders the resulting declarations by cascade key and merges them into
//! each element's `style` attribute.

pub mod merge;

pub use merge::{Level, merge_styles};

use crate::css::{CssParser, Declaration, Specificity, Stylesheet};
use crate::dom::{Document, InlineControl, NodeId};
use crate::utils::Result;
use std::sync::Arc;

/// A parsed stylesheet placed at a position in the document's source order
///
/// The same cached stylesheet may sit at different positions in different
/// documents, so the order is attached here rather than to the stylesheet.
#[derive(Debug, Clone)]
pub struct AppliedStylesheet {
    pub stylesheet: Arc<Stylesheet>,
    pub source_order: usize,
}

impl AppliedStylesheet {
    pub fn new(stylesheet: Arc<Stylesheet>, source_order: usize) -> Self {
        Self {
            stylesheet,
            source_order,
        }
    }
}

/// A rule whose selector matched a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub node: NodeId,
    /// Index into the applied stylesheets
    pub stylesheet: usize,
    /// Index of the rule inside its stylesheet
    pub rule: usize,
    pub specificity: Specificity,
}

/// Sort key of a single declaration; fields compare in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CascadeKey {
    pub level: Level,
    pub specificity: Specificity,
    pub source_order: usize,
    pub rule: usize,
    pub declaration: usize,
}

/// Applies stylesheets to a document
#[derive(Debug, Clone, Default)]
pub struct CascadeEngine {
    parser: CssParser,
}

impl CascadeEngine {
    /// Create a new cascade engine
    pub fn new() -> Self {
        Self {
            parser: CssParser::new(),
        }
    }

    /// Rules matching `node`, in stylesheet then rule order
    pub fn matches_for(
        &self,
        document: &Document,
        node: NodeId,
        stylesheets: &[AppliedStylesheet],
    ) -> Vec<Match> {
        let mut matches = Vec::new();
        for (stylesheet_idx, applied) in stylesheets.iter().enumerate() {
            for (rule_idx, rule) in applied.stylesheet.rules.iter().enumerate() {
                if rule.selector.matches(document, node) {
                    matches.push(Match {
                        node,
                        stylesheet: stylesheet_idx,
                        rule: rule_idx,
                        specificity: rule.selector.specificity(),
                    });
                }
            }
        }
        matches
    }

    /// Expand matches into declarations sorted by ascending cascade key
    pub fn cascade<'s>(
        &self,
        matches: &[Match],
        stylesheets: &'s [AppliedStylesheet],
    ) -> Vec<(CascadeKey, &'s Declaration)> {
        let mut declarations = Vec::new();
        for m in matches {
            let Some(applied) = stylesheets.get(m.stylesheet) else {
                continue;
            };
            let Some(rule) = applied.stylesheet.rules.get(m.rule) else {
                continue;
            };
            for (declaration_idx, declaration) in rule.declarations.iter().enumerate() {
                let key = CascadeKey {
                    level: Level::for_rule(declaration),
                    specificity: m.specificity,
                    source_order: applied.source_order,
                    rule: m.rule,
                    declaration: declaration_idx,
                };
                declarations.push((key, declaration));
            }
        }
        declarations.sort_by_key(|(key, _)| *key);
        declarations
    }

    /// Compute the new `style` value of every styled element, without touching the document
    pub fn resolve(
        &self,
        document: &Document,
        stylesheets: &[AppliedStylesheet],
    ) -> Result<Vec<(NodeId, String)>> {
        let mut styles = Vec::new();
        for node in document.elements() {
            if !document.is_matchable(node) {
                continue;
            }
            let Some(element) = document.element(node) else {
                continue;
            };
            if element.inline_control() == InlineControl::Ignore {
                continue;
            }
            let matches = self.matches_for(document, node, stylesheets);
            if matches.is_empty() {
                continue;
            }
            let declarations = self.cascade(&matches, stylesheets);
            let style = merge_styles(
                &self.parser,
                element.style(),
                declarations.iter().map(|(_, declaration)| *declaration),
            )?;
            log::trace!(
                "<{}> matched {} rule(s), style=\"{}\"",
                element.local_name(),
                matches.len(),
                style
            );
            styles.push((node, style));
        }
        Ok(styles)
    }

    /// Inline `stylesheets` into `document`
    ///
    /// Either every element is updated or, on error, none is.
    pub fn apply(&self, document: &mut Document, stylesheets: &[AppliedStylesheet]) -> Result<()> {
        let styles = self.resolve(document, stylesheets)?;
        log::debug!("Inlining styles into {} element(s)", styles.len());
        for (node, style) in styles {
            if let Some(element) = document.element_mut(node) {
                element.set_attribute("style", style);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlParser, ParseMode, SerializeOptions, serialize_to_string};
    use pretty_assertions::assert_eq;

    fn applied(css: &[&str]) -> Vec<AppliedStylesheet> {
        css.iter()
            .enumerate()
            .map(|(idx, css)| AppliedStylesheet::new(Arc::new(CssParser::new().parse(css)), idx))
            .collect()
    }

    fn inline(html: &str, css: &[&str]) -> String {
        let mut document = HtmlParser::new().parse(html, ParseMode::Fragment);
        CascadeEngine::new()
            .apply(&mut document, &applied(css))
            .unwrap();
        serialize_to_string(&document, SerializeOptions::default())
    }

    #[test]
    fn test_specificity_beats_order() {
        let output = inline(
            r#"<p id="x" class="y">t</p>"#,
            &["#x { color: red } .y { color: blue } p { color: green }"],
        );
        assert_eq!(output, r#"<p id="x" class="y" style="color: red;">t</p>"#);
    }

    #[test]
    fn test_source_order_breaks_ties() {
        let output = inline("<p>t</p>", &["p { color: red }", "p { color: blue }"]);
        assert_eq!(output, r#"<p style="color: blue;">t</p>"#);
    }

    #[test]
    fn test_declaration_order_within_rule() {
        let output = inline("<p>t</p>", &["p { color: red; color: blue }"]);
        assert_eq!(output, r#"<p style="color: blue;">t</p>"#);
    }

    #[test]
    fn test_important_beats_specificity() {
        let output = inline(
            r#"<p id="x">t</p>"#,
            &["p { color: red !important } #x { color: blue }"],
        );
        assert_eq!(output, r#"<p id="x" style="color: red;">t</p>"#);
    }

    #[test]
    fn test_existing_inline_style() {
        let output = inline(
            r#"<p style="color: black; margin: 0">t</p>"#,
            &["p { color: red; padding: 1px }"],
        );
        assert_eq!(
            output,
            r#"<p style="color: black;margin: 0;padding: 1px;">t</p>"#
        );
    }

    #[test]
    fn test_unmatched_style_is_untouched() {
        let output = inline(
            r#"<p style="color:black ;">t</p><span>s</span>"#,
            &["span { color: red }"],
        );
        assert_eq!(
            output,
            r#"<p style="color:black ;">t</p><span style="color: red;">s</span>"#
        );
    }

    #[test]
    fn test_ignored_element() {
        let output = inline(
            r#"<p data-css-inline="ignore">t</p>"#,
            &["p { color: red }"],
        );
        assert_eq!(output, r#"<p data-css-inline="ignore">t</p>"#);
    }

    #[test]
    fn test_invalid_inline_style_fails_without_changes() {
        let mut document = HtmlParser::new().parse(
            r#"<span>ok</span><p style="@import x;">t</p>"#,
            ParseMode::Fragment,
        );
        let result =
            CascadeEngine::new().apply(&mut document, &applied(&["span, p { color: red }"]));
        assert!(result.is_err());
        let output = serialize_to_string(&document, SerializeOptions::default());
        assert_eq!(output, r#"<span>ok</span><p style="@import x;">t</p>"#);
    }

    #[test]
    fn test_cascade_keys_sorted() {
        let document = HtmlParser::new().parse(r#"<p class="a">t</p>"#, ParseMode::Fragment);
        let sheets = applied(&[".a { color: red } p { margin: 0; color: blue }"]);
        let engine = CascadeEngine::new();
        let p = document.find_element("p").unwrap();
        let matches = engine.matches_for(&document, p, &sheets);
        assert_eq!(matches.len(), 2);
        let declarations = engine.cascade(&matches, &sheets);
        let names: Vec<_> = declarations
            .iter()
            .map(|(_, d)| format!("{}:{}", d.name, d.value))
            .collect();
        assert_eq!(names, vec!["margin:0", "color:blue", "color:red"]);
    }
}
