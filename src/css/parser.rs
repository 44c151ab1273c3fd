//! CSS rule and declaration parsing using cssparser

use super::selector::{Selector, parse_selector_list};
use crate::utils::{InlineError, Result};
use cssparser::{
    AtRuleParser, BasicParseError, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError,
    Parser, ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    SourcePosition, StyleSheetParser,
};
use std::sync::Arc;

/// CSS declaration (property: value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property name, lowercased unless it is a custom property
    pub name: String,
    /// Raw value text without the `!important` marker
    pub value: String,
    /// `!important` was present
    pub important: bool,
}

impl Declaration {
    /// Create a declaration
    pub fn new(name: impl Into<String>, value: impl Into<String>, important: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important,
        }
    }
}

/// CSS rule: one selector and the declarations of its block
///
/// A selector list `h1, h2 { .. }` produces one rule per selector; they share
/// the same declaration slice.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: Arc<[Declaration]>,
}

/// CSS stylesheet
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// No rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize_property(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Try to read a trailing `!important`; returns the position of the `!`
fn important_tail<'i>(
    input: &mut Parser<'i, '_>,
) -> std::result::Result<SourcePosition, BasicParseError<'i>> {
    input.skip_whitespace();
    let position = input.position();
    input.expect_delim('!')?;
    input.expect_ident_matching("important")?;
    input.expect_exhausted()?;
    Ok(position)
}

/// Consume a declaration value, splitting off `!important`
fn consume_value<'i>(input: &mut Parser<'i, '_>) -> (&'i str, bool) {
    let start = input.position();
    loop {
        if let Ok(bang) = input.try_parse(important_tail) {
            return (input.slice(start..bang).trim(), true);
        }
        if input.next_including_whitespace_and_comments().is_err() {
            break;
        }
    }
    (input.slice_from(start).trim(), false)
}

/// Parser for the inside of `{}` blocks and `style` attributes
struct DeclarationListParser;

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> std::result::Result<Declaration, ParseError<'i, ()>> {
        let (value, important) = consume_value(input);
        Ok(Declaration::new(normalize_property(&name), value, important))
    }
}

impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<(), ParseError<'i, ()>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Declaration, ()> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Top-level parser producing rules from qualified rules
struct RuleListParser;

impl<'i> QualifiedRuleParser<'i> for RuleListParser {
    type Prelude = Vec<Selector>;
    type QualifiedRule = Vec<Rule>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Vec<Selector>, ParseError<'i, ()>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let prelude = input.slice_from(start);
        let selectors = parse_selector_list(prelude);
        if selectors.is_empty() {
            log::trace!("Skipping rule with no supported selectors: `{prelude}`");
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        selectors: Vec<Selector>,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Vec<Rule>, ParseError<'i, ()>> {
        let mut body = DeclarationListParser;
        let declarations: Arc<[Declaration]> = RuleBodyParser::new(input, &mut body)
            .filter_map(|item| match item {
                Ok(declaration) => Some(declaration),
                Err((_, slice)) => {
                    log::trace!("Skipping invalid declaration: `{slice}`");
                    None
                }
            })
            .collect();
        Ok(selectors
            .into_iter()
            .map(|selector| Rule {
                selector,
                declarations: Arc::clone(&declarations),
            })
            .collect())
    }
}

impl<'i> AtRuleParser<'i> for RuleListParser {
    type Prelude = ();
    type AtRule = Vec<Rule>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<(), ParseError<'i, ()>> {
        log::trace!("Skipping at-rule @{name}");
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }
}

/// CSS parser using cssparser crate
#[derive(Debug, Clone, Copy, Default)]
pub struct CssParser;

impl CssParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse CSS content into a stylesheet
    ///
    /// Invalid rules, unsupported selectors and at-rules are skipped.
    pub fn parse(&self, content: &str) -> Stylesheet {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        let mut top = RuleListParser;
        let mut rules = Vec::new();
        for item in StyleSheetParser::new(&mut parser, &mut top) {
            match item {
                Ok(parsed) => rules.extend(parsed),
                Err((_, slice)) => log::trace!("Skipping invalid rule: `{slice}`"),
            }
        }
        Stylesheet { rules }
    }

    /// Parse the content of a `style` attribute
    ///
    /// Unlike stylesheets, any invalid item is an error.
    pub fn parse_declarations(&self, content: &str) -> Result<Vec<Declaration>> {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        let mut body = DeclarationListParser;
        RuleBodyParser::new(&mut parser, &mut body)
            .map(|item| {
                item.map_err(|(_, slice)| {
                    InlineError::Parse(format!("invalid inline style declaration `{slice}`"))
                })
            })
            .collect()
    }
}
