//! Selector parsing, specificity and matching
//!
//! Selectors are parsed with cssparser's tokenizer into a flat list of
//! [`Component`]s. Compounds are separated by [`Component::Combinator`]
//! entries and matching walks them right to left.

use crate::dom::{Document, ElementData, NodeData, NodeId};
use crate::utils::{InlineError, Result};
use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};
use std::fmt;
use std::ops::Add;

/// Selector specificity: (ids, classes/attributes/pseudo-classes, tags/pseudo-elements)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Add for Specificity {
    type Output = Specificity;

    fn add(self, other: Specificity) -> Specificity {
        Specificity(
            self.0.saturating_add(other.0),
            self.1.saturating_add(other.1),
            self.2.saturating_add(other.2),
        )
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Relationship between two compounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Attribute selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `[a]`
    Exists,
    /// `[a=v]`
    Equals,
    /// `[a~=v]`
    Includes,
    /// `[a|=v]`
    DashMatch,
    /// `[a^=v]`
    Prefix,
    /// `[a$=v]`
    Suffix,
    /// `[a*=v]`
    Substring,
}

/// `An+B` argument of the `:nth-*` pseudo-classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    /// Whether the 1-based `index` is selected
    ///
    /// Computed in `i64` so that extreme `A` and `B` values cannot overflow.
    pub fn matches(self, index: i32) -> bool {
        let (a, b, index) = (i64::from(self.a), i64::from(self.b), i64::from(index));
        if a == 0 {
            return index == b;
        }
        let diff = index - b;
        diff % a == 0 && diff / a >= 0
    }
}

/// Pseudo-classes
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    /// `:not(a, b)`, each argument a compound selector
    Not(Vec<Vec<Component>>),
    /// `:link` and `:any-link`
    Link,
    /// User-action and state pseudo-classes; they never match a static document
    Dynamic(String),
}

/// Pseudo-classes that depend on user interaction or runtime state
const DYNAMIC_PSEUDO_CLASSES: &[&str] = &[
    "hover",
    "focus",
    "active",
    "visited",
    "focus-within",
    "focus-visible",
    "target",
    "checked",
    "disabled",
    "enabled",
];

/// Pseudo-elements accepted with the single-colon syntax
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// One selector component
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// `*`
    Universal,
    /// Type selector, lowercased
    Tag(String),
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name op value i]`
    Attribute {
        name: String,
        operator: AttributeOperator,
        value: String,
        case_insensitive: bool,
    },
    PseudoClass(PseudoClass),
    /// `::before` and friends; never matches an element
    PseudoElement(String),
    Combinator(Combinator),
}

/// A parsed selector list
pub type SelectorList = Vec<Selector>;

/// A single complex selector
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    components: Vec<Component>,
    specificity: Specificity,
}

impl Selector {
    /// Parse a comma-separated selector list, failing on the first unsupported selector
    pub fn parse(text: &str) -> Result<SelectorList> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_comma_separated(|input| parse_complex(input))
            .map_err(|_| InlineError::Parse(format!("unsupported selector `{}`", text.trim())))
    }

    /// Build a selector from components
    pub fn from_components(components: Vec<Component>) -> Self {
        let specificity = compound_specificity(&components);
        Self {
            components,
            specificity,
        }
    }

    /// Components in source order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Whether the selector matches `node`
    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        document.is_matchable(node) && matches_complex(&self.components, document, node)
    }
}

/// Parse a selector list, dropping the selectors that are unsupported
pub fn parse_selector_list(text: &str) -> SelectorList {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut selectors = Vec::new();
    loop {
        let start = parser.position();
        match parser.parse_until_before(Delimiter::Comma, |input| parse_complex(input)) {
            Ok(selector) => selectors.push(selector),
            Err(_) => log::trace!(
                "Skipping unsupported selector `{}`",
                parser.slice_from(start).trim()
            ),
        }
        if parser.next().is_err() {
            break;
        }
    }
    selectors
}

fn compound_specificity(components: &[Component]) -> Specificity {
    components
        .iter()
        .map(component_specificity)
        .fold(Specificity::default(), Add::add)
}

fn component_specificity(component: &Component) -> Specificity {
    match component {
        Component::Universal | Component::Combinator(_) => Specificity::default(),
        Component::Id(_) => Specificity(1, 0, 0),
        Component::Class(_) | Component::Attribute { .. } => Specificity(0, 1, 0),
        Component::PseudoClass(PseudoClass::Not(arguments)) => arguments
            .iter()
            .map(|argument| compound_specificity(argument))
            .max()
            .unwrap_or_default(),
        Component::PseudoClass(_) => Specificity(0, 1, 0),
        Component::Tag(_) | Component::PseudoElement(_) => Specificity(0, 0, 1),
    }
}

type ParseResult<'i, T> = std::result::Result<T, ParseError<'i, ()>>;

fn parse_complex<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Selector> {
    let components = parse_components(input, true)?;
    Ok(Selector::from_components(components))
}

/// Parse components until the input is exhausted
fn parse_components<'i>(
    input: &mut Parser<'i, '_>,
    allow_combinators: bool,
) -> ParseResult<'i, Vec<Component>> {
    input.skip_whitespace();
    let mut components = Vec::new();
    // Components since the last combinator
    let mut compound_len = 0usize;
    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let component = match token {
            Token::WhiteSpace(_) => {
                input.skip_whitespace();
                if input.is_exhausted() {
                    break;
                }
                let state = input.state();
                let explicit = matches!(
                    input.next_including_whitespace(),
                    Ok(Token::Delim('>' | '+' | '~'))
                );
                input.reset(&state);
                if explicit {
                    continue;
                }
                Component::Combinator(Combinator::Descendant)
            }
            Token::Delim('>') => Component::Combinator(Combinator::Child),
            Token::Delim('+') => Component::Combinator(Combinator::NextSibling),
            Token::Delim('~') => Component::Combinator(Combinator::SubsequentSibling),
            Token::Delim('*') if compound_len == 0 => Component::Universal,
            Token::Ident(name) if compound_len == 0 => Component::Tag(name.to_ascii_lowercase()),
            Token::IDHash(id) => Component::Id(id.to_string()),
            Token::Delim('.') => match input.next_including_whitespace()?.clone() {
                Token::Ident(class) => Component::Class(class.to_string()),
                _ => return Err(input.new_custom_error(())),
            },
            Token::SquareBracketBlock => input.parse_nested_block(parse_attribute)?,
            Token::Colon => parse_pseudo(input)?,
            _ => return Err(input.new_custom_error(())),
        };

        if let Component::Combinator(_) = component {
            if !allow_combinators || compound_len == 0 {
                return Err(input.new_custom_error(()));
            }
            compound_len = 0;
            input.skip_whitespace();
        } else {
            compound_len += 1;
        }
        components.push(component);
    }

    if compound_len == 0 {
        // Empty selector or a dangling combinator
        return Err(input.new_custom_error(()));
    }
    Ok(components)
}

fn parse_attribute<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Component> {
    let name = input.expect_ident()?.to_ascii_lowercase();
    if input.is_exhausted() {
        return Ok(Component::Attribute {
            name,
            operator: AttributeOperator::Exists,
            value: String::new(),
            case_insensitive: false,
        });
    }
    let operator = match input.next()?.clone() {
        Token::Delim('=') => AttributeOperator::Equals,
        Token::IncludeMatch => AttributeOperator::Includes,
        Token::DashMatch => AttributeOperator::DashMatch,
        Token::PrefixMatch => AttributeOperator::Prefix,
        Token::SuffixMatch => AttributeOperator::Suffix,
        Token::SubstringMatch => AttributeOperator::Substring,
        _ => return Err(input.new_custom_error(())),
    };
    let value = match input.next()?.clone() {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        _ => return Err(input.new_custom_error(())),
    };
    let case_insensitive = if input.try_parse(|i| i.expect_ident_matching("i")).is_ok() {
        true
    } else {
        let _ = input.try_parse(|i| i.expect_ident_matching("s"));
        false
    };
    input.expect_exhausted()?;
    Ok(Component::Attribute {
        name,
        operator,
        value,
        case_insensitive,
    })
}

fn parse_pseudo<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Component> {
    let token = input.next_including_whitespace()?.clone();
    match token {
        Token::Colon => match input.next_including_whitespace()?.clone() {
            Token::Ident(name) => Ok(Component::PseudoElement(name.to_ascii_lowercase())),
            _ => Err(input.new_custom_error(())),
        },
        Token::Ident(name) => {
            let name = name.to_ascii_lowercase();
            let pseudo = match name.as_str() {
                "root" => PseudoClass::Root,
                "empty" => PseudoClass::Empty,
                "first-child" => PseudoClass::FirstChild,
                "last-child" => PseudoClass::LastChild,
                "only-child" => PseudoClass::OnlyChild,
                "first-of-type" => PseudoClass::FirstOfType,
                "last-of-type" => PseudoClass::LastOfType,
                "only-of-type" => PseudoClass::OnlyOfType,
                "link" | "any-link" => PseudoClass::Link,
                n if LEGACY_PSEUDO_ELEMENTS.contains(&n) => {
                    return Ok(Component::PseudoElement(n.to_string()));
                }
                n if DYNAMIC_PSEUDO_CLASSES.contains(&n) => PseudoClass::Dynamic(n.to_string()),
                _ => return Err(input.new_custom_error(())),
            };
            Ok(Component::PseudoClass(pseudo))
        }
        Token::Function(name) => {
            let name = name.to_ascii_lowercase();
            let pseudo = input.parse_nested_block(|input| match name.as_str() {
                "nth-child" => parse_nth(input).map(PseudoClass::NthChild),
                "nth-last-child" => parse_nth(input).map(PseudoClass::NthLastChild),
                "nth-of-type" => parse_nth(input).map(PseudoClass::NthOfType),
                "nth-last-of-type" => parse_nth(input).map(PseudoClass::NthLastOfType),
                "not" => input
                    .parse_comma_separated(|input| parse_components(input, false))
                    .map(PseudoClass::Not),
                _ => Err(input.new_custom_error(())),
            })?;
            Ok(Component::PseudoClass(pseudo))
        }
        _ => Err(input.new_custom_error(())),
    }
}

fn parse_nth<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Nth> {
    let (a, b) = cssparser::parse_nth(input)?;
    input.expect_exhausted()?;
    Ok(Nth { a, b })
}

fn matches_complex(components: &[Component], document: &Document, node: NodeId) -> bool {
    let split = components
        .iter()
        .rposition(|c| matches!(c, Component::Combinator(_)));
    let (rest, compound) = match split {
        Some(index) => components.split_at(index),
        None => (&components[..0], components),
    };
    // `compound` starts with the combinator when there is one
    let (combinator, compound) = match compound.split_first() {
        Some((Component::Combinator(combinator), tail)) => (Some(*combinator), tail),
        _ => (None, compound),
    };
    if !matches_compound(compound, document, node) {
        return false;
    }
    let Some(combinator) = combinator else {
        return true;
    };
    match combinator {
        Combinator::Child => document
            .parent_element(node)
            .is_some_and(|parent| matches_complex(rest, document, parent)),
        Combinator::Descendant => {
            let mut current = document.parent_element(node);
            while let Some(ancestor) = current {
                if matches_complex(rest, document, ancestor) {
                    return true;
                }
                current = document.parent_element(ancestor);
            }
            false
        }
        Combinator::NextSibling => previous_siblings(document, node)
            .next()
            .is_some_and(|sibling| matches_complex(rest, document, sibling)),
        Combinator::SubsequentSibling => previous_siblings(document, node)
            .any(|sibling| matches_complex(rest, document, sibling)),
    }
}

/// Preceding element siblings, nearest first
fn previous_siblings(document: &Document, node: NodeId) -> impl Iterator<Item = NodeId> {
    let siblings: Vec<NodeId> = document.element_siblings(node).collect();
    let position = siblings.iter().position(|&s| s == node).unwrap_or(0);
    siblings.into_iter().take(position).rev()
}

fn matches_compound(compound: &[Component], document: &Document, node: NodeId) -> bool {
    let Some(element) = document.element(node) else {
        return false;
    };
    compound
        .iter()
        .all(|component| matches_simple(component, element, document, node))
}

fn matches_simple(
    component: &Component,
    element: &ElementData,
    document: &Document,
    node: NodeId,
) -> bool {
    match component {
        Component::Universal => true,
        Component::Tag(tag) => element.has_tag(tag),
        Component::Id(id) => element.id() == Some(id.as_str()),
        Component::Class(class) => element.has_class(class),
        Component::Attribute {
            name,
            operator,
            value,
            case_insensitive,
        } => element
            .get_attribute(name)
            .is_some_and(|actual| matches_attribute(*operator, actual, value, *case_insensitive)),
        Component::PseudoClass(pseudo) => matches_pseudo_class(pseudo, element, document, node),
        Component::PseudoElement(_) => false,
        Component::Combinator(_) => false,
    }
}

fn matches_attribute(
    operator: AttributeOperator,
    actual: &str,
    expected: &str,
    case_insensitive: bool,
) -> bool {
    let (actual, expected) = if case_insensitive {
        (actual.to_lowercase(), expected.to_lowercase())
    } else {
        (actual.to_string(), expected.to_string())
    };
    match operator {
        AttributeOperator::Exists => true,
        AttributeOperator::Equals => actual == expected,
        AttributeOperator::Includes => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_ascii_whitespace().any(|word| word == expected)
        }
        AttributeOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttributeOperator::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

fn matches_pseudo_class(
    pseudo: &PseudoClass,
    element: &ElementData,
    document: &Document,
    node: NodeId,
) -> bool {
    match pseudo {
        PseudoClass::Root => {
            document.parent(node) == Some(NodeId::DOCUMENT) && document.is_matchable(node)
        }
        PseudoClass::Empty => document.children(node).iter().all(|&child| {
            match document.get(child).map(|n| &n.data) {
                Some(NodeData::Text(text)) => text.is_empty(),
                Some(NodeData::Comment(_) | NodeData::ProcessingInstruction { .. }) => true,
                _ => false,
            }
        }),
        PseudoClass::FirstChild => position(document, node, false, false) == 1,
        PseudoClass::LastChild => position(document, node, false, true) == 1,
        PseudoClass::OnlyChild => {
            position(document, node, false, false) == 1
                && position(document, node, false, true) == 1
        }
        PseudoClass::FirstOfType => position(document, node, true, false) == 1,
        PseudoClass::LastOfType => position(document, node, true, true) == 1,
        PseudoClass::OnlyOfType => {
            position(document, node, true, false) == 1 && position(document, node, true, true) == 1
        }
        PseudoClass::NthChild(nth) => nth.matches(position(document, node, false, false)),
        PseudoClass::NthLastChild(nth) => nth.matches(position(document, node, false, true)),
        PseudoClass::NthOfType(nth) => nth.matches(position(document, node, true, false)),
        PseudoClass::NthLastOfType(nth) => nth.matches(position(document, node, true, true)),
        PseudoClass::Not(arguments) => !arguments
            .iter()
            .any(|argument| matches_compound(argument, document, node)),
        PseudoClass::Link => {
            (element.has_tag("a") || element.has_tag("area") || element.has_tag("link"))
                && element.get_attribute("href").is_some()
        }
        PseudoClass::Dynamic(_) => false,
    }
}

/// 1-based position among element siblings, optionally of the same type and from the end
fn position(document: &Document, node: NodeId, of_type: bool, from_end: bool) -> i32 {
    let Some(element) = document.element(node) else {
        return 0;
    };
    let mut siblings: Vec<NodeId> = document
        .element_siblings(node)
        .filter(|&sibling| {
            !of_type
                || document
                    .element(sibling)
                    .is_some_and(|other| other.name == element.name)
        })
        .collect();
    if from_end {
        siblings.reverse();
    }
    siblings
        .iter()
        .position(|&s| s == node)
        .map_or(0, |index| i32::try_from(index + 1).unwrap_or(i32::MAX))
}
