//! CSS parsing and selector matching

pub mod parser;
pub mod selector;

pub use parser::{CssParser, Declaration, Rule, Stylesheet};
pub use selector::{Combinator, Component, PseudoClass, Selector, SelectorList, Specificity};
