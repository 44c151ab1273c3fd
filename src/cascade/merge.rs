//! Merging cascaded declarations into an element's `style` attribute

use crate::css::{CssParser, Declaration};
use crate::utils::Result;

/// Precedence level of a declaration, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Stylesheet rule
    Normal,
    /// Declaration already present in the `style` attribute
    Inline,
    /// `!important` stylesheet rule
    Important,
    /// `!important` declaration already present in the `style` attribute
    InlineImportant,
}

impl Level {
    /// Level of a stylesheet declaration
    pub fn for_rule(declaration: &Declaration) -> Self {
        if declaration.important {
            Level::Important
        } else {
            Level::Normal
        }
    }

    /// Level of an existing inline declaration
    pub fn for_inline(declaration: &Declaration) -> Self {
        if declaration.important {
            Level::InlineImportant
        } else {
            Level::Inline
        }
    }
}

#[derive(Debug)]
struct MergedDeclaration<'a> {
    name: &'a str,
    value: &'a str,
    level: Level,
}

/// Merge `candidates`, already sorted in ascending cascade order, into `existing`
///
/// Existing inline declarations keep their position; new properties are
/// appended in first-seen order. A candidate replaces a property when its
/// level is at least the level currently holding it.
pub fn merge_styles<'a>(
    parser: &CssParser,
    existing: Option<&str>,
    candidates: impl IntoIterator<Item = &'a Declaration>,
) -> Result<String> {
    let inline = match existing {
        Some(style) => parser.parse_declarations(style)?,
        None => Vec::new(),
    };

    let mut merged: Vec<MergedDeclaration<'_>> = Vec::with_capacity(inline.len());
    for declaration in &inline {
        let entry = MergedDeclaration {
            name: &declaration.name,
            value: &declaration.value,
            level: Level::for_inline(declaration),
        };
        match merged.iter_mut().find(|m| m.name == declaration.name) {
            Some(current) => *current = entry,
            None => merged.push(entry),
        }
    }

    for declaration in candidates {
        let level = Level::for_rule(declaration);
        match merged.iter_mut().find(|m| m.name == declaration.name) {
            Some(current) if level >= current.level => {
                current.value = &declaration.value;
                current.level = level;
            }
            Some(_) => {}
            None => merged.push(MergedDeclaration {
                name: &declaration.name,
                value: &declaration.value,
                level,
            }),
        }
    }

    let mut output = String::new();
    for declaration in &merged {
        write_declaration(
            &mut output,
            declaration.name,
            declaration.value,
            declaration.level == Level::InlineImportant,
        );
    }
    Ok(output)
}

/// Append `name: value;` to `output`
fn write_declaration(output: &mut String, name: &str, value: &str, important: bool) {
    let value = value.trim();
    output.push_str(name);
    output.push_str(": ");
    if name == "font-family" && value.contains('"') {
        output.push_str(&value.replace('"', "'"));
    } else {
        output.push_str(value);
    }
    if important {
        output.push_str(" !important");
    }
    output.push(';');
}
