//! HTML serializer for the arena DOM

use super::node::{Document, ElementData, InlineControl, NodeData, NodeId};
use std::io::{self, Write};

/// Elements whose text content is written verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style",
    "script",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
    "noscript",
];

/// Elements that never get a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Which stylesheet-carrying elements survive serialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Keep every `<style>` element
    pub keep_style_tags: bool,
    /// Keep every `<link rel="stylesheet">` element
    pub keep_link_tags: bool,
}

/// Writes a [`Document`] back to HTML
pub struct HtmlSerializer<'a, W: Write> {
    document: &'a Document,
    writer: W,
    options: SerializeOptions,
}

impl<'a, W: Write> HtmlSerializer<'a, W> {
    /// Create a serializer over `document`
    pub fn new(document: &'a Document, writer: W, options: SerializeOptions) -> Self {
        Self {
            document,
            writer,
            options,
        }
    }

    /// Serialize the whole document
    pub fn serialize(mut self) -> io::Result<W> {
        self.serialize_children(NodeId::DOCUMENT, false)?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn should_skip(&self, element: &ElementData) -> bool {
        match element.inline_control() {
            InlineControl::Ignore | InlineControl::Keep => false,
            InlineControl::Default if element.is_style() => !self.options.keep_style_tags,
            InlineControl::Default if element.is_stylesheet_link() => {
                !self.options.keep_link_tags
            }
            InlineControl::Default => false,
        }
    }

    fn serialize_children(&mut self, id: NodeId, raw_text: bool) -> io::Result<()> {
        let document = self.document;
        for &child in document.children(id) {
            self.serialize_node(child, raw_text)?;
        }
        Ok(())
    }

    fn serialize_node(&mut self, id: NodeId, raw_text: bool) -> io::Result<()> {
        let document = self.document;
        let Some(node) = document.get(id) else {
            return Ok(());
        };
        match &node.data {
            NodeData::Document => self.serialize_children(id, false),
            NodeData::Element(element) => {
                if node.scaffolding {
                    return self.serialize_children(id, false);
                }
                if self.should_skip(element) {
                    return Ok(());
                }
                self.start_elem(element)?;
                if element.is_html() && VOID_ELEMENTS.contains(&element.local_name()) {
                    return Ok(());
                }
                let raw = element.is_html() && RAW_TEXT_ELEMENTS.contains(&element.local_name());
                self.serialize_children(id, raw)?;
                self.end_elem(element)
            }
            NodeData::Doctype { name } => {
                self.writer.write_all(b"<!DOCTYPE ")?;
                self.writer.write_all(name.as_bytes())?;
                self.writer.write_all(b">")
            }
            NodeData::Text(text) => {
                if raw_text {
                    self.writer.write_all(text.as_bytes())
                } else {
                    self.write_escaped(text, false)
                }
            }
            NodeData::Comment(text) => {
                self.writer.write_all(b"<!--")?;
                self.writer.write_all(text.as_bytes())?;
                self.writer.write_all(b"-->")
            }
            NodeData::ProcessingInstruction { target, data } => {
                self.writer.write_all(b"<?")?;
                self.writer.write_all(target.as_bytes())?;
                self.writer.write_all(b" ")?;
                self.writer.write_all(data.as_bytes())?;
                self.writer.write_all(b">")
            }
        }
    }

    fn start_elem(&mut self, element: &ElementData) -> io::Result<()> {
        self.writer.write_all(b"<")?;
        self.writer.write_all(element.local_name().as_bytes())?;
        for attr in &element.attributes {
            self.writer.write_all(b" ")?;
            self.writer.write_all(attr.name.as_bytes())?;
            self.writer.write_all(b"=\"")?;
            self.write_escaped(&attr.value, true)?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(b">")
    }

    fn end_elem(&mut self, element: &ElementData) -> io::Result<()> {
        self.writer.write_all(b"</")?;
        self.writer.write_all(element.local_name().as_bytes())?;
        self.writer.write_all(b">")
    }

    fn write_escaped(&mut self, text: &str, attribute: bool) -> io::Result<()> {
        let mut start = 0;
        for (pos, c) in text.char_indices() {
            let escaped: &[u8] = match c {
                '&' => b"&amp;",
                '\u{00A0}' => b"&nbsp;",
                '"' if attribute => b"&quot;",
                '<' if !attribute => b"&lt;",
                '>' if !attribute => b"&gt;",
                _ => continue,
            };
            self.writer.write_all(text[start..pos].as_bytes())?;
            self.writer.write_all(escaped)?;
            start = pos + c.len_utf8();
        }
        self.writer.write_all(text[start..].as_bytes())
    }
}

/// Serialize `document` into `writer`
pub fn serialize_to<W: Write>(
    document: &Document,
    writer: W,
    options: SerializeOptions,
) -> io::Result<()> {
    HtmlSerializer::new(document, writer, options)
        .serialize()
        .map(drop)
}

/// Serialize `document` into a new string
pub fn serialize_to_string(document: &Document, options: SerializeOptions) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = serialize_to(document, &mut buffer, options);
    String::from_utf8_lossy(&buffer).into_owned()
}
