//! HTML5 parser implementation using html5ever

use super::node::{Attribute, Document, ElementData, HTML_NAMESPACE, NodeData, NodeId};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElemName, ElementFlags, QuirksMode};
use html5ever::{LocalName, Namespace, QualName, parse_document, parse_fragment};
use markup5ever::interface::tree_builder::{NodeOrText, TreeSink};
use std::borrow::Cow;
use std::cell::RefCell;

/// How the input markup is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// A complete document, implicit `html/head/body` included in the output
    Document,
    /// A fragment parsed in body context; the synthesized `html` root is scaffolding only
    Fragment,
}

/// Owned element name handed back to the tree builder
#[derive(Debug, Clone)]
pub struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// DOM sink that builds our arena Document
struct DomSink {
    document: RefCell<Document>,
}

impl DomSink {
    fn new(capacity: usize) -> Self {
        Self {
            document: RefCell::new(Document::with_capacity(capacity)),
        }
    }

    fn convert_attributes(attrs: Vec<markup5ever::Attribute>) -> Vec<Attribute> {
        attrs
            .into_iter()
            .map(|attr| Attribute {
                name: attribute_name(&attr.name),
                value: attr.value.to_string(),
            })
            .collect()
    }

    /// Resolve a node-or-text into a node id, merging text into `previous` when it is a text node
    fn node_or_text(
        document: &mut Document,
        child: NodeOrText<NodeId>,
        previous: Option<NodeId>,
    ) -> Option<NodeId> {
        match child {
            NodeOrText::AppendNode(node) => Some(node),
            NodeOrText::AppendText(text) => {
                if let Some(prev) = previous {
                    if let Some(NodeData::Text(existing)) =
                        document.get_mut(prev).map(|n| &mut n.data)
                    {
                        existing.push_str(&text);
                        return None;
                    }
                }
                Some(document.push(NodeData::Text(text.to_string())))
            }
        }
    }
}

fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

impl TreeSink for DomSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        log::trace!("HTML parse error: {msg}");
    }

    fn get_document(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    fn elem_name<'a>(&'a self, target: &'a NodeId) -> OwnedElemName {
        let document = self.document.borrow();
        match document.element(*target) {
            Some(element) => OwnedElemName(element.name.clone()),
            None => OwnedElemName(QualName::new(
                None,
                Namespace::from(HTML_NAMESPACE),
                LocalName::from(""),
            )),
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<markup5ever::Attribute>,
        _flags: ElementFlags,
    ) -> NodeId {
        let mut element = ElementData::with_name(name);
        element.attributes = Self::convert_attributes(attrs);
        self.document.borrow_mut().push(NodeData::Element(element))
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.document
            .borrow_mut()
            .push(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> NodeId {
        self.document
            .borrow_mut()
            .push(NodeData::ProcessingInstruction {
                target: target.to_string(),
                data: data.to_string(),
            })
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        let mut document = self.document.borrow_mut();
        let previous = document.children(*parent).last().copied();
        if let Some(node) = Self::node_or_text(&mut document, child, previous) {
            document.append(*parent, node);
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &NodeId,
        prev_element: &NodeId,
        child: NodeOrText<NodeId>,
    ) {
        let has_parent = self.document.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut document = self.document.borrow_mut();
        let doctype = document.push(NodeData::Doctype {
            name: name.to_string(),
        });
        document.append(NodeId::DOCUMENT, doctype);
    }

    fn get_template_contents(&self, target: &NodeId) -> NodeId {
        *target
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &NodeId, new_node: NodeOrText<NodeId>) {
        let mut document = self.document.borrow_mut();
        let previous = document.parent(*sibling).and_then(|parent| {
            let siblings = document.children(parent);
            let pos = siblings.iter().position(|s| s == sibling)?;
            pos.checked_sub(1).map(|p| siblings[p])
        });
        if let Some(node) = Self::node_or_text(&mut document, new_node, previous) {
            document.insert_before(*sibling, node);
        }
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<markup5ever::Attribute>) {
        let mut document = self.document.borrow_mut();
        if let Some(element) = document.element_mut(*target) {
            for attr in Self::convert_attributes(attrs) {
                if !element.attributes.iter().any(|a| a.name == attr.name) {
                    element.attributes.push(attr);
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        self.document.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        self.document
            .borrow_mut()
            .reparent_children(*node, *new_parent);
    }
}

/// HTML5 parser using html5ever
#[derive(Debug, Clone)]
pub struct HtmlParser {
    preallocate_node_capacity: usize,
}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self::with_capacity(32)
    }

    /// Create a parser that preallocates room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            preallocate_node_capacity: capacity,
        }
    }

    /// Parse HTML content into a DOM document
    pub fn parse(&self, content: &str, mode: ParseMode) -> Document {
        let sink = DomSink::new(self.preallocate_node_capacity);
        let input = StrTendril::from(content);
        match mode {
            ParseMode::Document => parse_document(sink, Default::default()).one(input),
            ParseMode::Fragment => {
                // Empty context element; it stays detached from the tree
                let context = QualName::new(
                    None,
                    Namespace::from(HTML_NAMESPACE),
                    LocalName::from(""),
                );
                let mut document =
                    parse_fragment(sink, Default::default(), context, Vec::new(), false)
                        .one(input);
                mark_scaffolding(&mut document);
                document
            }
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Flag the `html` root the fragment tree builder puts the fragment under
fn mark_scaffolding(document: &mut Document) {
    let roots: Vec<NodeId> = document
        .children(NodeId::DOCUMENT)
        .iter()
        .copied()
        .filter(|&id| document.element(id).is_some_and(|e| e.has_tag("html")))
        .collect();
    for root in roots {
        document.set_scaffolding(root);
    }
}
