//! Arena-backed DOM used by the inliner
//!
//! Nodes live in a flat `Vec` and refer to each other through [`NodeId`]
//! indices. Node 0 is always the document root.

use html5ever::{LocalName, Namespace, QualName};

/// Namespace URL of HTML elements
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Attribute that controls inlining behavior on individual elements
pub const INLINE_CONTROL_ATTRIBUTE: &str = "data-css-inline";

/// Index of a node inside a [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Id of the document root node
    pub const DOCUMENT: NodeId = NodeId(0);

    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single element attribute in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, `prefix:local` for namespaced attributes
    pub name: String,
    /// Raw attribute value
    pub value: String,
}

/// How an element takes part in inlining, from its `data-css-inline` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineControl {
    /// No control attribute
    #[default]
    Default,
    /// `data-css-inline="ignore"`
    Ignore,
    /// `data-css-inline="keep"`
    Keep,
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Qualified tag name as produced by the tree builder
    pub name: QualName,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    /// Create a new HTML element with no attributes
    pub fn new(tag_name: &str) -> Self {
        Self::with_name(QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(tag_name),
        ))
    }

    /// Create an element from a full qualified name
    pub fn with_name(name: QualName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    /// Local tag name (e.g. `div`)
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// Whether the element lives in the HTML namespace
    pub fn is_html(&self) -> bool {
        &*self.name.ns == HTML_NAMESPACE
    }

    /// Check the tag name, ignoring ASCII case for HTML elements
    pub fn has_tag(&self, tag: &str) -> bool {
        if self.is_html() {
            self.local_name().eq_ignore_ascii_case(tag)
        } else {
            self.local_name() == tag
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| {
                if self.is_html() {
                    attr.name.eq_ignore_ascii_case(name)
                } else {
                    attr.name == name
                }
            })
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute value, keeping its position when it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Iterate over class names
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    /// Check for a class, case-sensitively
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Inline `style` attribute, if any
    pub fn style(&self) -> Option<&str> {
        self.get_attribute("style")
    }

    /// Value of the `data-css-inline` attribute
    pub fn inline_control(&self) -> InlineControl {
        match self.get_attribute(INLINE_CONTROL_ATTRIBUTE) {
            Some(value) if value.eq_ignore_ascii_case("ignore") => InlineControl::Ignore,
            Some(value) if value.eq_ignore_ascii_case("keep") => InlineControl::Keep,
            _ => InlineControl::Default,
        }
    }

    /// `<style>` element
    pub fn is_style(&self) -> bool {
        self.is_html() && self.has_tag("style")
    }

    /// `<link>` whose `rel` tokens contain `stylesheet`
    pub fn is_stylesheet_link(&self) -> bool {
        self.is_html()
            && self.has_tag("link")
            && self.get_attribute("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
    }
}

/// Node types in the DOM
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root
    Document,
    /// `<!DOCTYPE name>`
    Doctype {
        /// Doctype name
        name: String,
    },
    /// Element node (e.g., `<div>`)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
    /// `<?target data>`
    ProcessingInstruction {
        /// PI target
        target: String,
        /// PI content
        data: String,
    },
}

/// A node in the DOM arena
#[derive(Debug, Clone)]
pub struct Node {
    /// Node type and data
    pub data: NodeData,
    /// Parent back-reference
    pub parent: Option<NodeId>,
    /// Child nodes in order
    pub children: Vec<NodeId>,
    /// Synthesized by the tree builder in fragment mode
    pub scaffolding: bool,
}

impl Node {
    /// Create a detached node
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            scaffolding: false,
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable element data
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }
}

/// The DOM document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create an empty document with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::new(NodeData::Document));
        Self { nodes }
    }

    /// Number of nodes, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the root node exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Push a detached node and return its id
    pub fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    /// Get a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Element data of a node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data of a node
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Parent element for selector matching; scaffolding and the document are not elements
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let node = self.get(parent)?;
        (node.is_element() && !node.scaffolding).then_some(parent)
    }

    /// Element siblings of a node, in order, including the node itself
    pub fn element_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings = match self.parent(id) {
            Some(parent) => self.children(parent),
            None => &[],
        };
        siblings.iter().copied().filter(|&s| {
            self.get(s)
                .is_some_and(|n| n.is_element() && !n.scaffolding)
        })
    }

    /// Whether an element may be styled or matched
    pub fn is_matchable(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_element() && !n.scaffolding)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    /// Insert `child` right before `sibling`
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
        self.detach(child);
        let Some(parent) = self.parent(sibling) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            let pos = node
                .children
                .iter()
                .position(|&c| c == sibling)
                .unwrap_or(node.children.len());
            node.children.insert(pos, child);
        }
    }

    /// Remove a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.retain(|&c| c != id);
        }
    }

    /// Move all children of `from` to the end of `to`
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = match self.nodes.get_mut(from.0) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = Some(to);
            }
            if let Some(node) = self.nodes.get_mut(to.0) {
                node.children.push(child);
            }
        }
    }

    /// Mark a node as synthesized scaffolding
    pub fn set_scaffolding(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.scaffolding = true;
        }
    }

    /// Nodes reachable from the root, in document (pre-)order
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::DOCUMENT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Attached elements in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants()
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(Node::is_element))
    }

    /// Concatenated text of a node's direct text children
    pub fn text_content(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&c| match &self.get(c)?.data {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// First attached element with the given tag
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.elements()
            .find(|&id| self.element(id).is_some_and(|e| e.has_tag(tag)))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, tag: &str) -> NodeId {
        doc.push(NodeData::Element(ElementData::new(tag)))
    }

    #[test]
    fn test_document_root() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert!(matches!(
            doc.get(NodeId::DOCUMENT).unwrap().data,
            NodeData::Document
        ));
    }

    #[test]
    fn test_append_and_detach() {
        let mut doc = Document::new();
        let div = element(&mut doc, "div");
        let p = element(&mut doc, "p");
        doc.append(NodeId::DOCUMENT, div);
        doc.append(div, p);
        assert_eq!(doc.children(div), &[p]);
        assert_eq!(doc.parent(p), Some(div));

        doc.detach(p);
        assert!(doc.children(div).is_empty());
        assert_eq!(doc.parent(p), None);
    }

    #[test]
    fn test_insert_before() {
        let mut doc = Document::new();
        let ul = element(&mut doc, "ul");
        let a = element(&mut doc, "li");
        let b = element(&mut doc, "li");
        doc.append(NodeId::DOCUMENT, ul);
        doc.append(ul, b);
        doc.insert_before(b, a);
        assert_eq!(doc.children(ul), &[a, b]);
    }

    #[test]
    fn test_reparent_children() {
        let mut doc = Document::new();
        let from = element(&mut doc, "div");
        let to = element(&mut doc, "section");
        let child = element(&mut doc, "span");
        doc.append(NodeId::DOCUMENT, from);
        doc.append(NodeId::DOCUMENT, to);
        doc.append(from, child);
        doc.reparent_children(from, to);
        assert!(doc.children(from).is_empty());
        assert_eq!(doc.children(to), &[child]);
        assert_eq!(doc.parent(child), Some(to));
    }

    #[test]
    fn test_document_order() {
        let mut doc = Document::new();
        let html = element(&mut doc, "html");
        let head = element(&mut doc, "head");
        let body = element(&mut doc, "body");
        doc.append(NodeId::DOCUMENT, html);
        doc.append(html, head);
        doc.append(html, body);
        let order: Vec<_> = doc.elements().collect();
        assert_eq!(order, vec![html, head, body]);
    }

    #[test]
    fn test_attributes() {
        let mut data = ElementData::new("div");
        data.set_attribute("class", "a  b");
        data.set_attribute("ID", "main");
        data.set_attribute("class", "a b c");
        assert_eq!(data.attributes.len(), 2);
        assert_eq!(data.id(), Some("main"));
        assert_eq!(data.classes().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(data.has_class("b"));
        assert!(!data.has_class("B"));
    }

    #[test]
    fn test_inline_control() {
        let mut data = ElementData::new("style");
        assert_eq!(data.inline_control(), InlineControl::Default);
        data.set_attribute(INLINE_CONTROL_ATTRIBUTE, "ignore");
        assert_eq!(data.inline_control(), InlineControl::Ignore);
        data.set_attribute(INLINE_CONTROL_ATTRIBUTE, "keep");
        assert_eq!(data.inline_control(), InlineControl::Keep);
    }

    #[test]
    fn test_stylesheet_link() {
        let mut link = ElementData::new("link");
        link.set_attribute("rel", "alternate StyleSheet");
        assert!(link.is_stylesheet_link());
        link.set_attribute("rel", "icon");
        assert!(!link.is_stylesheet_link());
    }

    #[test]
    fn test_scaffolding_is_not_a_parent_element() {
        let mut doc = Document::new();
        let body = element(&mut doc, "body");
        let p = element(&mut doc, "p");
        doc.append(NodeId::DOCUMENT, body);
        doc.append(body, p);
        assert_eq!(doc.parent_element(p), Some(body));
        doc.set_scaffolding(body);
        assert_eq!(doc.parent_element(p), None);
        assert!(!doc.is_matchable(body));
    }
}
