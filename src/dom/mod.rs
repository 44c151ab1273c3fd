//! Document model: arena DOM, HTML parsing and serialization

pub mod html;
pub mod node;
pub mod serializer;

pub use html::{HtmlParser, ParseMode};
pub use node::{Attribute, Document, ElementData, InlineControl, Node, NodeData, NodeId};
pub use serializer::{HtmlSerializer, SerializeOptions, serialize_to, serialize_to_string};
