//! Pull-style cursors over a response document
//!
//! A response arrives either as XML or as JSON. Both are exposed through the
//! same [`TreeCursor`] contract so that every decoder above this module is
//! written once:
//!
//! - `xml`: namespace-aware cursor over a markup stream
//! - `json`: cursor over an object-notation tree, simulating attributes as
//!   sibling fields and elements as nested objects/arrays
//!
//! Position model: the cursor always sits on one node. Depth counts the open
//! elements, so an element-start and its matching element-end report the same
//! depth. Every composite decoder that consumes an element-start must leave
//! the cursor on the matching element-end before returning.

mod leaf;
pub mod json;
pub mod xml;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use leaf::FromLeaf;
pub(crate) use leaf::from_leaf_via_from_str;
pub use json::JsonCursor;
pub use xml::XmlCursor;

use crate::types::error::{EwsError, Result};

/// Wire encoding of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Xml,
    Json,
}

/// Kind of the node the cursor is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Nothing read yet
    Document,
    Start,
    End,
    Text,
    Eof,
}

/// XML namespaces of the protocol
///
/// Used as a hint when matching element names. `Any` matches everything and
/// is also what the JSON cursor reports, since object notation carries no
/// namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Types,
    Messages,
    Errors,
    Soap,
    /// Element without namespace
    None,
    /// Element bound to a namespace outside of the protocol
    Foreign,
    Any,
}

impl Namespace {
    pub fn uri(&self) -> Option<&'static str> {
        match self {
            Self::Types => Some("http://schemas.microsoft.com/exchange/services/2006/types"),
            Self::Messages => Some("http://schemas.microsoft.com/exchange/services/2006/messages"),
            Self::Errors => Some("http://schemas.microsoft.com/exchange/services/2006/errors"),
            Self::Soap => Some("http://schemas.xmlsoap.org/soap/envelope/"),
            Self::None | Self::Foreign | Self::Any => None,
        }
    }

    /// Conventional prefix used when writing XML
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Self::Types => Some("t"),
            Self::Messages => Some("m"),
            Self::Errors => Some("e"),
            Self::Soap => Some("soap"),
            Self::None | Self::Foreign | Self::Any => None,
        }
    }

    pub fn from_uri(uri: &[u8]) -> Self {
        [Self::Types, Self::Messages, Self::Errors, Self::Soap]
            .into_iter()
            .find(|ns| ns.uri().map(str::as_bytes) == Some(uri))
            .unwrap_or(Self::Foreign)
    }

    /// Whether a node in namespace `self` satisfies the hint
    pub fn matches(&self, hint: Namespace) -> bool {
        hint == Namespace::Any || *self == Namespace::Any || *self == hint
    }
}

/// Encoding-agnostic navigation contract
///
/// Implementations only provide the primitive accessors; navigation helpers
/// (`skip_subtree`, `next_child`, `require_*`) are shared.
pub trait TreeCursor {
    /// Move to the next node and return its kind
    fn advance(&mut self) -> Result<NodeKind>;

    fn node_kind(&self) -> NodeKind;

    /// Local name of the current element-start or element-end
    fn local_name(&self) -> &str;

    fn namespace(&self) -> Namespace;

    /// Attributes of the current element-start, in document order
    fn attributes(&self) -> &[(String, String)];

    /// Explicit type tag of the current element-start (`xsi:type`, `__type`)
    fn type_tag(&self) -> Option<&str>;

    /// Content of the current text node
    fn text(&self) -> Option<&str>;

    /// Number of open elements, counting the current one
    fn depth(&self) -> usize;

    fn encoding(&self) -> Encoding;

    fn is_start(&self) -> bool {
        self.node_kind() == NodeKind::Start
    }

    fn is_start_of(&self, namespace: Namespace, name: &str) -> bool {
        self.node_kind() == NodeKind::Start
            && self.local_name() == name
            && self.namespace().matches(namespace)
    }

    fn is_end_of(&self, namespace: Namespace, name: &str) -> bool {
        self.node_kind() == NodeKind::End
            && self.local_name() == name
            && self.namespace().matches(namespace)
    }

    fn read_attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Token used to pick a concrete type for the current element
    ///
    /// The explicit type tag wins over the element name.
    fn discriminator(&self) -> Option<&str> {
        if !self.is_start() {
            return None;
        }
        self.type_tag().or(Some(self.local_name()))
    }

    /// Human-readable description of the current node, for diagnostics
    fn describe(&self) -> String {
        match self.node_kind() {
            NodeKind::Document => "start of document".to_string(),
            NodeKind::Start => format!("<{}>", self.local_name()),
            NodeKind::End => format!("</{}>", self.local_name()),
            NodeKind::Text => "text".to_string(),
            NodeKind::Eof => "end of document".to_string(),
        }
    }

    /// Skip the element the cursor is positioned on
    ///
    /// On an element-start, moves to its matching element-end. On any other
    /// node this is a no-op.
    fn skip_subtree(&mut self) -> Result<()> {
        if self.node_kind() != NodeKind::Start {
            return Ok(());
        }
        let depth = self.depth();
        let name = self.local_name().to_string();
        loop {
            match self.advance()? {
                NodeKind::End if self.depth() == depth => return Ok(()),
                NodeKind::Eof => return Err(EwsError::PrematureEof(name)),
                _ => {}
            }
        }
    }

    /// Move to the next child element-start of the element opened at `depth`
    ///
    /// Returns `false` once the cursor reaches the element-end closing that
    /// element. Stray text between children is ignored. Reaching a deeper
    /// node means a previous child was left unbalanced.
    fn next_child(&mut self, depth: usize) -> Result<bool> {
        loop {
            match self.advance()? {
                NodeKind::Start if self.depth() == depth + 1 => return Ok(true),
                NodeKind::End if self.depth() == depth => return Ok(false),
                NodeKind::Text => continue,
                NodeKind::Eof => {
                    return Err(EwsError::PrematureEof(format!("element at depth {depth}")))
                }
                _ => {
                    return Err(EwsError::desync(
                        format!("child of element at depth {depth}"),
                        self.describe(),
                    ))
                }
            }
        }
    }

    /// Assert the current node is the given element-start, without moving
    fn ensure_start_of(&self, namespace: Namespace, name: &str) -> Result<()> {
        if self.is_start_of(namespace, name) {
            Ok(())
        } else {
            Err(EwsError::desync(format!("<{name}>"), self.describe()))
        }
    }

    /// Assert the current node is the given element-end, without moving
    fn ensure_end_of(&self, namespace: Namespace, name: &str) -> Result<()> {
        if self.is_end_of(namespace, name) {
            Ok(())
        } else {
            Err(EwsError::desync(format!("</{name}>"), self.describe()))
        }
    }

    /// Advance, then assert the new node is the given element-start
    fn require_start_of(&mut self, namespace: Namespace, name: &str) -> Result<()> {
        self.advance()?;
        self.ensure_start_of(namespace, name)
    }

    /// Advance, then assert the new node is the given element-end
    fn require_end_of(&mut self, namespace: Namespace, name: &str) -> Result<()> {
        self.advance()?;
        self.ensure_end_of(namespace, name)
    }

    /// Like `require_end_of`, but accepts a cursor already on the element-end
    fn read_end_if_necessary(&mut self, namespace: Namespace, name: &str) -> Result<()> {
        if self.is_end_of(namespace, name) {
            return Ok(());
        }
        self.require_end_of(namespace, name)
    }
}

impl fmt::Debug for dyn TreeCursor + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCursor")
            .field("encoding", &self.encoding())
            .field("node", &self.describe())
            .field("depth", &self.depth())
            .finish()
    }
}

/// Typed reads on top of [`TreeCursor`]
///
/// Kept apart from the main trait so that `TreeCursor` stays object safe.
pub trait TreeCursorExt: TreeCursor {
    /// Read the text content of the leaf element the cursor is positioned on
    ///
    /// Leaves the cursor on the matching element-end. An element without
    /// text reads as the empty string.
    fn read_leaf_text(&mut self) -> Result<String> {
        if !self.is_start() {
            return Err(EwsError::UnexpectedNode(format!(
                "leaf element expected, found {}",
                self.describe()
            )));
        }
        let depth = self.depth();
        let name = self.local_name().to_string();
        let mut value = String::new();
        loop {
            match self.advance()? {
                NodeKind::Text => value.push_str(self.text().unwrap_or_default()),
                NodeKind::End if self.depth() == depth => return Ok(value),
                NodeKind::Eof => return Err(EwsError::PrematureEof(name)),
                _ => {
                    return Err(EwsError::UnexpectedNode(format!(
                        "{} inside leaf element <{name}>",
                        self.describe()
                    )))
                }
            }
        }
    }

    /// Parse the current leaf element into `T`
    fn read_leaf_value<T: FromLeaf>(&mut self) -> Result<T> {
        let name = self.local_name().to_string();
        let text = self.read_leaf_text()?;
        T::from_leaf(&text).ok_or_else(|| EwsError::malformed(name, text, T::EXPECTED))
    }

    /// Advance to the given element-start and parse its leaf value
    fn read_element_value<T: FromLeaf>(&mut self, namespace: Namespace, name: &str) -> Result<T> {
        self.require_start_of(namespace, name)?;
        self.read_leaf_value()
    }

    /// Parse an attribute of the current element-start, if present
    fn read_attribute_as<T: FromLeaf>(&self, name: &str) -> Result<Option<T>> {
        match self.read_attribute(name) {
            None => Ok(None),
            Some(raw) => T::from_leaf(raw).map(Some).ok_or_else(|| {
                EwsError::malformed(format!("{}@{name}", self.local_name()), raw, T::EXPECTED)
            }),
        }
    }

    /// Read every child of the current element as a leaf value
    ///
    /// Used for simple lists (`<Categories><String>a</String>...`) whose
    /// entry names are irrelevant.
    fn read_leaf_list<T: FromLeaf>(&mut self) -> Result<Vec<T>> {
        let depth = self.depth();
        let mut values = Vec::new();
        while self.next_child(depth)? {
            values.push(self.read_leaf_value()?);
        }
        Ok(values)
    }
}

impl<C: TreeCursor + ?Sized> TreeCursorExt for C {}

/// Open a cursor over a complete response body
pub fn open_cursor(encoding: Encoding, bytes: &[u8]) -> Result<Box<dyn TreeCursor + '_>> {
    match encoding {
        Encoding::Xml => Ok(Box::new(XmlCursor::from_bytes(bytes))),
        Encoding::Json => Ok(Box::new(JsonCursor::from_slice(bytes)?)),
    }
}
