//! Markup cursor
//!
//! Wraps a namespace-aware quick-xml reader. Self-closing elements are
//! expanded into an element-start followed by its element-end, whitespace
//! between elements is dropped, and comments, declarations and processing
//! instructions are never surfaced.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::trace;

use super::{Encoding, Namespace, NodeKind, TreeCursor};
use crate::config;
use crate::types::error::{EwsError, Result};

/// Element-start captured as owned data
struct OpenedElement {
    name: String,
    namespace: Namespace,
    attributes: Vec<(String, String)>,
    type_tag: Option<String>,
}

/// One raw step of the underlying reader, detached from its buffers
enum Step {
    Start(OpenedElement),
    End,
    Text(String),
    Eof,
    Ignored,
}

/// Cursor over an XML response
pub struct XmlCursor<R> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    kind: NodeKind,
    attributes: Vec<(String, String)>,
    type_tag: Option<String>,
    text: Option<String>,
    /// Open elements, innermost last
    stack: Vec<(String, Namespace)>,
    /// The current node is an element-end whose frame is still on the stack
    pop_pending: bool,
    max_depth: usize,
}

impl<'a> XmlCursor<&'a [u8]> {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &'a str) -> Self {
        Self::from_bytes(xml.as_bytes())
    }

    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::from_reader(bytes)
    }
}

impl<R: BufRead> XmlCursor<R> {
    /// Create a cursor over a buffered byte source
    pub fn from_reader(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        let reader_config = reader.config_mut();
        reader_config.trim_text(true);
        reader_config.expand_empty_elements = true;

        Self {
            reader,
            buf: Vec::new(),
            kind: NodeKind::Document,
            attributes: Vec::new(),
            type_tag: None,
            text: None,
            stack: Vec::new(),
            pop_pending: false,
            max_depth: config::get_config().max_depth,
        }
    }

    /// Override the nesting limit taken from the decoder configuration
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn read_step(&mut self) -> Result<Step> {
        self.buf.clear();
        let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Namespace::from_uri(ns.as_ref()),
            ResolveResult::Unbound => Namespace::None,
            ResolveResult::Unknown(_) => Namespace::Foreign,
        };

        let step = match event {
            Event::Start(start) => Step::Start(open_element(&self.reader, namespace, &start)?),
            Event::End(_) => Step::End,
            Event::Text(text) => Step::Text(
                text.unescape()
                    .map_err(|e| EwsError::Syntax(e.to_string()))?
                    .into_owned(),
            ),
            Event::CData(cdata) => Step::Text(String::from_utf8_lossy(&cdata).into_owned()),
            Event::Eof => Step::Eof,
            // Empty is expanded by the reader configuration
            _ => Step::Ignored,
        };
        Ok(step)
    }
}

const SCHEMA_INSTANCE_NS: &[u8] = b"http://www.w3.org/2001/XMLSchema-instance";

fn open_element<R>(
    reader: &NsReader<R>,
    namespace: Namespace,
    start: &BytesStart,
) -> Result<OpenedElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    let mut type_tag = None;

    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| EwsError::Syntax(e.to_string()))?
            .into_owned();

        // xsi:type="t:Message" names the concrete type of a tagged union
        let schema_instance = matches!(
            reader.resolve_attribute(attr.key).0,
            ResolveResult::Bound(ns) if ns.as_ref() == SCHEMA_INSTANCE_NS
        );
        if key == "type" && schema_instance {
            let tag = value.rsplit(':').next().unwrap_or_default().to_string();
            type_tag = Some(tag);
            continue;
        }
        attributes.push((key, value));
    }

    Ok(OpenedElement {
        name,
        namespace,
        attributes,
        type_tag,
    })
}

impl<R: BufRead> TreeCursor for XmlCursor<R> {
    fn advance(&mut self) -> Result<NodeKind> {
        if self.pop_pending {
            self.stack.pop();
            self.pop_pending = false;
        }
        if self.kind == NodeKind::Eof {
            return Ok(NodeKind::Eof);
        }
        self.attributes.clear();
        self.type_tag = None;
        self.text = None;

        loop {
            match self.read_step()? {
                Step::Start(element) => {
                    if self.stack.len() >= self.max_depth {
                        return Err(EwsError::DepthLimitExceeded(self.max_depth));
                    }
                    trace!("xml start <{}>", element.name);
                    self.stack.push((element.name, element.namespace));
                    self.attributes = element.attributes;
                    self.type_tag = element.type_tag;
                    self.kind = NodeKind::Start;
                }
                Step::End => {
                    if self.stack.is_empty() {
                        return Err(EwsError::UnexpectedNode(
                            "element-end without element-start".to_string(),
                        ));
                    }
                    self.pop_pending = true;
                    self.kind = NodeKind::End;
                }
                Step::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    self.text = Some(text);
                    self.kind = NodeKind::Text;
                }
                Step::Eof => {
                    if let Some((name, _)) = self.stack.last() {
                        return Err(EwsError::PrematureEof(name.clone()));
                    }
                    self.kind = NodeKind::Eof;
                }
                Step::Ignored => continue,
            }
            return Ok(self.kind);
        }
    }

    fn node_kind(&self) -> NodeKind {
        self.kind
    }

    fn local_name(&self) -> &str {
        match self.kind {
            NodeKind::Start | NodeKind::End => self
                .stack
                .last()
                .map(|(name, _)| name.as_str())
                .unwrap_or_default(),
            _ => "",
        }
    }

    fn namespace(&self) -> Namespace {
        match self.kind {
            NodeKind::Start | NodeKind::End => self
                .stack
                .last()
                .map(|(_, ns)| *ns)
                .unwrap_or(Namespace::None),
            _ => Namespace::None,
        }
    }

    fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn encoding(&self) -> Encoding {
        Encoding::Xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::TreeCursorExt;

    const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- response -->
<m:Root xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
        xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <t:Item xsi:type="t:Message" Size="12"/>
  <t:Subject>Fish &amp; chips</t:Subject>
  <t:Note><![CDATA[<raw>]]></t:Note>
  <Plain>x</Plain>
</m:Root>"#;

    #[test]
    fn test_namespaces_are_resolved() {
        let mut cursor = XmlCursor::from_str(DOC);
        cursor.require_start_of(Namespace::Messages, "Root").unwrap();
        assert_eq!(cursor.depth(), 1);
        assert!(cursor.attributes().is_empty());

        cursor.require_start_of(Namespace::Types, "Item").unwrap();
        assert!(!cursor.is_start_of(Namespace::Messages, "Item"));
        assert_eq!(cursor.depth(), 2);
    }

    #[test]
    fn test_empty_element_is_expanded() {
        let mut cursor = XmlCursor::from_str(DOC);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert_eq!(cursor.type_tag(), Some("Message"));
        assert_eq!(cursor.discriminator(), Some("Message"));
        assert_eq!(cursor.read_attribute("Size"), Some("12"));
        assert_eq!(cursor.advance().unwrap(), NodeKind::End);
        assert!(cursor.is_end_of(Namespace::Types, "Item"));
        assert_eq!(cursor.depth(), 2);
    }

    #[test]
    fn test_text_unescape_and_cdata() {
        let mut cursor = XmlCursor::from_str(DOC);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        cursor.skip_subtree().unwrap();
        let subject: String = cursor.read_element_value(Namespace::Types, "Subject").unwrap();
        assert_eq!(subject, "Fish & chips");
        let note: String = cursor.read_element_value(Namespace::Types, "Note").unwrap();
        assert_eq!(note, "<raw>");
        cursor.require_start_of(Namespace::None, "Plain").unwrap();
    }

    #[test]
    fn test_type_attribute_outside_schema_instance_is_plain() {
        let xml = r#"<t:Message xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types"
            xmlns:x="urn:example:other" x:type="Bogus"/>"#;
        let mut cursor = XmlCursor::from_str(xml);
        cursor.advance().unwrap();
        assert_eq!(cursor.type_tag(), None);
        assert_eq!(cursor.discriminator(), Some("Message"));
        assert_eq!(cursor.read_attribute("type"), Some("Bogus"));
    }

    #[test]
    fn test_premature_eof() {
        let mut cursor = XmlCursor::from_str("<a><b>text</b>");
        cursor.advance().unwrap();
        let err = cursor.skip_subtree().unwrap_err();
        assert!(matches!(err, EwsError::PrematureEof(_) | EwsError::Syntax(_)));
    }

    #[test]
    fn test_mismatched_end_is_a_syntax_error() {
        let mut cursor = XmlCursor::from_str("<a><b></a>");
        cursor.advance().unwrap();
        let err = cursor.skip_subtree().unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_depth_limit() {
        let mut cursor = XmlCursor::from_str("<a><b><c/></b></a>").with_max_depth(2);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert!(matches!(
            cursor.advance(),
            Err(EwsError::DepthLimitExceeded(2))
        ));
    }

    #[test]
    fn test_buffered_reader_source() {
        let source = std::io::BufReader::new("<a><b>1</b></a>".as_bytes());
        let mut cursor = XmlCursor::from_reader(source);
        cursor.advance().unwrap();
        let value: u8 = cursor.read_element_value(Namespace::Any, "b").unwrap();
        assert_eq!(value, 1);
        cursor.require_end_of(Namespace::Any, "a").unwrap();
        assert_eq!(cursor.advance().unwrap(), NodeKind::Eof);
    }
}
