//! Object-notation cursor
//!
//! The JSON document is flattened once into the same node sequence the XML
//! cursor produces. Mapping rules:
//!
//! - `__type` is the type tag (`"Message:#Exchange"` reads as `Message`)
//! - `@name` keys are pure attributes
//! - `$text` is the element's own text content; an object carrying it is a
//!   leaf, so its other scalar keys are attributes only
//! - other scalar keys are both attributes and leaf child elements
//! - objects are nested elements, `null` values are absent
//! - arrays are collection elements whose entries are named by their type
//!   tag, or by the collection key when untagged

use serde_json::{Map, Value};

use super::{Encoding, Namespace, NodeKind, TreeCursor};
use crate::config;
use crate::types::error::{EwsError, Result};

const TYPE_KEY: &str = "__type";
const TEXT_KEY: &str = "$text";
const DEFAULT_ROOT: &str = "Envelope";

#[derive(Debug)]
struct JsonNode {
    kind: NodeKind,
    name: String,
    attributes: Vec<(String, String)>,
    type_tag: Option<String>,
    text: Option<String>,
    depth: usize,
}

/// Cursor over a JSON response
#[derive(Debug)]
pub struct JsonCursor {
    nodes: Vec<JsonNode>,
    /// Index of the current node, `None` before the first advance
    position: Option<usize>,
}

impl JsonCursor {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse with an explicit name for the (anonymous) root object
    pub fn from_str_with_root(root: &str, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::with_root_name(root, value)
    }

    /// Build from a parsed document, naming the root by its type tag
    pub fn from_value(value: Value) -> Result<Self> {
        let root = type_tag_of(&value).unwrap_or_else(|| DEFAULT_ROOT.to_string());
        Self::with_root_name(&root, value)
    }

    pub fn with_root_name(root: &str, value: Value) -> Result<Self> {
        let mut flattener = Flattener {
            nodes: Vec::new(),
            max_depth: config::get_config().max_depth,
        };
        flattener.element(root, &value, 1)?;
        Ok(Self {
            nodes: flattener.nodes,
            position: None,
        })
    }

    fn current(&self) -> Option<&JsonNode> {
        self.position.and_then(|i| self.nodes.get(i))
    }
}

fn type_tag_of(value: &Value) -> Option<String> {
    value.as_object().and_then(map_type_tag)
}

fn map_type_tag(map: &Map<String, Value>) -> Option<String> {
    let tag = map.get(TYPE_KEY)?.as_str()?;
    let short = tag.split(":#").next().unwrap_or(tag);
    Some(short.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

struct Flattener {
    nodes: Vec<JsonNode>,
    max_depth: usize,
}

impl Flattener {
    fn push(&mut self, kind: NodeKind, name: &str, depth: usize) -> &mut JsonNode {
        self.nodes.push(JsonNode {
            kind,
            name: name.to_string(),
            attributes: Vec::new(),
            type_tag: None,
            text: None,
            depth,
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    fn element(&mut self, name: &str, value: &Value, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(EwsError::DepthLimitExceeded(self.max_depth));
        }
        match value {
            Value::Null => {}
            Value::Object(map) => self.object(name, map, depth)?,
            Value::Array(entries) => {
                self.push(NodeKind::Start, name, depth);
                for entry in entries {
                    let entry_name = type_tag_of(entry).unwrap_or_else(|| name.to_string());
                    self.element(&entry_name, entry, depth + 1)?;
                }
                self.push(NodeKind::End, name, depth);
            }
            scalar => {
                self.push(NodeKind::Start, name, depth);
                if let Some(text) = scalar_text(scalar).filter(|t| !t.is_empty()) {
                    self.push(NodeKind::Text, "", depth).text = Some(text);
                }
                self.push(NodeKind::End, name, depth);
            }
        }
        Ok(())
    }

    fn object(&mut self, name: &str, map: &Map<String, Value>, depth: usize) -> Result<()> {
        let mut attributes = Vec::new();
        for (key, value) in map {
            if key == TYPE_KEY || key == TEXT_KEY {
                continue;
            }
            if let Some(text) = scalar_text(value) {
                let key = key.strip_prefix('@').unwrap_or(key);
                attributes.push((key.to_string(), text));
            }
        }

        let start = self.push(NodeKind::Start, name, depth);
        start.attributes = attributes;
        start.type_tag = map_type_tag(map);

        if let Some(text) = map.get(TEXT_KEY).and_then(scalar_text) {
            if !text.is_empty() {
                self.push(NodeKind::Text, "", depth).text = Some(text);
            }
        }

        let is_leaf = map.contains_key(TEXT_KEY);
        for (key, value) in map {
            if key == TYPE_KEY || key == TEXT_KEY || key.starts_with('@') {
                continue;
            }
            if is_leaf && scalar_text(value).is_some() {
                continue;
            }
            self.element(key, value, depth + 1)?;
        }

        self.push(NodeKind::End, name, depth);
        Ok(())
    }
}

impl TreeCursor for JsonCursor {
    fn advance(&mut self) -> Result<NodeKind> {
        let next = self.position.map_or(0, |i| i + 1);
        if next >= self.nodes.len() {
            self.position = Some(self.nodes.len());
            return Ok(NodeKind::Eof);
        }
        self.position = Some(next);
        Ok(self.nodes[next].kind)
    }

    fn node_kind(&self) -> NodeKind {
        match self.position {
            None => NodeKind::Document,
            Some(_) => self.current().map_or(NodeKind::Eof, |node| node.kind),
        }
    }

    fn local_name(&self) -> &str {
        match self.current() {
            Some(node) if matches!(node.kind, NodeKind::Start | NodeKind::End) => &node.name,
            _ => "",
        }
    }

    fn namespace(&self) -> Namespace {
        Namespace::Any
    }

    fn attributes(&self) -> &[(String, String)] {
        match self.current() {
            Some(node) if node.kind == NodeKind::Start => &node.attributes,
            _ => &[],
        }
    }

    fn type_tag(&self) -> Option<&str> {
        match self.current() {
            Some(node) if node.kind == NodeKind::Start => node.type_tag.as_deref(),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        self.current().and_then(|node| node.text.as_deref())
    }

    fn depth(&self) -> usize {
        self.current().map_or(0, |node| node.depth)
    }

    fn encoding(&self) -> Encoding {
        Encoding::Json
    }
}
