use serde_json::{Map, Value};

use super::TreeWriter;
use crate::cursor::Namespace;
use crate::types::error::{EwsError, Result};

enum Frame {
    Object {
        name: String,
        map: Map<String, Value>,
        /// Entry of a collection, or the root: keeps its name as `__type`
        tagged: bool,
    },
    Array {
        name: String,
        entries: Vec<Value>,
    },
}

/// JSON request writer, mirroring what [`crate::cursor::JsonCursor`] reads
#[derive(Default)]
pub struct JsonTreeWriter {
    frames: Vec<Frame>,
    root: Option<Value>,
}

impl JsonTreeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_value(self) -> Result<Value> {
        if let Some(frame) = self.frames.last() {
            let name = match frame {
                Frame::Object { name, .. } | Frame::Array { name, .. } => name,
            };
            return Err(EwsError::InvalidArgument(format!("element {name} left open")));
        }
        self.root
            .ok_or_else(|| EwsError::InvalidArgument("nothing was written".to_string()))
    }

    pub fn into_string(self) -> Result<String> {
        let value = self.into_value()?;
        Ok(serde_json::to_string(&value)?)
    }

    fn current_object(&mut self) -> Result<&mut Map<String, Value>> {
        match self.frames.last_mut() {
            Some(Frame::Object { map, .. }) => Ok(map),
            _ => Err(EwsError::InvalidArgument(
                "attributes and text need an open element".to_string(),
            )),
        }
    }

    fn attach(&mut self, name: String, value: Value) {
        match self.frames.last_mut() {
            Some(Frame::Array { entries, .. }) => entries.push(value),
            Some(Frame::Object { map, .. }) => match map.get_mut(&name) {
                Some(Value::Array(existing)) => existing.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            },
            None => self.root = Some(value),
        }
    }
}

impl TreeWriter for JsonTreeWriter {
    fn start_element(&mut self, _namespace: Namespace, name: &str) -> Result<()> {
        let tagged = matches!(self.frames.last(), None | Some(Frame::Array { .. }));
        let mut map = Map::new();
        if tagged {
            map.insert("__type".to_string(), Value::String(name.to_string()));
        }
        self.frames.push(Frame::Object {
            name: name.to_string(),
            map,
            tagged,
        });
        Ok(())
    }

    fn start_collection(&mut self, _namespace: Namespace, name: &str) -> Result<()> {
        self.frames.push(Frame::Array {
            name: name.to_string(),
            entries: Vec::new(),
        });
        Ok(())
    }

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.current_object()?
            .insert(name.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let map = self.current_object()?;
        match map.get_mut("$text") {
            Some(Value::String(existing)) => existing.push_str(text),
            _ => {
                map.insert("$text".to_string(), Value::String(text.to_string()));
            }
        }
        Ok(())
    }

    fn end_element(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| EwsError::InvalidArgument("no open element to close".to_string()))?;
        let (name, value) = match frame {
            Frame::Array { name, entries } => (name, Value::Array(entries)),
            Frame::Object {
                name,
                mut map,
                tagged,
            } => {
                // a plain leaf collapses to its text
                if !tagged && map.len() == 1 && map.contains_key("$text") {
                    let text = map.remove("$text").unwrap_or_default();
                    (name, text)
                } else {
                    (name, Value::Object(map))
                }
            }
        };
        self.attach(name, value);
        Ok(())
    }
}
