use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::TreeWriter;
use crate::cursor::Namespace;
use crate::types::error::{EwsError, Result};

/// XML request writer
///
/// The element-start is buffered until its first child or text so that
/// attributes can still be added, and childless elements are written
/// self-closing.
pub struct XmlTreeWriter {
    writer: Writer<Vec<u8>>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
}

impl Default for XmlTreeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTreeWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            pending: None,
            open: Vec::new(),
        }
    }

    /// Declare the protocol prefixes on the element just started
    pub fn declare_namespaces(&mut self) -> Result<()> {
        for namespace in [Namespace::Messages, Namespace::Types] {
            if let (Some(prefix), Some(uri)) = (namespace.prefix(), namespace.uri()) {
                self.write_attribute(&format!("xmlns:{prefix}"), uri)?;
            }
        }
        Ok(())
    }

    pub fn into_string(mut self) -> Result<String> {
        self.flush_pending()?;
        if let Some(name) = self.open.last() {
            return Err(EwsError::InvalidArgument(format!("element <{name}> left open")));
        }
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| EwsError::InvalidArgument(e.to_string()))
    }

    fn write(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| EwsError::Io(e.to_string()))
    }

    fn flush_pending(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(start) => self.write(Event::Start(start)),
            None => Ok(()),
        }
    }
}

fn qualify(namespace: Namespace, name: &str) -> String {
    match namespace.prefix() {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

impl TreeWriter for XmlTreeWriter {
    fn start_element(&mut self, namespace: Namespace, name: &str) -> Result<()> {
        self.flush_pending()?;
        let qualified = qualify(namespace, name);
        self.pending = Some(BytesStart::new(qualified.clone()));
        self.open.push(qualified);
        Ok(())
    }

    fn start_collection(&mut self, namespace: Namespace, name: &str) -> Result<()> {
        self.start_element(namespace, name)
    }

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let start = self.pending.as_mut().ok_or_else(|| {
            EwsError::InvalidArgument(format!("attribute {name} written after element content"))
        })?;
        start.push_attribute((name, value));
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.write(Event::Text(BytesText::new(text)))
    }

    fn end_element(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| EwsError::InvalidArgument("no open element to close".to_string()))?;
        match self.pending.take() {
            Some(start) => self.write(Event::Empty(start)),
            None => self.write(Event::End(BytesEnd::new(name))),
        }
    }
}
