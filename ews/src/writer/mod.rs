//! Outbound request fragments
//!
//! Only request parameters (paging views, sync requests) are written; domain
//! objects are never serialized back. The same calls produce XML or JSON:
//!
//! - `xml`: prefixed elements (`t:`, `m:`), attributes on the element-start
//! - `json`: nested objects, attributes as plain keys, collections as arrays
//!   whose entries carry their element name as `__type`

pub mod json;
pub mod xml;

pub use json::JsonTreeWriter;
pub use xml::XmlTreeWriter;

use crate::cursor::Namespace;
use crate::types::error::Result;

/// Encoding-agnostic writer contract
pub trait TreeWriter {
    fn start_element(&mut self, namespace: Namespace, name: &str) -> Result<()>;

    /// Start an element whose children form an ordered list
    fn start_collection(&mut self, namespace: Namespace, name: &str) -> Result<()>;

    /// Add an attribute to the element just started
    fn write_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    fn write_text(&mut self, text: &str) -> Result<()>;

    /// Close the innermost open element or collection
    fn end_element(&mut self) -> Result<()>;

    fn write_element_value(&mut self, namespace: Namespace, name: &str, value: &str) -> Result<()> {
        self.start_element(namespace, name)?;
        self.write_text(value)?;
        self.end_element()
    }
}
