#![allow(dead_code)]

use ews::cursor::{JsonCursor, XmlCursor};
use ews::TreeCursor;

pub const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";

/// XML cursor moved onto the root element-start
pub fn xml(document: &str) -> Box<dyn TreeCursor + '_> {
    let mut cursor = XmlCursor::from_str(document);
    cursor.advance().expect("document has a root element");
    Box::new(cursor)
}

/// JSON cursor moved onto the root element-start
pub fn json(document: &str) -> Box<dyn TreeCursor + 'static> {
    let mut cursor = JsonCursor::from_str(document).expect("valid JSON fixture");
    cursor.advance().expect("document has a root element");
    Box::new(cursor)
}

/// The same response in both encodings, each with a label for assertions
pub fn both<'a>(xml_document: &'a str, json_document: &str) -> Vec<(&'static str, Box<dyn TreeCursor + 'a>)> {
    let xml_cursor: Box<dyn TreeCursor + 'a> = xml(xml_document);
    let json_cursor: Box<dyn TreeCursor + 'a> = json(json_document);
    vec![("xml", xml_cursor), ("json", json_cursor)]
}

/// Both encodings, positioned before the first node (for envelope reads)
pub fn documents<'a>(xml_document: &'a str, json_document: &str) -> Vec<(&'static str, Box<dyn TreeCursor + 'a>)> {
    let xml_cursor: Box<dyn TreeCursor + 'a> = Box::new(XmlCursor::from_str(xml_document));
    let json_cursor: Box<dyn TreeCursor + 'a> =
        Box::new(JsonCursor::from_str(json_document).expect("valid JSON fixture"));
    vec![("xml", xml_cursor), ("json", json_cursor)]
}

/// Wrap elements into a response message carrying the namespaces
pub fn xml_response(element: &str, class: &str, code: &str, inner: &str) -> String {
    format!(
        r#"<m:{element} xmlns:m="{MESSAGES_NS}" xmlns:t="{TYPES_NS}" ResponseClass="{class}"><m:ResponseCode>{code}</m:ResponseCode>{inner}</m:{element}>"#
    )
}
