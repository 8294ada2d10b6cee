pub mod error;

use std::fmt;

use crate::cursor::{Namespace, TreeCursor};
use crate::writer::TreeWriter;
use error::{EwsError, Result};

/// Reference to an object property, as found in sort orders, groupings and
/// error payloads
///
/// Kept opaque: the decoder never interprets the referenced property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// `FieldURI="item:Subject"`
    Field(String),
    /// `FieldURI="contacts:EmailAddress" FieldIndex="EmailAddress1"`
    Indexed { field: String, index: String },
    /// Extended (MAPI) property, attributes in document order
    Extended(Vec<(String, String)>),
}

const FIELD_URI: &str = "FieldURI";
const INDEXED_FIELD_URI: &str = "IndexedFieldURI";
const EXTENDED_FIELD_URI: &str = "ExtendedFieldURI";

impl PropertyPath {
    pub fn field(uri: impl Into<String>) -> Self {
        PropertyPath::Field(uri.into())
    }

    pub fn indexed(field: impl Into<String>, index: impl Into<String>) -> Self {
        PropertyPath::Indexed {
            field: field.into(),
            index: index.into(),
        }
    }

    pub fn element_name(&self) -> &'static str {
        match self {
            PropertyPath::Field(_) => FIELD_URI,
            PropertyPath::Indexed { .. } => INDEXED_FIELD_URI,
            PropertyPath::Extended(_) => EXTENDED_FIELD_URI,
        }
    }

    pub fn is_path_element(name: &str) -> bool {
        matches!(name, FIELD_URI | INDEXED_FIELD_URI | EXTENDED_FIELD_URI)
    }

    /// Read the property reference the cursor is positioned on
    ///
    /// Returns `None`, without moving, when the current element is not a
    /// property reference. Otherwise leaves the cursor on its element-end.
    pub fn read(cursor: &mut dyn TreeCursor) -> Result<Option<Self>> {
        if !cursor.is_start() {
            return Ok(None);
        }
        let name = cursor.local_name().to_string();
        let path = match name.as_str() {
            FIELD_URI => PropertyPath::Field(required_attribute(&*cursor, "FieldURI")?),
            INDEXED_FIELD_URI => PropertyPath::Indexed {
                field: required_attribute(&*cursor, "FieldURI")?,
                index: required_attribute(&*cursor, "FieldIndex")?,
            },
            EXTENDED_FIELD_URI => PropertyPath::Extended(cursor.attributes().to_vec()),
            _ => return Ok(None),
        };
        cursor.skip_subtree()?;
        Ok(Some(path))
    }

    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        writer.start_element(Namespace::Types, self.element_name())?;
        match self {
            PropertyPath::Field(uri) => writer.write_attribute("FieldURI", uri)?,
            PropertyPath::Indexed { field, index } => {
                writer.write_attribute("FieldURI", field)?;
                writer.write_attribute("FieldIndex", index)?;
            }
            PropertyPath::Extended(attributes) => {
                for (key, value) in attributes {
                    writer.write_attribute(key, value)?;
                }
            }
        }
        writer.end_element()
    }
}

fn required_attribute(cursor: &dyn TreeCursor, attribute: &'static str) -> Result<String> {
    cursor
        .read_attribute(attribute)
        .map(str::to_string)
        .ok_or_else(|| EwsError::malformed(cursor.local_name(), "", attribute))
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Field(uri) => write!(f, "{uri}"),
            PropertyPath::Indexed { field, index } => write!(f, "{field}[{index}]"),
            PropertyPath::Extended(attributes) => {
                let parts: Vec<String> = attributes
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                write!(f, "extended({})", parts.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{JsonCursor, XmlCursor};
    use crate::writer::XmlTreeWriter;

    #[test]
    fn test_read_each_form() {
        let xml = r#"<Paths>
            <FieldURI FieldURI="item:Subject"/>
            <IndexedFieldURI FieldURI="contacts:EmailAddress" FieldIndex="EmailAddress1"/>
            <ExtendedFieldURI PropertyTag="0x1000" PropertyType="String"/>
            <Other/>
        </Paths>"#;
        let mut cursor = XmlCursor::from_str(xml);
        cursor.advance().unwrap();
        let depth = cursor.depth();
        let mut paths = Vec::new();
        while cursor.next_child(depth).unwrap() {
            match PropertyPath::read(&mut cursor).unwrap() {
                Some(path) => paths.push(path),
                None => cursor.skip_subtree().unwrap(),
            }
        }
        assert_eq!(
            paths,
            vec![
                PropertyPath::field("item:Subject"),
                PropertyPath::indexed("contacts:EmailAddress", "EmailAddress1"),
                PropertyPath::Extended(vec![
                    ("PropertyTag".to_string(), "0x1000".to_string()),
                    ("PropertyType".to_string(), "String".to_string()),
                ]),
            ]
        );
        assert_eq!(paths[1].to_string(), "contacts:EmailAddress[EmailAddress1]");
    }

    #[test]
    fn test_read_from_json() {
        let json = r#"{"FieldURI":{"FieldURI":"folder:DisplayName"}}"#;
        let mut cursor = JsonCursor::from_str_with_root("Paths", json).unwrap();
        cursor.advance().unwrap();
        cursor.require_start_of(Namespace::Any, "FieldURI").unwrap();
        let path = PropertyPath::read(&mut cursor).unwrap();
        assert_eq!(path, Some(PropertyPath::field("folder:DisplayName")));
        assert!(cursor.is_end_of(Namespace::Any, "FieldURI"));
    }

    #[test]
    fn test_missing_field_uri_is_malformed() {
        let mut cursor = XmlCursor::from_str("<FieldURI/>");
        cursor.advance().unwrap();
        assert!(matches!(
            PropertyPath::read(&mut cursor),
            Err(EwsError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_write() {
        let mut writer = XmlTreeWriter::new();
        PropertyPath::indexed("contacts:PhoneNumber", "MobilePhone")
            .write(&mut writer)
            .unwrap();
        assert_eq!(
            writer.into_string().unwrap(),
            r#"<t:IndexedFieldURI FieldURI="contacts:PhoneNumber" FieldIndex="MobilePhone"/>"#
        );
    }
}
