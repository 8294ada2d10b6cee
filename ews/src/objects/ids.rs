use std::fmt;

use crate::cursor::{Namespace, TreeCursor};
use crate::types::error::{EwsError, Result};
use crate::writer::TreeWriter;

/// Identifier of an item, with the change key of the version it was read at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId {
    pub id: String,
    pub change_key: Option<String>,
}

/// Identifier of a folder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderId {
    pub id: String,
    pub change_key: Option<String>,
}

fn read_id_attributes(cursor: &mut dyn TreeCursor) -> Result<(String, Option<String>)> {
    if !cursor.is_start() {
        return Err(EwsError::UnexpectedNode(format!(
            "identifier expected, found {}",
            cursor.describe()
        )));
    }
    let id = cursor
        .read_attribute("Id")
        .map(str::to_string)
        .ok_or_else(|| EwsError::malformed(cursor.local_name(), "", "Id attribute"))?;
    let change_key = cursor.read_attribute("ChangeKey").map(str::to_string);
    cursor.skip_subtree()?;
    Ok((id, change_key))
}

fn write_id(
    writer: &mut dyn TreeWriter,
    name: &str,
    id: &str,
    change_key: Option<&str>,
) -> Result<()> {
    writer.start_element(Namespace::Types, name)?;
    writer.write_attribute("Id", id)?;
    if let Some(change_key) = change_key {
        writer.write_attribute("ChangeKey", change_key)?;
    }
    writer.end_element()
}

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn with_change_key(mut self, change_key: impl Into<String>) -> Self {
        self.change_key = Some(change_key.into());
        self
    }

    /// Read the identifier element the cursor is positioned on, whatever its
    /// name (`ItemId`, `ParentItemId`, ...)
    pub fn read(cursor: &mut dyn TreeCursor) -> Result<Self> {
        let (id, change_key) = read_id_attributes(cursor)?;
        Ok(Self { id, change_key })
    }

    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        write_id(writer, "ItemId", &self.id, self.change_key.as_deref())
    }
}

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn with_change_key(mut self, change_key: impl Into<String>) -> Self {
        self.change_key = Some(change_key.into());
        self
    }

    pub fn read(cursor: &mut dyn TreeCursor) -> Result<Self> {
        let (id, change_key) = read_id_attributes(cursor)?;
        Ok(Self { id, change_key })
    }

    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        write_id(writer, "FolderId", &self.id, self.change_key.as_deref())
    }
}

/// Identifier of either family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceId {
    Item(ItemId),
    Folder(FolderId),
}

impl ServiceId {
    pub fn id(&self) -> &str {
        match self {
            ServiceId::Item(item) => &item.id,
            ServiceId::Folder(folder) => &folder.id,
        }
    }

    pub fn change_key(&self) -> Option<&str> {
        match self {
            ServiceId::Item(item) => item.change_key.as_deref(),
            ServiceId::Folder(folder) => folder.change_key.as_deref(),
        }
    }
}

impl From<ItemId> for ServiceId {
    fn from(id: ItemId) -> Self {
        ServiceId::Item(id)
    }
}

impl From<FolderId> for ServiceId {
    fn from(id: FolderId) -> Self {
        ServiceId::Folder(id)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{JsonCursor, XmlCursor};
    use crate::writer::XmlTreeWriter;

    #[test]
    fn test_read_item_id() {
        let mut cursor = XmlCursor::from_str(r#"<ItemId Id="AAMk" ChangeKey="CQAA"/>"#);
        cursor.advance().unwrap();
        let id = ItemId::read(&mut cursor).unwrap();
        assert_eq!(id, ItemId::new("AAMk").with_change_key("CQAA"));
        assert!(cursor.is_end_of(Namespace::Any, "ItemId"));
    }

    #[test]
    fn test_read_folder_id_from_json() {
        // the Id key is echoed as a child, which the read skips
        let mut cursor = JsonCursor::from_str_with_root("FolderId", r#"{"Id":"AQMk"}"#).unwrap();
        cursor.advance().unwrap();
        let id = FolderId::read(&mut cursor).unwrap();
        assert_eq!(id, FolderId::new("AQMk"));
        assert!(cursor.is_end_of(Namespace::Any, "FolderId"));
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let mut cursor = XmlCursor::from_str(r#"<ItemId ChangeKey="CQAA"/>"#);
        cursor.advance().unwrap();
        assert!(matches!(
            ItemId::read(&mut cursor),
            Err(EwsError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_write_item_id() {
        let mut writer = XmlTreeWriter::new();
        ItemId::new("AAMk").write(&mut writer).unwrap();
        assert_eq!(writer.into_string().unwrap(), r#"<t:ItemId Id="AAMk"/>"#);
    }

    #[test]
    fn test_service_id() {
        let id: ServiceId = FolderId::new("f1").with_change_key("ck").into();
        assert_eq!(id.id(), "f1");
        assert_eq!(id.change_key(), Some("ck"));
        assert_eq!(id.to_string(), "f1");
    }
}
