use std::any::Any;

use super::{ObjectHandle, ObjectKind, ServiceObject};
use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::registry::{DecodeContext, ObjectMaterializer};
use crate::types::error::Result;

/// Fields shared by both attachment types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentFields {
    pub attachment_id: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub is_inline: Option<bool>,
}

impl AttachmentFields {
    fn decode_field(&mut self, cursor: &mut dyn TreeCursor) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "AttachmentId" => {
                self.attachment_id = cursor.read_attribute("Id").map(str::to_string);
                cursor.skip_subtree()?;
            }
            "Name" => self.name = Some(cursor.read_leaf_value()?),
            "ContentType" => self.content_type = Some(cursor.read_leaf_value()?),
            "Size" => self.size = Some(cursor.read_leaf_value()?),
            "IsInline" => self.is_inline = Some(cursor.read_leaf_value()?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttachment {
    pub attachment: AttachmentFields,
    /// Raw bytes, only present when the attachment itself was fetched
    pub content: Option<Vec<u8>>,
}

impl ServiceObject for FileAttachment {
    fn wire_name(&self) -> &'static str {
        "FileAttachment"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Attachment
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, _ctx: &DecodeContext) -> Result<bool> {
        if cursor.local_name() == "Content" {
            self.content = Some(cursor.read_leaf_value()?);
            return Ok(true);
        }
        self.attachment.decode_field(cursor)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Attachment embedding a whole item
#[derive(Debug, Default)]
pub struct ItemAttachment {
    pub attachment: AttachmentFields,
    pub item: Option<ObjectHandle>,
}

impl ServiceObject for ItemAttachment {
    fn wire_name(&self) -> &'static str {
        "ItemAttachment"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Attachment
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        if self.attachment.decode_field(cursor)? {
            return Ok(true);
        }
        // any other child naming an item type is the embedded item
        match ObjectMaterializer::expecting(ObjectKind::Item).materialize(cursor, ctx)? {
            Some(item) => {
                self.item = Some(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
