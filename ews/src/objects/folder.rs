use std::any::Any;

use super::{FolderId, ObjectKind, ServiceId, ServiceObject};
use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::registry::DecodeContext;
use crate::types::error::Result;

/// Fields shared by every folder type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderFields {
    pub id: Option<FolderId>,
    pub parent_folder_id: Option<FolderId>,
    pub folder_class: Option<String>,
    pub display_name: Option<String>,
    pub total_count: Option<u32>,
    pub child_folder_count: Option<u32>,
    pub unread_count: Option<u32>,
}

impl FolderFields {
    pub fn decode_field(&mut self, cursor: &mut dyn TreeCursor) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "FolderId" => self.id = Some(FolderId::read(cursor)?),
            "ParentFolderId" => self.parent_folder_id = Some(FolderId::read(cursor)?),
            "FolderClass" => self.folder_class = Some(cursor.read_leaf_value()?),
            "DisplayName" => self.display_name = Some(cursor.read_leaf_value()?),
            "TotalCount" => self.total_count = Some(cursor.read_leaf_value()?),
            "ChildFolderCount" => self.child_folder_count = Some(cursor.read_leaf_value()?),
            "UnreadCount" => self.unread_count = Some(cursor.read_leaf_value()?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

macro_rules! folder_type {
    ($(#[$meta:meta])* $name:ident, $wire:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub folder: FolderFields,
        }

        impl ServiceObject for $name {
            fn wire_name(&self) -> &'static str {
                $wire
            }

            fn kind(&self) -> ObjectKind {
                ObjectKind::Folder
            }

            fn id(&self) -> Option<ServiceId> {
                self.folder.id.clone().map(ServiceId::Folder)
            }

            fn decode_field(
                &mut self,
                cursor: &mut dyn TreeCursor,
                _ctx: &DecodeContext,
            ) -> Result<bool> {
                self.folder.decode_field(cursor)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

folder_type!(
    /// Generic mail folder
    Folder,
    "Folder"
);
folder_type!(CalendarFolder, "CalendarFolder");
folder_type!(ContactsFolder, "ContactsFolder");
folder_type!(
    /// Virtual folder backed by a stored search
    SearchFolder,
    "SearchFolder"
);
folder_type!(TasksFolder, "TasksFolder");
