//! Domain objects produced by the materializer
//!
//! Every concrete type implements [`ServiceObject`]: it knows its wire name
//! and decodes its own fields one child element at a time. The driving loop
//! (and the unknown-field skip policy) lives in
//! [`crate::registry::ObjectMaterializer`], so a type never walks past its own
//! children.

pub mod attachment;
pub mod catalog;
pub mod folder;
pub mod ids;
pub mod item;

use std::any::Any;
use std::fmt;

pub use attachment::{AttachmentFields, FileAttachment, ItemAttachment};
pub use folder::{CalendarFolder, ContactsFolder, Folder, FolderFields, SearchFolder, TasksFolder};
pub use ids::{FolderId, ItemId, ServiceId};
pub use item::{
    Body, BodyType, CalendarItem, Contact, Importance, Item, ItemFields, Mailbox, MeetingRequest,
    Message, Sensitivity, Task,
};

use crate::cursor::TreeCursor;
use crate::registry::DecodeContext;
use crate::types::error::Result;

/// Family of a concrete object type
///
/// Decoders that expect one family (the payload of an item change, the
/// folders of a folder search) only resolve discriminators of that family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Item,
    Folder,
    Attachment,
}

/// Decodable field set of a concrete object type
pub trait ServiceObject: Any + fmt::Debug + Send + Sync {
    /// Element name (or type tag) this type is registered under
    fn wire_name(&self) -> &'static str;

    fn kind(&self) -> ObjectKind;

    /// Identifier decoded so far, if the type carries one
    fn id(&self) -> Option<ServiceId> {
        None
    }

    /// Read the attributes of the object's own element-start
    fn decode_attributes(&mut self, _cursor: &dyn TreeCursor) -> Result<()> {
        Ok(())
    }

    /// Try to consume the child element the cursor is positioned on
    ///
    /// Returns `true` when the field was recognized, with the cursor left on
    /// the child's element-end. Returns `false` without moving otherwise.
    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn ServiceObject {
    pub fn downcast_ref<T: ServiceObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: ServiceObject>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Materialized object of any registered type
pub type ObjectHandle = Box<dyn ServiceObject>;
