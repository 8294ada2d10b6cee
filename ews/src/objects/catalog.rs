//! Built-in object catalog

use super::{
    CalendarFolder, CalendarItem, Contact, ContactsFolder, FileAttachment, Folder, Item,
    ItemAttachment, MeetingRequest, Message, SearchFolder, Task, TasksFolder,
};
use crate::registry::TypeRegistry;
use crate::types::error::Result;

/// Build a registry holding every type shipped with the crate
pub fn builtin_registry() -> Result<TypeRegistry> {
    let mut builder = TypeRegistry::builder();
    builder
        .register_type::<Item>()?
        .register_type::<Message>()?
        .register_type::<MeetingRequest>()?
        .register_type::<CalendarItem>()?
        .register_type::<Contact>()?
        .register_type::<Task>()?
        .register_type::<Folder>()?
        .register_type::<CalendarFolder>()?
        .register_type::<ContactsFolder>()?
        .register_type::<SearchFolder>()?
        .register_type::<TasksFolder>()?
        .register_type::<FileAttachment>()?
        .register_type::<ItemAttachment>()?;
    Ok(builder.build())
}
