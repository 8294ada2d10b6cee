use tracing::trace;

use super::ResponseEnvelope;
use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::objects::{FolderId, ItemId, ServiceId};
use crate::types::error::Result;
use crate::types::PropertyPath;

/// Extension point for error payloads beyond the generic envelope fields
///
/// Called with the cursor on a child element-start of an error (or warning)
/// response message. Returns `true` with the cursor on the child's
/// element-end when the child was consumed, `false` without moving
/// otherwise.
pub trait ErrorDetailHook {
    fn load_extra_error_details(
        &mut self,
        cursor: &mut dyn TreeCursor,
        envelope: &mut ResponseEnvelope,
    ) -> Result<bool>;
}

/// Default hook: the generic `MessageXml` payload
///
/// `Value Name="..."` entries land in `details`, property references in
/// `properties`. Any other wrapper is descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageXmlHook;

impl MessageXmlHook {
    fn read_entries(cursor: &mut dyn TreeCursor, envelope: &mut ResponseEnvelope) -> Result<()> {
        let depth = cursor.depth();
        while cursor.next_child(depth)? {
            if let Some(path) = PropertyPath::read(cursor)? {
                envelope.properties.push(path);
                continue;
            }
            let name = cursor.read_attribute("Name").map(str::to_string);
            match name {
                Some(name) if cursor.local_name() == "Value" => {
                    let value = cursor.read_leaf_text()?;
                    envelope.details.insert(name, value);
                }
                _ => Self::read_entries(cursor, envelope)?,
            }
        }
        Ok(())
    }
}

impl ErrorDetailHook for MessageXmlHook {
    fn load_extra_error_details(
        &mut self,
        cursor: &mut dyn TreeCursor,
        envelope: &mut ResponseEnvelope,
    ) -> Result<bool> {
        if cursor.local_name() != "MessageXml" {
            return Ok(false);
        }
        Self::read_entries(cursor, envelope)?;
        Ok(true)
    }
}

/// Collects the identifiers listed under one operation-specific element,
/// e.g. the items a partially failed batch could not process
#[derive(Debug, Clone)]
pub struct IdListHook {
    element: String,
}

impl IdListHook {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }
}

impl ErrorDetailHook for IdListHook {
    fn load_extra_error_details(
        &mut self,
        cursor: &mut dyn TreeCursor,
        envelope: &mut ResponseEnvelope,
    ) -> Result<bool> {
        if cursor.local_name() != self.element {
            return Ok(false);
        }
        let depth = cursor.depth();
        while cursor.next_child(depth)? {
            let name = cursor.local_name().to_string();
            match name.as_str() {
                "ItemId" => envelope.error_ids.push(ServiceId::Item(ItemId::read(cursor)?)),
                "FolderId" => envelope
                    .error_ids
                    .push(ServiceId::Folder(FolderId::read(cursor)?)),
                _ => {
                    trace!("Skipping {} in {}", name, self.element);
                    cursor.skip_subtree()?;
                }
            }
        }
        Ok(true)
    }
}

/// Hooks tried in order until one consumes the element
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn ErrorDetailHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl ErrorDetailHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }
}

impl ErrorDetailHook for HookChain {
    fn load_extra_error_details(
        &mut self,
        cursor: &mut dyn TreeCursor,
        envelope: &mut ResponseEnvelope,
    ) -> Result<bool> {
        for hook in self.hooks.iter_mut() {
            if hook.load_extra_error_details(cursor, envelope)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
