//! Incremental synchronization feeds
//!
//! A sync response carries a new [`SyncState`] token, a "more changes"
//! flag and the ordered list of changes since the token the caller sent.
//! Changes are returned exactly as emitted: no reordering, no
//! deduplication.

mod request;

use std::fmt;

use tracing::{debug, trace};

pub use request::{SyncFolder, SyncRequest, SyncScope, MAX_CHANGES_RETURNED};

use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::objects::{FolderId, ItemId, ObjectHandle, ObjectKind, ServiceId, ServiceObject};
use crate::paging::more_available_from_wire;
use crate::registry::{DecodeContext, ObjectMaterializer, Projection};
use crate::response::ResponseBody;
use crate::types::error::{EwsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    ReadFlagChange,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "Create",
            ChangeType::Update => "Update",
            ChangeType::Delete => "Delete",
            ChangeType::ReadFlagChange => "ReadFlagChange",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a change feed
///
/// The payload is fixed by the variant: creations and updates carry the
/// object, read-flag changes the new flag, deletions only the identifier.
#[derive(Debug)]
pub enum Change {
    Create { id: ServiceId, object: ObjectHandle },
    Update { id: ServiceId, object: ObjectHandle },
    Delete { id: ServiceId },
    ReadFlagChange { id: ServiceId, is_read: bool },
}

impl Change {
    pub fn change_type(&self) -> ChangeType {
        match self {
            Change::Create { .. } => ChangeType::Create,
            Change::Update { .. } => ChangeType::Update,
            Change::Delete { .. } => ChangeType::Delete,
            Change::ReadFlagChange { .. } => ChangeType::ReadFlagChange,
        }
    }

    pub fn id(&self) -> &ServiceId {
        match self {
            Change::Create { id, .. }
            | Change::Update { id, .. }
            | Change::Delete { id }
            | Change::ReadFlagChange { id, .. } => id,
        }
    }

    pub fn object(&self) -> Option<&dyn ServiceObject> {
        match self {
            Change::Create { object, .. } | Change::Update { object, .. } => Some(object.as_ref()),
            Change::Delete { .. } | Change::ReadFlagChange { .. } => None,
        }
    }

    pub fn is_read(&self) -> Option<bool> {
        match self {
            Change::ReadFlagChange { is_read, .. } => Some(*is_read),
            _ => None,
        }
    }
}

/// Opaque synchronization token
///
/// Persisted by the caller and sent back verbatim on the next call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SyncState(String);

impl SyncState {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SyncState {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Decoded change feed
#[derive(Debug)]
pub struct SyncFeedResult {
    pub cursor_token: SyncState,
    pub more_available: bool,
    pub changes: Vec<Change>,
}

/// What a feed carries: items or folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeShape {
    kind: ObjectKind,
    projection: Projection,
    id_element: &'static str,
    discriminators: Vec<(String, ChangeType)>,
}

impl ChangeShape {
    fn new(kind: ObjectKind, projection: Projection, id_element: &'static str) -> Self {
        let discriminators = [
            ChangeType::Create,
            ChangeType::Update,
            ChangeType::Delete,
            ChangeType::ReadFlagChange,
        ]
        .into_iter()
        .map(|change_type| (change_type.as_str().to_string(), change_type))
        .collect();
        Self {
            kind,
            projection,
            id_element,
            discriminators,
        }
    }

    /// Item feed: summary objects, item identifiers
    pub fn items() -> Self {
        Self::new(ObjectKind::Item, Projection::Summary, "ItemId")
    }

    /// Folder hierarchy feed: full objects, folder identifiers
    pub fn folders() -> Self {
        Self::new(ObjectKind::Folder, Projection::Full, "FolderId")
    }

    /// Map one more discriminator to a change type
    pub fn with_discriminator(
        mut self,
        discriminator: impl Into<String>,
        change_type: ChangeType,
    ) -> Result<Self> {
        let discriminator = discriminator.into();
        if self.change_type(&discriminator).is_some() {
            return Err(EwsError::DuplicateDiscriminator(discriminator));
        }
        self.discriminators.push((discriminator, change_type));
        Ok(self)
    }

    pub fn change_type(&self, discriminator: &str) -> Option<ChangeType> {
        self.discriminators
            .iter()
            .find(|(name, _)| name == discriminator)
            .map(|(_, change_type)| *change_type)
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    fn read_id(&self, cursor: &mut dyn TreeCursor) -> Result<ServiceId> {
        Ok(match self.kind {
            ObjectKind::Folder => ServiceId::Folder(FolderId::read(cursor)?),
            _ => ServiceId::Item(ItemId::read(cursor)?),
        })
    }
}

/// Body decoder of a sync response (`SyncFolderItems`,
/// `SyncFolderHierarchy`)
#[derive(Debug)]
pub struct ChangeFeedDecoder {
    shape: ChangeShape,
    sync_state: Option<SyncState>,
    more_available: Option<bool>,
    changes: Vec<Change>,
}

impl ChangeFeedDecoder {
    pub fn new(shape: ChangeShape) -> Self {
        Self {
            shape,
            sync_state: None,
            more_available: None,
            changes: Vec::new(),
        }
    }

    fn read_changes(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<()> {
        let ctx = ctx.with_projection(self.shape.projection);
        let depth = cursor.depth();
        while cursor.next_child(depth)? {
            let discriminator = cursor.discriminator().unwrap_or_default().to_string();
            match self.shape.change_type(&discriminator) {
                Some(change_type) => {
                    let change = self.read_change(cursor, &ctx, change_type)?;
                    self.changes.push(change);
                }
                None => {
                    debug!("Skipping unrecognized change kind {}", discriminator);
                    cursor.skip_subtree()?;
                }
            }
        }
        Ok(())
    }

    fn read_change(
        &self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
        change_type: ChangeType,
    ) -> Result<Change> {
        let element = cursor.local_name().to_string();
        let depth = cursor.depth();
        let mut id = None;
        let mut object = None;
        let mut is_read = None;

        while cursor.next_child(depth)? {
            let name = cursor.local_name().to_string();
            match change_type {
                _ if name == self.shape.id_element => id = Some(self.shape.read_id(cursor)?),
                ChangeType::ReadFlagChange if name == "IsRead" => {
                    is_read = Some(cursor.read_leaf_value::<bool>()?)
                }
                ChangeType::Create | ChangeType::Update if object.is_none() => {
                    object = Some(self.materialize(cursor, ctx)?)
                }
                _ => {
                    trace!("Skipping {} in {} change", name, change_type);
                    cursor.skip_subtree()?;
                }
            }
        }

        match change_type {
            ChangeType::Create | ChangeType::Update => {
                let object = object.ok_or_else(|| {
                    EwsError::ChangeObjectMaterializationFailed(format!(
                        "{element} change without object"
                    ))
                })?;
                let id = match object.id().or(id) {
                    Some(id) => id,
                    None => return Err(EwsError::malformed(element, "", "object identifier")),
                };
                Ok(if change_type == ChangeType::Create {
                    Change::Create { id, object }
                } else {
                    Change::Update { id, object }
                })
            }
            ChangeType::Delete => {
                let id = id.ok_or_else(|| EwsError::desync(self.shape.id_element, element))?;
                Ok(Change::Delete { id })
            }
            ChangeType::ReadFlagChange => {
                let id = id.ok_or_else(|| EwsError::desync(self.shape.id_element, element.as_str()))?;
                let is_read = is_read.ok_or_else(|| EwsError::desync("<IsRead>", element))?;
                Ok(Change::ReadFlagChange { id, is_read })
            }
        }
    }

    fn materialize(&self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<ObjectHandle> {
        match ObjectMaterializer::expecting(self.shape.kind).materialize(cursor, ctx)? {
            Some(object) => Ok(object),
            None => Err(EwsError::ChangeObjectMaterializationFailed(
                cursor.discriminator().unwrap_or_default().to_string(),
            )),
        }
    }
}

impl ResponseBody for ChangeFeedDecoder {
    type Output = SyncFeedResult;

    fn decode_element(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "SyncState" => self.sync_state = Some(SyncState::new(cursor.read_leaf_text()?)),
            "IncludesLastItemInRange" | "IncludesLastFolderInRange" => {
                let includes_last = cursor.read_leaf_value::<bool>()?;
                self.more_available = Some(more_available_from_wire(includes_last));
            }
            "Changes" => self.read_changes(cursor, ctx)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn finish(self) -> Result<SyncFeedResult> {
        let cursor_token = self
            .sync_state
            .ok_or_else(|| EwsError::desync("<SyncState>", "end of response message"))?;
        let more_available = self.more_available.ok_or_else(|| {
            EwsError::desync("<IncludesLastItemInRange>", "end of response message")
        })?;
        debug!(
            "Change feed with {} changes, more available: {}",
            self.changes.len(),
            more_available
        );
        Ok(SyncFeedResult {
            cursor_token,
            more_available,
            changes: self.changes,
        })
    }
}
