use super::{ChangeShape, SyncState};
use crate::cursor::Namespace;
use crate::objects::{FolderId, ItemId, ObjectKind};
use crate::paging::PropertySet;
use crate::types::error::{EwsError, Result};
use crate::writer::TreeWriter;

/// Upper bound the server accepts for `MaxChangesReturned`
pub const MAX_CHANGES_RETURNED: u32 = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncScope {
    #[default]
    NormalItems,
    NormalAndAssociatedItems,
}

impl SyncScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncScope::NormalItems => "NormalItems",
            SyncScope::NormalAndAssociatedItems => "NormalAndAssociatedItems",
        }
    }
}

/// Folder a feed is synchronized against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFolder {
    Id(FolderId),
    /// Well-known folder name, e.g. `inbox`
    Distinguished(String),
}

impl SyncFolder {
    fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        writer.start_element(Namespace::Messages, "SyncFolderId")?;
        match self {
            SyncFolder::Id(id) => id.write(writer)?,
            SyncFolder::Distinguished(name) => {
                writer.start_element(Namespace::Types, "DistinguishedFolderId")?;
                writer.write_attribute("Id", name)?;
                writer.end_element()?;
            }
        }
        writer.end_element()
    }
}

impl From<FolderId> for SyncFolder {
    fn from(id: FolderId) -> Self {
        SyncFolder::Id(id)
    }
}

/// Outbound parameters of a sync call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    kind: ObjectKind,
    property_set: PropertySet,
    folder: Option<SyncFolder>,
    sync_state: Option<SyncState>,
    ignore: Vec<ItemId>,
    max_changes: Option<u32>,
    scope: Option<SyncScope>,
}

impl SyncRequest {
    /// Item sync of one folder, at most `max_changes` changes per call
    pub fn items(folder: impl Into<SyncFolder>, max_changes: u32) -> Result<Self> {
        if !(1..=MAX_CHANGES_RETURNED).contains(&max_changes) {
            return Err(EwsError::InvalidArgument(format!(
                "max changes must be between 1 and {MAX_CHANGES_RETURNED}, got {max_changes}"
            )));
        }
        Ok(Self {
            kind: ObjectKind::Item,
            property_set: PropertySet::default(),
            folder: Some(folder.into()),
            sync_state: None,
            ignore: Vec::new(),
            max_changes: Some(max_changes),
            scope: None,
        })
    }

    /// Folder hierarchy sync, below `folder` or the whole mailbox
    pub fn folders(folder: Option<SyncFolder>) -> Self {
        Self {
            kind: ObjectKind::Folder,
            property_set: PropertySet::default(),
            folder,
            sync_state: None,
            ignore: Vec::new(),
            max_changes: None,
            scope: None,
        }
    }

    /// Resume from the token returned by the previous call
    pub fn with_sync_state(mut self, sync_state: SyncState) -> Self {
        self.sync_state = Some(sync_state);
        self
    }

    pub fn with_property_set(mut self, property_set: PropertySet) -> Self {
        self.property_set = property_set;
        self
    }

    /// Items whose changes are left out of the feed
    pub fn ignoring(mut self, ids: impl IntoIterator<Item = ItemId>) -> Result<Self> {
        if self.kind != ObjectKind::Item {
            return Err(EwsError::InvalidArgument(
                "only item syncs can ignore items".to_string(),
            ));
        }
        self.ignore.extend(ids);
        Ok(self)
    }

    pub fn with_scope(mut self, scope: SyncScope) -> Result<Self> {
        if self.kind != ObjectKind::Item {
            return Err(EwsError::InvalidArgument(
                "sync scope only applies to item syncs".to_string(),
            ));
        }
        self.scope = Some(scope);
        Ok(self)
    }

    /// Shape of the feed this request produces
    pub fn change_shape(&self) -> ChangeShape {
        match self.kind {
            ObjectKind::Folder => ChangeShape::folders(),
            _ => ChangeShape::items(),
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Folder => "SyncFolderHierarchy",
            _ => "SyncFolderItems",
        }
    }

    /// Write the request element with all its parameters
    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        writer.start_element(Namespace::Messages, self.operation_name())?;

        let shape = match self.kind {
            ObjectKind::Folder => "FolderShape",
            _ => "ItemShape",
        };
        self.property_set.write(writer, shape)?;

        if let Some(folder) = &self.folder {
            folder.write(writer)?;
        }
        if let Some(sync_state) = &self.sync_state {
            writer.write_element_value(Namespace::Messages, "SyncState", sync_state.as_str())?;
        }
        if !self.ignore.is_empty() {
            writer.start_collection(Namespace::Messages, "Ignore")?;
            for id in &self.ignore {
                id.write(writer)?;
            }
            writer.end_element()?;
        }
        if let Some(max_changes) = self.max_changes {
            writer.write_element_value(
                Namespace::Messages,
                "MaxChangesReturned",
                &max_changes.to_string(),
            )?;
        }
        if let Some(scope) = self.scope {
            writer.write_element_value(Namespace::Messages, "SyncScope", scope.as_str())?;
        }

        writer.end_element()
    }
}
