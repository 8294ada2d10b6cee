use tracing::{debug, trace};

use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::objects::{ObjectHandle, ObjectKind};
use crate::registry::{DecodeContext, ObjectMaterializer, Projection};
use crate::response::ResponseBody;
use crate::types::error::{EwsError, Result};

use super::more_available_from_wire;

/// Position of a page within the full result
///
/// The offset of the next page only exists while more results are
/// available; a stale offset sent along with the last page is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    total_count: u32,
    more_available: bool,
    next_page_offset: Option<u32>,
}

impl PageInfo {
    pub fn new(total_count: u32, more_available: bool, next_page_offset: Option<u32>) -> Self {
        Self {
            total_count,
            more_available,
            next_page_offset: next_page_offset.filter(|_| more_available),
        }
    }

    /// Read the paging attributes of a `RootFolder` element-start
    fn read(cursor: &dyn TreeCursor) -> Result<Self> {
        let total_count = cursor.read_attribute_as("TotalItemsInView")?.unwrap_or(0);
        let includes_last = cursor
            .read_attribute_as("IncludesLastItemInRange")?
            .unwrap_or(true);
        let offset = cursor.read_attribute_as("IndexedPagingOffset")?;
        Ok(Self::new(
            total_count,
            more_available_from_wire(includes_last),
            offset,
        ))
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn more_available(&self) -> bool {
        self.more_available
    }

    pub fn next_page_offset(&self) -> Option<u32> {
        self.next_page_offset
    }
}

/// One page of a flat search
#[derive(Debug, Default)]
pub struct FindResults {
    pub page: PageInfo,
    pub objects: Vec<ObjectHandle>,
}

/// Objects sharing one value of the grouping property
#[derive(Debug, Default)]
pub struct ObjectGroup {
    pub group_index: String,
    pub objects: Vec<ObjectHandle>,
}

/// One page of a grouped search
#[derive(Debug, Default)]
pub struct GroupedFindResults {
    pub page: PageInfo,
    pub groups: Vec<ObjectGroup>,
}

/// Expected layout of a search page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    Flat,
    Grouped,
}

#[derive(Debug)]
pub enum PageResult {
    Flat(FindResults),
    Grouped(GroupedFindResults),
}

impl PageResult {
    pub fn page(&self) -> PageInfo {
        match self {
            PageResult::Flat(results) => results.page,
            PageResult::Grouped(results) => results.page,
        }
    }

    pub fn into_flat(self) -> Option<FindResults> {
        match self {
            PageResult::Flat(results) => Some(results),
            PageResult::Grouped(_) => None,
        }
    }

    pub fn into_grouped(self) -> Option<GroupedFindResults> {
        match self {
            PageResult::Grouped(results) => Some(results),
            PageResult::Flat(_) => None,
        }
    }
}

fn collection_kind(name: &str) -> Option<ObjectKind> {
    match name {
        "Items" => Some(ObjectKind::Item),
        "Folders" => Some(ObjectKind::Folder),
        _ => None,
    }
}

/// Body decoder of a search response (`FindItem`, `FindFolder`)
///
/// Objects are materialized with the summary projection unless told
/// otherwise. Unknown object types follow the context's collection policy.
#[derive(Debug)]
pub struct PageBody {
    shape: PageShape,
    projection: Projection,
    page: Option<PageInfo>,
    objects: Vec<ObjectHandle>,
    groups: Vec<ObjectGroup>,
}

impl PageBody {
    pub fn new(shape: PageShape) -> Self {
        Self {
            shape,
            projection: Projection::Summary,
            page: None,
            objects: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn flat() -> Self {
        Self::new(PageShape::Flat)
    }

    pub fn grouped() -> Self {
        Self::new(PageShape::Grouped)
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    fn read_root(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<()> {
        let page = PageInfo::read(cursor)?;
        let ctx = ctx.with_projection(self.projection);
        let depth = cursor.depth();

        while cursor.next_child(depth)? {
            let name = cursor.local_name().to_string();
            match (self.shape, name.as_str()) {
                (PageShape::Flat, "Items" | "Folders") => {
                    let materializer = collection_kind(&name)
                        .map(ObjectMaterializer::expecting)
                        .unwrap_or_default();
                    let objects =
                        materializer.materialize_collection(cursor, &ctx, ctx.collection_policy)?;
                    self.objects.extend(objects);
                }
                (PageShape::Grouped, "Groups") => {
                    let group_depth = cursor.depth();
                    while cursor.next_child(group_depth)? {
                        self.groups.push(read_group(cursor, &ctx)?);
                    }
                }
                _ => {
                    trace!("Skipping {} in RootFolder", name);
                    cursor.skip_subtree()?;
                }
            }
        }

        debug!(
            "Page of {} objects in {} groups, total {}, more available: {}",
            self.objects.len(),
            self.groups.len(),
            page.total_count(),
            page.more_available()
        );
        self.page = Some(page);
        Ok(())
    }
}

fn read_group(cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<ObjectGroup> {
    let depth = cursor.depth();
    let mut group = ObjectGroup::default();
    while cursor.next_child(depth)? {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "GroupIndex" => group.group_index = cursor.read_leaf_text()?,
            "Items" => {
                let objects = ObjectMaterializer::expecting(ObjectKind::Item)
                    .materialize_collection(cursor, ctx, ctx.collection_policy)?;
                group.objects.extend(objects);
            }
            _ => cursor.skip_subtree()?,
        }
    }
    Ok(group)
}

impl ResponseBody for PageBody {
    type Output = PageResult;

    fn decode_element(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        if cursor.local_name() != "RootFolder" {
            return Ok(false);
        }
        self.read_root(cursor, ctx)?;
        Ok(true)
    }

    fn finish(self) -> Result<PageResult> {
        let page = self
            .page
            .ok_or_else(|| EwsError::desync("<RootFolder>", "end of response message"))?;
        Ok(match self.shape {
            PageShape::Flat => PageResult::Flat(FindResults {
                page,
                objects: self.objects,
            }),
            PageShape::Grouped => PageResult::Grouped(GroupedFindResults {
                page,
                groups: self.groups,
            }),
        })
    }
}

/// Body decoder of a fetch response (`GetItem`, `GetFolder`)
///
/// Objects are materialized with the full projection, and a fetched object
/// of unknown type follows the context's single-object policy.
#[derive(Debug, Default)]
pub struct ObjectFetchBody {
    objects: Vec<ObjectHandle>,
}

impl ObjectFetchBody {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseBody for ObjectFetchBody {
    type Output = Vec<ObjectHandle>;

    fn decode_element(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let Some(kind) = collection_kind(cursor.local_name()) else {
            return Ok(false);
        };
        let ctx = ctx.with_projection(Projection::Full);
        let objects = ObjectMaterializer::expecting(kind).materialize_collection(
            cursor,
            &ctx,
            ctx.single_object_policy,
        )?;
        self.objects.extend(objects);
        Ok(true)
    }

    fn finish(self) -> Result<Vec<ObjectHandle>> {
        Ok(self.objects)
    }
}
