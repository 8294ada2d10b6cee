use std::fmt;

use crate::cursor::Namespace;
use crate::types::error::{EwsError, Result};
use crate::types::PropertyPath;
use crate::writer::TreeWriter;

/// Anchor the paging offset is counted from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffsetBasePoint {
    #[default]
    Beginning,
    End,
}

impl OffsetBasePoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetBasePoint::Beginning => "Beginning",
            OffsetBasePoint::End => "End",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Traversal {
    #[default]
    Shallow,
    Deep,
    SoftDeleted,
    Associated,
}

impl Traversal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Traversal::Shallow => "Shallow",
            Traversal::Deep => "Deep",
            Traversal::SoftDeleted => "SoftDeleted",
            Traversal::Associated => "Associated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered sort keys, at most one entry per property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    entries: Vec<(PropertyPath, SortDirection)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key, failing with `DuplicateSortKey` if the property is
    /// already sorted on
    pub fn add(&mut self, path: PropertyPath, direction: SortDirection) -> Result<&mut Self> {
        if self.entries.iter().any(|(existing, _)| *existing == path) {
            return Err(EwsError::DuplicateSortKey(path.to_string()));
        }
        self.entries.push((path, direction));
        Ok(self)
    }

    pub fn then(mut self, path: PropertyPath, direction: SortDirection) -> Result<Self> {
        self.add(path, direction)?;
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PropertyPath, SortDirection)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        writer.start_collection(Namespace::Messages, "SortOrder")?;
        for (path, direction) in &self.entries {
            writer.start_element(Namespace::Types, "FieldOrder")?;
            writer.write_attribute("Order", direction.as_str())?;
            path.write(writer)?;
            writer.end_element()?;
        }
        writer.end_element()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregateType {
    Minimum,
    #[default]
    Maximum,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Minimum => "Minimum",
            AggregateType::Maximum => "Maximum",
        }
    }
}

/// How a grouped item search buckets its results
///
/// Groups are ordered by the aggregate of `aggregate_on` within each group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    pub group_on: PropertyPath,
    pub aggregate_on: PropertyPath,
    pub aggregate_type: AggregateType,
    pub direction: SortDirection,
}

impl Grouping {
    pub fn new(group_on: PropertyPath, aggregate_on: PropertyPath) -> Self {
        Self {
            group_on,
            aggregate_on,
            aggregate_type: AggregateType::default(),
            direction: SortDirection::default(),
        }
    }

    pub fn with_aggregate(mut self, aggregate_type: AggregateType) -> Self {
        self.aggregate_type = aggregate_type;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn write(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        writer.start_element(Namespace::Messages, "GroupBy")?;
        writer.write_attribute("Order", self.direction.as_str())?;
        self.group_on.write(writer)?;
        writer.start_element(Namespace::Types, "AggregateOn")?;
        writer.write_attribute("Aggregate", self.aggregate_type.as_str())?;
        self.aggregate_on.write(writer)?;
        writer.end_element()?;
        writer.end_element()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaseShape {
    IdOnly,
    #[default]
    Default,
    AllProperties,
}

impl BaseShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseShape::IdOnly => "IdOnly",
            BaseShape::Default => "Default",
            BaseShape::AllProperties => "AllProperties",
        }
    }
}

/// Properties requested for every returned object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    pub base_shape: BaseShape,
    pub additional: Vec<PropertyPath>,
}

impl PropertySet {
    pub fn new(base_shape: BaseShape) -> Self {
        Self {
            base_shape,
            additional: Vec::new(),
        }
    }

    pub fn with(mut self, path: PropertyPath) -> Self {
        self.additional.push(path);
        self
    }

    /// Write the shape element (`ItemShape` or `FolderShape`)
    pub fn write(&self, writer: &mut dyn TreeWriter, element: &str) -> Result<()> {
        writer.start_element(Namespace::Messages, element)?;
        writer.write_element_value(Namespace::Types, "BaseShape", self.base_shape.as_str())?;
        if !self.additional.is_empty() {
            writer.start_collection(Namespace::Types, "AdditionalProperties")?;
            for path in &self.additional {
                path.write(writer)?;
            }
            writer.end_element()?;
        }
        writer.end_element()
    }
}

/// Family of objects a view pages through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    Items,
    Folders,
}

impl ViewTarget {
    fn shape_element(&self) -> &'static str {
        match self {
            ViewTarget::Items => "ItemShape",
            ViewTarget::Folders => "FolderShape",
        }
    }

    fn view_element(&self) -> &'static str {
        match self {
            ViewTarget::Items => "IndexedPageItemView",
            ViewTarget::Folders => "IndexedPageFolderView",
        }
    }
}

/// Outbound paging and traversal parameters of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedView {
    target: ViewTarget,
    page_size: Option<u32>,
    offset: u32,
    base_point: OffsetBasePoint,
    traversal: Traversal,
    order_by: OrderBy,
    grouping: Option<Grouping>,
    property_set: PropertySet,
}

impl PagedView {
    /// Paged view returning at most `page_size` objects per call
    pub fn new(target: ViewTarget, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(EwsError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        let mut view = Self::unpaged(target);
        view.page_size = Some(page_size);
        Ok(view)
    }

    /// View returning every match at once
    pub fn unpaged(target: ViewTarget) -> Self {
        Self {
            target,
            page_size: None,
            offset: 0,
            base_point: OffsetBasePoint::default(),
            traversal: Traversal::default(),
            order_by: OrderBy::default(),
            grouping: None,
            property_set: PropertySet::default(),
        }
    }

    pub fn with_offset(mut self, offset: u32, base_point: OffsetBasePoint) -> Self {
        self.offset = offset;
        self.base_point = base_point;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    /// Request a grouped result; only item searches can be grouped
    pub fn with_grouping(mut self, grouping: Grouping) -> Result<Self> {
        if self.target == ViewTarget::Folders {
            return Err(EwsError::InvalidArgument(
                "folder views cannot be grouped".to_string(),
            ));
        }
        self.grouping = Some(grouping);
        Ok(self)
    }

    pub fn with_property_set(mut self, property_set: PropertySet) -> Self {
        self.property_set = property_set;
        self
    }

    pub fn target(&self) -> ViewTarget {
        self.target
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn order_by(&self) -> &OrderBy {
        &self.order_by
    }

    pub fn is_grouped(&self) -> bool {
        self.grouping.is_some()
    }

    /// Write the attributes carried by the request element itself
    pub fn write_attributes(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        writer.write_attribute("Traversal", self.traversal.as_str())
    }

    /// Write shape, paging window, grouping and sort order, in that order
    pub fn write_elements(&self, writer: &mut dyn TreeWriter) -> Result<()> {
        self.property_set
            .write(writer, self.target.shape_element())?;

        if let Some(page_size) = self.page_size {
            writer.start_element(Namespace::Messages, self.target.view_element())?;
            writer.write_attribute("MaxEntriesReturned", &page_size.to_string())?;
            writer.write_attribute("Offset", &self.offset.to_string())?;
            writer.write_attribute("BasePoint", self.base_point.as_str())?;
            writer.end_element()?;
        }

        if let Some(grouping) = &self.grouping {
            grouping.write(writer)?;
        }

        self.order_by.write(writer)
    }
}
