//! Paged search views and the pages they produce
//!
//! [`PagedView`] serializes the outbound paging window (size, offset, base
//! point, grouping, sort order). [`PageBody`] decodes one returned page into
//! a [`PageInfo`] plus its objects, flat or grouped.

mod results;
mod view;

pub use results::{
    FindResults, GroupedFindResults, ObjectFetchBody, ObjectGroup, PageBody, PageInfo, PageResult,
    PageShape,
};
pub use view::{
    AggregateType, BaseShape, Grouping, OffsetBasePoint, OrderBy, PagedView, PropertySet,
    SortDirection, Traversal, ViewTarget,
};

/// Convert the wire's `IncludesLastItemInRange` into "more results follow"
///
/// Shared by search pages and change feeds, which both report the negated
/// flag.
pub fn more_available_from_wire(includes_last_item_in_range: bool) -> bool {
    !includes_last_item_in_range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_flag_is_negated() {
        assert!(more_available_from_wire(false));
        assert!(!more_available_from_wire(true));
    }
}
