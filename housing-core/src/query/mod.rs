//! Parameterised predicate and assignment assembly.
//!
//! Caller input reaches SQL only through the allow-listed column enums in
//! [`column`]; every value is bound as a parameter. The storage layer turns a
//! [`FlatSearch`] into a [`WhereClause`] with [`ListingPredicate`] and a
//! [`FieldMap`] into [`Assignments`].

mod column;
mod filter;
mod predicate;
mod update;
mod value;

pub use column::{Column, ColumnKind, LotColumn, RoomColumn};
pub use filter::{CompareOp, Filter, OrderBy, SortDirection};
pub use predicate::{ListingPredicate, WhereClause};
pub use update::{Assignments, FieldMap};
pub use value::FieldValue;

use crate::{
    ValidationError,
    spatial::{SearchArea, validate_location},
};

/// A paged listing search.
///
/// # Examples
///
/// ```
/// use housing_core::query::{FlatSearch, LotColumn, OrderBy, SortDirection};
///
/// let search = FlatSearch::new(3, 2)
///     .order_by(OrderBy::new(LotColumn::Area, SortDirection::Asc));
/// assert!(search.validate().is_ok());
/// assert_eq!(search.offset(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSearch {
    /// Page size.
    pub limit: u32,
    /// One-based page number.
    pub page: u32,
    /// Conjoined caller filters.
    pub filters: Vec<Filter>,
    /// Search templates instead of advertisements.
    pub is_constructor: bool,
    /// Page ordering.
    pub order_by: OrderBy,
    /// Proximity constraint; an unbounded area searches everywhere.
    pub area: SearchArea,
    /// Whether the caller owns the lots, lifting the visibility rule.
    pub is_owner: bool,
}

impl FlatSearch {
    /// Page `page` of `limit` advertisements visible to anyone.
    #[must_use]
    pub fn new(limit: u32, page: u32) -> Self {
        Self {
            limit,
            page,
            filters: Vec::new(),
            is_constructor: false,
            order_by: OrderBy::default(),
            area: SearchArea::default(),
            is_owner: false,
        }
    }

    /// Add a caller filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Search templates (`true`) or advertisements (`false`).
    #[must_use]
    pub const fn constructor(mut self, is_constructor: bool) -> Self {
        self.is_constructor = is_constructor;
        self
    }

    /// Order the page.
    #[must_use]
    pub const fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    /// Restrict to a disc.
    #[must_use]
    pub const fn within(mut self, area: SearchArea) -> Self {
        self.area = area;
        self
    }

    /// Mark the caller as the owner of the searched lots.
    #[must_use]
    pub const fn owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    /// Reject requests that could never produce a page.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroLimit`], [`ValidationError::ZeroPage`],
    /// or [`ValidationError::InvalidCoordinates`] for a bounded area whose
    /// centre is not a valid position.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        if self.page == 0 {
            return Err(ValidationError::ZeroPage);
        }
        if !self.area.is_unbounded() {
            validate_location(self.area.centre)?;
        }
        Ok(())
    }

    /// Rows skipped before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.limit).saturating_mul(u64::from(self.page.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FlatSearch::new(0, 1), ValidationError::ZeroLimit)]
    #[case(FlatSearch::new(10, 0), ValidationError::ZeroPage)]
    fn rejects_empty_pages(#[case] search: FlatSearch, #[case] expected: ValidationError) {
        assert_eq!(search.validate(), Err(expected));
    }

    #[rstest]
    fn rejects_bounded_area_with_invalid_centre() {
        let search = FlatSearch::new(10, 1).within(SearchArea::new(0.0, 95.0, 500.0));
        assert!(matches!(
            search.validate(),
            Err(ValidationError::InvalidCoordinates { .. })
        ));
    }

    #[rstest]
    fn unbounded_area_skips_coordinate_checks() {
        let search = FlatSearch::new(10, 1).within(SearchArea::new(f64::NAN, 95.0, 0.0));
        assert!(search.validate().is_ok());
    }

    #[rstest]
    #[case(3, 1, 0)]
    #[case(3, 2, 3)]
    #[case(25, 4, 75)]
    fn offset_skips_previous_pages(#[case] limit: u32, #[case] page: u32, #[case] expected: u64) {
        assert_eq!(FlatSearch::new(limit, page).offset(), expected);
    }

    #[rstest]
    fn cloned_search_keeps_filters_and_ordering() {
        let filter = Filter::new(LotColumn::Area, CompareOp::Ge, 15).expect("area filter");
        let order = OrderBy::new(LotColumn::Price, SortDirection::Asc);
        let search = FlatSearch::new(10, 1)
            .filter(filter.clone())
            .order_by(order);
        let copy = search.clone();
        assert_eq!(copy.filters, vec![filter]);
        assert_eq!(copy.order_by, order);
        assert_eq!(copy, search);
    }
}
