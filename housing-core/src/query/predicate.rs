//! `WHERE` clause assembly for listing reads.

use super::{Filter, value::FieldValue};
use crate::{lot::RecordId, spatial::CellRange};

/// A parameterised `WHERE` clause.
///
/// `sql` holds only allow-listed column names, operators and `?`
/// placeholders; every caller-supplied value lives in `params`, in placeholder
/// order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    /// Conjunction of conditions, without the `WHERE` keyword.
    pub sql: String,
    /// Values bound to the placeholders in `sql`.
    pub params: Vec<FieldValue>,
}

impl WhereClause {
    /// Whether the clause has no conditions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// The clause prefixed with `WHERE`, or an empty string.
    #[must_use]
    pub fn to_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.sql)
        }
    }

    fn push(&mut self, condition: &str) {
        if !self.sql.is_empty() {
            self.sql.push_str(" AND ");
        }
        self.sql.push_str(condition);
    }
}

/// Builder for the listing predicate.
///
/// Conditions are emitted in a fixed order regardless of the order the
/// builder methods were called in: id, cell ranges, caller filters,
/// visibility, listing type.
///
/// # Examples
///
/// ```
/// use housing_core::query::{Filter, ListingPredicate};
///
/// # fn main() -> Result<(), housing_core::ValidationError> {
/// let clause = ListingPredicate::new(false)
///     .filter(Filter::parse("area", ">=", "15")?)
///     .owner(false)
///     .build();
/// assert_eq!(clause.sql, "area >= ? AND is_visible = ? AND is_constructor = ?");
/// assert_eq!(clause.params.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPredicate {
    id: Option<RecordId>,
    ranges: Vec<CellRange>,
    filters: Vec<Filter>,
    is_owner: bool,
    is_constructor: bool,
}

impl ListingPredicate {
    /// Predicate over templates (`true`) or advertisements (`false`).
    ///
    /// Callers start as non-owners, which restricts results to visible lots.
    #[must_use]
    pub const fn new(is_constructor: bool) -> Self {
        Self {
            id: None,
            ranges: Vec::new(),
            filters: Vec::new(),
            is_owner: false,
            is_constructor,
        }
    }

    /// Restrict to a single lot.
    #[must_use]
    pub const fn id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Restrict to lots whose stored cell falls in one of `ranges`.
    ///
    /// Each range binds two parameters. An empty set adds no condition.
    #[must_use]
    pub fn ranges(mut self, ranges: impl IntoIterator<Item = CellRange>) -> Self {
        self.ranges.extend(ranges);
        self
    }

    /// Add one caller filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add several caller filters.
    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Whether the caller owns the lots being read.
    #[must_use]
    pub const fn owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    /// Assemble the clause.
    #[must_use]
    pub fn build(&self) -> WhereClause {
        let mut clause = WhereClause::default();

        if let Some(id) = self.id {
            clause.push("id = ?");
            clause.params.push(FieldValue::Integer(id));
        }

        if !self.ranges.is_empty() {
            let mut condition = String::from("(");
            for (index, range) in self.ranges.iter().enumerate() {
                if index > 0 {
                    condition.push_str(" OR ");
                }
                condition.push_str("cell_id BETWEEN ? AND ?");
                clause
                    .params
                    .push(FieldValue::Integer(range.first.storage_key()));
                clause
                    .params
                    .push(FieldValue::Integer(range.last.storage_key()));
            }
            condition.push(')');
            clause.push(&condition);
        }

        for filter in &self.filters {
            clause.push(&format!("{} {} ?", filter.column(), filter.op()));
            clause.params.push(filter.value().clone());
        }

        if !self.is_owner {
            clause.push("is_visible = ?");
            clause.params.push(FieldValue::Bool(true));
        }

        clause.push("is_constructor = ?");
        clause.params.push(FieldValue::Bool(self.is_constructor));
        clause
    }
}
