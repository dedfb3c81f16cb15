//! Caller-supplied filters and orderings over listing columns.

use std::{fmt, str::FromStr};

use super::{
    column::{Column, LotColumn},
    value::FieldValue,
};
use crate::ValidationError;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl FromStr for CompareOp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(ValidationError::UnknownOperator {
                operator: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single `column <op> value` condition on the `flats` table.
///
/// # Examples
///
/// ```
/// use housing_core::query::{CompareOp, Filter, LotColumn};
///
/// # fn main() -> Result<(), housing_core::ValidationError> {
/// let filter = Filter::parse("area", ">=", "15")?;
/// assert_eq!(filter.column(), LotColumn::Area);
/// assert_eq!(filter.op(), CompareOp::Ge);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: LotColumn,
    op: CompareOp,
    value: FieldValue,
}

impl Filter {
    /// Build a filter, type-checking `value` against `column`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] when the value does not fit the
    /// column; `NULL` is never a valid filter value.
    pub fn new(
        column: LotColumn,
        op: CompareOp,
        value: impl Into<FieldValue>,
    ) -> Result<Self, ValidationError> {
        let coerced = match value.into() {
            FieldValue::Null => {
                return Err(ValidationError::InvalidValue {
                    column: column.name(),
                    expected: column.kind(),
                    value: FieldValue::Null.render(),
                });
            }
            other => other.coerce_for(column)?,
        };
        Ok(Self {
            column,
            op,
            value: coerced,
        })
    }

    /// Build a filter from the textual triple used by the API layer.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an unknown column or operator or a
    /// literal that does not parse as the column type.
    pub fn parse(column: &str, op: &str, literal: &str) -> Result<Self, ValidationError> {
        let resolved = LotColumn::parse(column.trim())?;
        let value = FieldValue::parse_for(resolved, literal)?;
        Self::new(resolved, op.parse()?, value)
    }

    /// Filtered column.
    #[must_use]
    pub const fn column(&self) -> LotColumn {
        self.column
    }

    /// Comparison operator.
    #[must_use]
    pub const fn op(&self) -> CompareOp {
        self.op
    }

    /// Bound value.
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl FromStr for Filter {
    type Err = ValidationError;

    /// Parse `column:operator:value`, e.g. `area:>=:15`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(column), Some(op), Some(literal)) if !column.is_empty() => {
                Self::parse(column, op, literal)
            }
            _ => Err(ValidationError::MalformedFilter {
                input: s.to_owned(),
            }),
        }
    }
}

/// Sort direction for an [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for the direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::UnknownDirection {
                direction: s.to_owned(),
            }),
        }
    }
}

/// Ordering of a listing page.
///
/// Rows with equal sort keys are ordered by ascending id so paging is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Sort column.
    pub column: LotColumn,
    /// Sort direction.
    pub direction: SortDirection,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self {
            column: LotColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl OrderBy {
    /// Ordering by `column` in `direction`.
    #[must_use]
    pub const fn new(column: LotColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Resolve the `(column, direction)` pair supplied by the API layer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownColumn`] or
    /// [`ValidationError::UnknownDirection`].
    pub fn parse(column: &str, direction: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            column: LotColumn::parse(column.trim())?,
            direction: direction.parse()?,
        })
    }

    /// `ORDER BY` clause with an id tie-break.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let tie_break = match self.column {
            LotColumn::Id => String::new(),
            _ => ", id ASC".to_owned(),
        };
        format!(
            "ORDER BY {} {}{tie_break}",
            self.column.name(),
            self.direction.as_sql()
        )
    }
}
