//! Error types shared by the listing core.

use thiserror::Error;

use crate::query::ColumnKind;

/// Input rejected before any statement reaches storage.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// A filter, update or ordering named a column outside the allow-list.
    #[error("unknown column `{name}` for table {table}")]
    UnknownColumn {
        /// Table the column was looked up in.
        table: &'static str,
        /// Name supplied by the caller.
        name: String,
    },
    /// The column exists but is derived or immutable.
    #[error("column `{column}` cannot be updated")]
    ColumnNotUpdatable {
        /// Offending column.
        column: &'static str,
    },
    /// The update tried to clear a column that must hold a value.
    #[error("column `{column}` cannot be cleared")]
    ColumnNotNullable {
        /// Offending column.
        column: &'static str,
    },
    /// A value does not match the column type.
    #[error("invalid value {value:?} for column `{column}` (expected {expected})")]
    InvalidValue {
        /// Column the value was meant for.
        column: &'static str,
        /// Type the column stores.
        expected: ColumnKind,
        /// Rendered form of the rejected value.
        value: String,
    },
    /// A filter used an operator outside the supported set.
    #[error("unknown comparison operator `{operator}`")]
    UnknownOperator {
        /// Operator supplied by the caller.
        operator: String,
    },
    /// An ordering used a direction other than ascending or descending.
    #[error("unknown sort direction `{direction}`")]
    UnknownDirection {
        /// Direction supplied by the caller.
        direction: String,
    },
    /// A filter expression could not be split into column, operator and value.
    #[error("malformed filter `{input}` (expected column:operator:value)")]
    MalformedFilter {
        /// Raw filter expression.
        input: String,
    },
    /// Page size was zero.
    #[error("page size must be positive")]
    ZeroLimit,
    /// Page numbers start at one.
    #[error("page number must be at least 1")]
    ZeroPage,
    /// A coordinate pair is not a finite WGS84 position.
    #[error("invalid coordinates (longitude {longitude}, latitude {latitude})")]
    InvalidCoordinates {
        /// Longitude in degrees.
        longitude: f64,
        /// Latitude in degrees.
        latitude: f64,
    },
}

/// Reasons a call stopped before completing.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The caller cancelled the call.
    #[error("call was cancelled")]
    Cancelled,
    /// The call ran past its deadline.
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}
