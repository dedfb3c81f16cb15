//! Typed values bound to statement parameters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::column::{Column, ColumnKind};
use crate::ValidationError;

/// A value for a filter or a column assignment.
///
/// Values are always bound as statement parameters; [`FieldValue::render`]
/// exists only for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL `NULL`.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Canonical textual form used in logs.
    ///
    /// Integers and booleans use their canonical form, reals use fixed
    /// notation with six decimals and empty text renders as a single space.
    ///
    /// # Examples
    ///
    /// ```
    /// use housing_core::query::FieldValue;
    ///
    /// assert_eq!(FieldValue::Real(15.5).render(), "15.500000");
    /// assert_eq!(FieldValue::Bool(true).render(), "true");
    /// assert_eq!(FieldValue::from("").render(), " ");
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".to_owned(),
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => format!("{value:.6}"),
            Self::Text(value) if value.is_empty() => " ".to_owned(),
            Self::Text(value) => value.clone(),
            Self::Timestamp(value) => value.to_rfc3339(),
        }
    }

    /// Parse a literal supplied as text for a column of type `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] when `raw` does not parse as
    /// the column type.
    pub fn parse_for<C: Column>(column: C, raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let parsed = match column.kind() {
            ColumnKind::Integer => trimmed.parse().ok().map(Self::Integer),
            ColumnKind::Real => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Self::Real),
            ColumnKind::Bool => parse_bool(trimmed).map(Self::Bool),
            ColumnKind::Text => Some(Self::Text(raw.to_owned())),
            ColumnKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|value| Self::Timestamp(value.with_timezone(&Utc))),
        };
        parsed.ok_or_else(|| invalid(column, raw.to_owned()))
    }

    /// Check the value against `column`, coercing where the conversion is
    /// lossless.
    ///
    /// Integers widen to reals and RFC 3339 text becomes a timestamp. `NULL`
    /// is accepted only for nullable columns.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for a type mismatch and
    /// [`ValidationError::ColumnNotNullable`] for `NULL` on a required column.
    pub fn coerce_for<C: Column>(self, column: C) -> Result<Self, ValidationError> {
        match (column.kind(), self) {
            (_, Self::Null) if column.is_nullable() => Ok(Self::Null),
            (_, Self::Null) => Err(ValidationError::ColumnNotNullable {
                column: column.name(),
            }),
            (ColumnKind::Integer, value @ Self::Integer(_))
            | (ColumnKind::Bool, value @ Self::Bool(_))
            | (ColumnKind::Text, value @ Self::Text(_))
            | (ColumnKind::Timestamp, value @ Self::Timestamp(_)) => Ok(value),
            (ColumnKind::Real, Self::Real(value)) if value.is_finite() => Ok(Self::Real(value)),
            (ColumnKind::Real, Self::Integer(value)) => Ok(Self::Real(widen(value))),
            (ColumnKind::Timestamp, Self::Text(text)) => Self::parse_for(column, &text),
            (_, other) => Err(invalid(column, other.render())),
        }
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "integers supplied for real columns are small measurements"
)]
fn widen(value: i64) -> f64 {
    value as f64
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn invalid<C: Column>(column: C, value: String) -> ValidationError {
    ValidationError::InvalidValue {
        column: column.name(),
        expected: column.kind(),
        value,
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
