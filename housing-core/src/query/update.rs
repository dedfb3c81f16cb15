//! Sparse partial updates.
//!
//! A [`FieldMap`] collects `column = value` assignments for one table. Each
//! entry is validated when it is added, so a map that exists is always safe to
//! turn into an `UPDATE ... SET` fragment.

use std::{collections::BTreeMap, fmt, marker::PhantomData};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use super::{column::Column, value::FieldValue};
use crate::ValidationError;

/// Validated column assignments for a partial update.
///
/// Empty text clears a nullable column and is rejected for a required one.
///
/// # Examples
///
/// ```
/// use housing_core::query::{FieldMap, FieldValue, LotColumn};
///
/// # fn main() -> Result<(), housing_core::ValidationError> {
/// let fields = FieldMap::new()
///     .with(LotColumn::Price, 42_000)?
///     .with(LotColumn::Description, "")?;
/// assert_eq!(fields.get(LotColumn::Description), Some(&FieldValue::Null));
///
/// let assignments = fields.assignments();
/// assert_eq!(assignments.sql, "price = ?, description = ?");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<C: Column> {
    entries: BTreeMap<C, FieldValue>,
}

impl<C: Column> Default for FieldMap<C> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<C: Column> FieldMap<C> {
    /// An empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Assign `value` to `column`, replacing any earlier assignment.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ColumnNotUpdatable`] for derived columns,
    /// [`ValidationError::ColumnNotNullable`] when clearing a required column
    /// and [`ValidationError::InvalidValue`] for a type mismatch.
    pub fn set(&mut self, column: C, value: impl Into<FieldValue>) -> Result<(), ValidationError> {
        if !column.is_updatable() {
            return Err(ValidationError::ColumnNotUpdatable {
                column: column.name(),
            });
        }
        let normalised = match value.into() {
            FieldValue::Text(text) if text.is_empty() => FieldValue::Null,
            other => other,
        };
        let coerced = normalised.coerce_for(column)?;
        self.entries.insert(column, coerced);
        Ok(())
    }

    /// Builder form of [`FieldMap::set`].
    ///
    /// # Errors
    ///
    /// See [`FieldMap::set`].
    pub fn with(mut self, column: C, value: impl Into<FieldValue>) -> Result<Self, ValidationError> {
        self.set(column, value)?;
        Ok(self)
    }

    /// Build a map from `(name, value)` pairs supplied by the API layer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownColumn`] for a name outside the
    /// allow-list, or any error raised by [`FieldMap::set`].
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, ValidationError>
    where
        K: AsRef<str>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.set(C::parse(name.as_ref())?, value)?;
        }
        Ok(map)
    }

    /// Whether the map assigns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of assigned columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value assigned to `column`.
    #[must_use]
    pub fn get(&self, column: C) -> Option<&FieldValue> {
        self.entries.get(&column)
    }

    /// Whether `column` is assigned.
    #[must_use]
    pub fn contains(&self, column: C) -> bool {
        self.entries.contains_key(&column)
    }

    /// Assignments in column declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (C, &FieldValue)> {
        self.entries.iter().map(|(column, value)| (*column, value))
    }

    /// The `SET` fragment and its parameters.
    #[must_use]
    pub fn assignments(&self) -> Assignments {
        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.entries.len());
        for (column, value) in self.iter() {
            if !sql.is_empty() {
                sql.push_str(", ");
            }
            sql.push_str(column.name());
            sql.push_str(" = ?");
            params.push(value.clone());
        }
        Assignments { sql, params }
    }

    /// `column=value` pairs rendered for logs.
    #[must_use]
    pub fn rendered(&self) -> String {
        self.iter()
            .map(|(column, value)| format!("{}={}", column.name(), value.render()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The `SET` fragment of an `UPDATE` statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignments {
    /// Comma-separated `column = ?` pairs, without the `SET` keyword.
    pub sql: String,
    /// Values bound to the placeholders in `sql`.
    pub params: Vec<FieldValue>,
}

impl<C: Column> Serialize for FieldMap<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column.name(), value)?;
        }
        map.end()
    }
}

impl<'de, C: Column> Deserialize<'de> for FieldMap<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldMapVisitor(PhantomData))
    }
}

struct FieldMapVisitor<C>(PhantomData<C>);

impl<'de, C: Column> Visitor<'de> for FieldMapVisitor<C> {
    type Value = FieldMap<C>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "a map of {} column names to values", C::TABLE)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut fields = FieldMap::new();
        while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
            let column = C::parse(&name).map_err(serde::de::Error::custom)?;
            fields.set(column, value).map_err(serde::de::Error::custom)?;
        }
        Ok(fields)
    }
}
