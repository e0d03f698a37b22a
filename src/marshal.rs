//! Result rows and record construction
//!
//! A [`Row`] is one result row as column name to [`Value`]. Records are built
//! from rows through [`FromRow`]; the mapper never looks at field names
//! itself.

use crate::error::Result;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Rows from one statement share their column list.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Value of the named column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Row as a JSON object keyed by column name
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(column, value)| Ok((column.to_string(), serde_json::to_value(value)?)))
            .collect::<Result<_>>()?;
        Ok(serde_json::Value::Object(map))
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }
}

/// Construct a record from a result row
///
/// Implement it by hand with [`Row::get`], or for serde types delegate to
/// [`deserialize_row`]:
///
/// ```
/// use rust_sqlmapper::{deserialize_row, FromRow, Result, Row};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Developer {
///     name: String,
///     age: i64,
/// }
///
/// impl FromRow for Developer {
///     fn from_row(row: &Row) -> Result<Self> {
///         deserialize_row(row)
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}

impl FromRow for HashMap<String, Value> {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone().into_map())
    }
}

/// Deserialize a row into any serde type, columns acting as field names.
pub fn deserialize_row<T: serde::de::DeserializeOwned>(row: &Row) -> Result<T> {
    let json = row.to_json()?;
    Ok(serde_json::from_value(json)?)
}

/// First row as a record, `None` when there are no rows.
pub fn first_record<T: FromRow>(rows: &[Row]) -> Result<Option<T>> {
    rows.first().map(T::from_row).transpose()
}

/// Every row as a record, in row order.
pub fn records<T: FromRow>(rows: &[Row]) -> Result<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
