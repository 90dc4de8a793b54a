//! Rows and cell values.

use crate::{FieldId, RowId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Value stored in a single cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value
    #[default]
    Null,
    /// True/false
    Boolean(bool),
    /// Numeric value
    Number(f64),
    /// Text, also used for dates
    Text(String),
    /// Linked row ids
    Links(Vec<RowId>),
}

impl CellValue {
    /// Whether the cell counts as empty for `empty`/`not_empty` filters.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Boolean(b) => !b,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Links(ids) => ids.is_empty(),
        }
    }

    /// Text rendering used by search and link row lookups.
    pub fn as_search_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Links(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Boolean(_) => 1,
            CellValue::Number(_) => 2,
            CellValue::Text(_) => 3,
            CellValue::Links(_) => 4,
        }
    }

    /// Total order used for sorting. Nulls come first.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (CellValue::Links(a), CellValue::Links(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<Vec<RowId>> for CellValue {
    fn from(value: Vec<RowId>) -> Self {
        CellValue::Links(value)
    }
}

/// A row of a table.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_new::new,
)]
pub struct Row {
    /// Row id
    id: RowId,
    /// Cell values keyed by field
    #[new(default)]
    #[serde(default)]
    cells: HashMap<FieldId, CellValue>,
}

impl Row {
    /// Set a cell, returning the row for chaining.
    pub fn with_cell(mut self, field_id: FieldId, value: impl Into<CellValue>) -> Self {
        self.cells.insert(field_id, value.into());
        self
    }

    /// Drop a cell, e.g. after its field was deleted.
    pub fn remove_cell(&mut self, field_id: FieldId) -> Option<CellValue> {
        self.cells.remove(&field_id)
    }

    /// Cell value for a field, `Null` when absent.
    pub fn cell(&self, field_id: FieldId) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.cells.get(&field_id).unwrap_or(&NULL)
    }
}
