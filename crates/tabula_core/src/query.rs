//! Row query model composed by the view engine and executed by storage.

use crate::{CellValue, FieldId, Row, RowId, SortDirection, TableId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Comparison {
    /// Cell equals operand. A `false` boolean operand also matches null cells.
    Equal,
    /// Cell does not equal operand
    NotEqual,
    /// Text cell contains operand, case-insensitive
    Contains,
    /// Text cell does not contain operand, case-insensitive
    NotContains,
    /// Numeric cell strictly greater than operand
    GreaterThan,
    /// Numeric cell strictly less than operand
    LessThan,
    /// Cell is empty
    IsEmpty,
    /// Cell is not empty
    IsNotEmpty,
    /// Link cell references every row id in the operand
    LinksTo,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_new::new)]
pub struct Condition {
    /// Compared field
    field_id: FieldId,
    /// Comparison operator
    comparison: Comparison,
    /// Typed operand, already coerced for the field
    operand: CellValue,
}

impl Condition {
    /// Evaluate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.cell(self.field_id);
        match self.comparison {
            Comparison::Equal => values_equal(cell, &self.operand),
            Comparison::NotEqual => !values_equal(cell, &self.operand),
            Comparison::Contains => text_contains(cell, &self.operand),
            Comparison::NotContains => !text_contains(cell, &self.operand),
            Comparison::GreaterThan => match (cell, &self.operand) {
                (CellValue::Number(a), CellValue::Number(b)) => a > b,
                _ => false,
            },
            Comparison::LessThan => match (cell, &self.operand) {
                (CellValue::Number(a), CellValue::Number(b)) => a < b,
                _ => false,
            },
            Comparison::IsEmpty => cell.is_empty(),
            Comparison::IsNotEmpty => !cell.is_empty(),
            Comparison::LinksTo => match (cell, &self.operand) {
                (CellValue::Links(have), CellValue::Links(wanted)) => {
                    wanted.iter().all(|id| have.contains(id))
                }
                _ => false,
            },
        }
    }
}

fn values_equal(cell: &CellValue, operand: &CellValue) -> bool {
    match (cell, operand) {
        (CellValue::Null, CellValue::Boolean(false)) => true,
        (CellValue::Number(a), CellValue::Number(b)) => a == b,
        _ => cell == operand,
    }
}

fn text_contains(cell: &CellValue, operand: &CellValue) -> bool {
    match (cell, operand) {
        (CellValue::Text(haystack), CellValue::Text(needle)) => haystack
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        _ => false,
    }
}

/// Row predicate tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every row
    #[default]
    All,
    /// Field comparison
    Condition(Condition),
    /// Row id is one of the set
    RowIdIn(BTreeSet<RowId>),
    /// Every child matches
    And(Vec<Predicate>),
    /// At least one child matches
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction that keeps `All` out of the tree.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Evaluate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Condition(c) => c.matches(row),
            Predicate::RowIdIn(ids) => ids.contains(row.id()),
            Predicate::And(children) => children.iter().all(|p| p.matches(row)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(row)),
        }
    }
}

/// What an ordering key sorts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderTarget {
    /// A field's cell value
    Field(FieldId),
    /// The row identity
    RowId,
}

/// One ordering key of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters, derive_new::new)]
pub struct OrderKey {
    /// What is compared
    target: OrderTarget,
    /// Comparison sense
    direction: SortDirection,
}

impl OrderKey {
    /// Ascending row id, the final tie-break of every composed ordering.
    pub fn row_id_ascending() -> Self {
        Self::new(OrderTarget::RowId, SortDirection::Ascending)
    }

    /// Compare two rows by this key alone.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let ordering = match self.target {
            OrderTarget::Field(field_id) => a.cell(field_id).sort_cmp(b.cell(field_id)),
            OrderTarget::RowId => a.id().cmp(b.id()),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A composed query against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RowQuery {
    /// Queried table
    table_id: TableId,
    /// Row predicate
    predicate: Predicate,
    /// Ordering keys, most significant first
    ordering: Vec<OrderKey>,
    /// Free-text search across searchable fields
    search: Option<String>,
}

impl RowQuery {
    /// Unfiltered, unordered query over a table.
    pub fn table(table_id: TableId) -> Self {
        Self {
            table_id,
            predicate: Predicate::All,
            ordering: Vec::new(),
            search: None,
        }
    }

    /// Add a predicate with AND.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicate = std::mem::take(&mut self.predicate).and(predicate);
        self
    }

    /// Replace the ordering keys.
    pub fn order_by(mut self, ordering: Vec<OrderKey>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Set the search term. Blank terms clear it.
    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    /// Compare two rows by every ordering key in turn.
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        self.ordering
            .iter()
            .map(|key| key.compare(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i64) -> FieldId {
        FieldId::from(id)
    }

    #[test]
    fn test_and_drops_all() {
        let c = Predicate::Condition(Condition::new(field(1), Comparison::IsEmpty, CellValue::Null));
        assert_eq!(Predicate::All.and(c.clone()), c);
        assert_eq!(c.clone().and(Predicate::All), c);
        assert_eq!(Predicate::All.and(Predicate::All), Predicate::All);
    }

    #[test]
    fn test_boolean_false_matches_null() {
        let row = Row::new(RowId::from(1));
        let c = Condition::new(field(1), Comparison::Equal, CellValue::Boolean(false));
        assert!(c.matches(&row));
    }

    #[test]
    fn test_descending_reverses() {
        let a = Row::new(RowId::from(1)).with_cell(field(1), 1.0);
        let b = Row::new(RowId::from(2)).with_cell(field(1), 2.0);
        let key = OrderKey::new(OrderTarget::Field(field(1)), SortDirection::Descending);
        assert_eq!(key.compare(&a, &b), Ordering::Greater);
    }
}
