//! Built-in filter types.
//!
//! An empty value means "no restriction" for every filter that compares
//! against a value, so a freshly created filter does not hide rows until the
//! user types something.

use crate::FilterType;
use chrono::NaiveDate;
use tabula_core::{CellValue, Comparison, Condition, Field, FieldKind, Predicate, RowId};

const TEXTUAL: &[FieldKind] = &[FieldKind::Text, FieldKind::LongText];
const COMPARABLE: &[FieldKind] = &[
    FieldKind::Text,
    FieldKind::LongText,
    FieldKind::Number,
    FieldKind::Date,
];
const ALL_KINDS: &[FieldKind] = &[
    FieldKind::Text,
    FieldKind::LongText,
    FieldKind::Number,
    FieldKind::Boolean,
    FieldKind::Date,
    FieldKind::LinkRow,
    FieldKind::File,
];

/// Descriptors of the built-in filter types.
pub fn builtin_filter_types() -> Vec<FilterType> {
    vec![
        FilterType::new("equal", COMPARABLE.to_vec(), compile_equal),
        FilterType::new("not_equal", COMPARABLE.to_vec(), compile_not_equal),
        FilterType::new("contains", TEXTUAL.to_vec(), compile_contains),
        FilterType::new("contains_not", TEXTUAL.to_vec(), compile_contains_not),
        FilterType::new("higher_than", vec![FieldKind::Number], compile_higher_than),
        FilterType::new("lower_than", vec![FieldKind::Number], compile_lower_than),
        FilterType::new("empty", ALL_KINDS.to_vec(), compile_empty),
        FilterType::new("not_empty", ALL_KINDS.to_vec(), compile_not_empty),
        FilterType::new("boolean", vec![FieldKind::Boolean], compile_boolean),
        FilterType::new("link_row_has", vec![FieldKind::LinkRow], compile_link_row_has),
        FilterType::new("date_equal", vec![FieldKind::Date], compile_date_equal),
    ]
}

fn condition(field: &Field, comparison: Comparison, operand: CellValue) -> Predicate {
    Predicate::Condition(Condition::new(*field.id(), comparison, operand))
}

/// Typed operand for an equality style comparison.
fn operand_for(field: &Field, raw: &str) -> Option<CellValue> {
    match field.kind() {
        FieldKind::Number => raw.trim().parse::<f64>().ok().map(CellValue::Number),
        FieldKind::Date => parse_date(raw).map(CellValue::Text),
        _ => Some(CellValue::Text(raw.to_string())),
    }
}

fn parse_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn compare_with(field: &Field, raw: &str, comparison: Comparison) -> Option<Predicate> {
    if raw.is_empty() {
        return Some(Predicate::All);
    }
    operand_for(field, raw).map(|operand| condition(field, comparison, operand))
}

fn compile_equal(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::Equal)
}

fn compile_not_equal(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::NotEqual)
}

fn compile_contains(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::Contains)
}

fn compile_contains_not(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::NotContains)
}

fn compile_higher_than(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::GreaterThan)
}

fn compile_lower_than(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::LessThan)
}

fn compile_empty(field: &Field, _raw: &str) -> Option<Predicate> {
    Some(condition(field, Comparison::IsEmpty, CellValue::Null))
}

fn compile_not_empty(field: &Field, _raw: &str) -> Option<Predicate> {
    Some(condition(field, Comparison::IsNotEmpty, CellValue::Null))
}

fn compile_boolean(field: &Field, raw: &str) -> Option<Predicate> {
    let value = match raw.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => false,
        "1" | "true" | "yes" | "on" => true,
        _ => return None,
    };
    Some(condition(field, Comparison::Equal, CellValue::Boolean(value)))
}

fn compile_link_row_has(field: &Field, raw: &str) -> Option<Predicate> {
    if raw.trim().is_empty() {
        return Some(Predicate::All);
    }
    let id = raw.trim().parse::<i64>().ok()?;
    Some(condition(
        field,
        Comparison::LinksTo,
        CellValue::Links(vec![RowId::from(id)]),
    ))
}

fn compile_date_equal(field: &Field, raw: &str) -> Option<Predicate> {
    compare_with(field, raw, Comparison::Equal)
}
