//! Built-in view types.

use crate::{AttrKind, AttrSchema, AttrSpec, FieldOptionsShape, ViewType};
use serde_json::{Map, Value, json};
use tabula_core::Field;

/// Tag of the spreadsheet-like view.
pub const GRID: &str = "grid";
/// Tag of the card view.
pub const GALLERY: &str = "gallery";
/// Tag of the data-entry form view.
pub const FORM: &str = "form";

const DEFAULT_ORDER: i64 = 32767;

/// Descriptors of the built-in view types.
pub fn builtin_view_types() -> Vec<ViewType> {
    vec![grid(), gallery(), form()]
}

fn order_spec() -> AttrSpec {
    AttrSpec::new(
        "order",
        AttrKind::Integer {
            min: 0,
            max: DEFAULT_ORDER,
        },
        json!(DEFAULT_ORDER),
    )
}

fn grid() -> ViewType {
    let field_options = FieldOptionsShape::new(
        AttrSchema::new(vec![
            AttrSpec::new(
                "width",
                AttrKind::Integer { min: 10, max: 5000 },
                json!(200),
            ),
            AttrSpec::new("hidden", AttrKind::Boolean, json!(false)),
            order_spec(),
            AttrSpec::new(
                "aggregation",
                AttrKind::Choice(&[
                    "",
                    "empty_count",
                    "not_empty_count",
                    "unique_count",
                    "min",
                    "max",
                    "sum",
                    "average",
                ]),
                json!(""),
            ),
        ]),
        "hidden",
        false,
        "order",
    );

    ViewType::new(GRID)
        .with_can_filter(true)
        .with_can_sort(true)
        .with_can_share(true)
        .with_restrict_link_row_public_view_sharing(true)
        .with_field_options(field_options)
        .with_view_options(AttrSchema::new(vec![AttrSpec::new(
            "row_identifier_type",
            AttrKind::Choice(&["id", "count"]),
            json!("id"),
        )]))
}

fn show_primary(field: &Field, attrs: &mut Map<String, Value>) {
    if *field.primary() {
        attrs.insert("hidden".to_string(), Value::Bool(false));
    }
}

fn gallery() -> ViewType {
    let field_options = FieldOptionsShape::new(
        AttrSchema::new(vec![
            AttrSpec::new("hidden", AttrKind::Boolean, json!(true)),
            order_spec(),
        ]),
        "hidden",
        false,
        "order",
    )
    .with_field_defaults(show_primary);

    ViewType::new(GALLERY)
        .with_can_filter(true)
        .with_can_sort(true)
        .with_can_share(true)
        .with_restrict_link_row_public_view_sharing(true)
        .with_field_options(field_options)
        .with_view_options(AttrSchema::new(vec![AttrSpec::new(
            "card_size",
            AttrKind::Choice(&["small", "medium", "large"]),
            json!("medium"),
        )]))
}

fn form() -> ViewType {
    let field_options = FieldOptionsShape::new(
        AttrSchema::new(vec![
            AttrSpec::new("enabled", AttrKind::Boolean, json!(false)),
            AttrSpec::new("required", AttrKind::Boolean, json!(true)),
            AttrSpec::new("name", AttrKind::Text { max_len: 255 }, json!("")),
            AttrSpec::new(
                "description",
                AttrKind::Text { max_len: 10_000 },
                json!(""),
            ),
            order_spec(),
        ]),
        "enabled",
        true,
        "order",
    );

    // Forms let visitors pick any row of a linked table.
    ViewType::new(FORM)
        .with_can_share(true)
        .with_field_options(field_options)
        .with_view_options(AttrSchema::new(vec![
            AttrSpec::new("title", AttrKind::Text { max_len: 255 }, json!("")),
            AttrSpec::new(
                "description",
                AttrKind::Text { max_len: 10_000 },
                json!(""),
            ),
            AttrSpec::new("submit_text", AttrKind::Text { max_len: 255 }, json!("Submit")),
            AttrSpec::new(
                "submit_action",
                AttrKind::Choice(&["MESSAGE", "REDIRECT"]),
                json!("MESSAGE"),
            ),
            AttrSpec::new(
                "submit_action_message",
                AttrKind::Text { max_len: 10_000 },
                json!(""),
            ),
            AttrSpec::new(
                "submit_action_redirect_url",
                AttrKind::Text { max_len: 2000 },
                json!(""),
            ),
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FieldId, FieldKind, TableId};

    #[test]
    fn test_gallery_shows_primary_by_default() {
        let shape = gallery().field_options().clone().unwrap();
        let primary = Field::new(FieldId::from(1), TableId::from(1), "Name", FieldKind::Text)
            .with_primary(true);
        let other = Field::new(FieldId::from(2), TableId::from(1), "Notes", FieldKind::Text);
        assert!(shape.is_visible(&shape.defaults_for(&primary)));
        assert!(!shape.is_visible(&shape.defaults_for(&other)));
    }

    #[test]
    fn test_form_cannot_filter_or_sort() {
        let form = form();
        assert!(form.require_filtering().is_err());
        assert!(form.require_sorting().is_err());
        assert!(form.require_sharing().is_ok());
    }
}
