//! Table and field model provided by the storage layer.

use crate::{FieldId, TableId};
use serde::{Deserialize, Serialize};

/// A table holding rows.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_new::new,
)]
pub struct Table {
    /// Table id
    id: TableId,
    /// Display name
    #[new(into)]
    name: String,
}

/// Type category of a field, used for filter and sort compatibility.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    /// Single line text
    Text,
    /// Multi line text
    LongText,
    /// Numeric value
    Number,
    /// True/false
    Boolean,
    /// ISO date stored as `YYYY-MM-DD` text
    Date,
    /// References to rows of another table
    LinkRow,
    /// File attachments
    File,
}

impl FieldKind {
    /// Whether rows can be ordered by this kind of field.
    pub fn can_order_by(&self) -> bool {
        !matches!(self, FieldKind::LinkRow | FieldKind::File)
    }

    /// Whether free-text search looks at this kind of field.
    pub fn is_searchable(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::LongText | FieldKind::Number | FieldKind::Date
        )
    }
}

/// A field (column) of a table.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_new::new,
)]
#[setters(prefix = "with_")]
pub struct Field {
    /// Field id
    #[setters(skip)]
    id: FieldId,
    /// Owning table
    #[setters(skip)]
    table_id: TableId,
    /// Display name
    #[new(into)]
    #[setters(skip)]
    name: String,
    /// Type category
    #[setters(skip)]
    kind: FieldKind,
    /// Whether this is the table's primary field
    #[new(default)]
    #[serde(default)]
    primary: bool,
    /// Target table for link row fields
    #[new(default)]
    #[serde(default)]
    #[setters(strip_option)]
    link_table: Option<TableId>,
    /// Field sits in the trash and may be restored
    #[new(default)]
    #[serde(default)]
    trashed: bool,
}

impl Field {
    /// Whether this field links to another table.
    pub fn is_link_row(&self) -> bool {
        self.kind == FieldKind::LinkRow
    }
}
