//! Declarative TOML fixtures: tables, fields, rows and views.
//!
//! ```toml
//! [[tables]]
//! name = "Clients"
//! fields = [{ name = "Name", kind = "text" }]
//! rows = [{ Name = "Acme" }]
//!
//! [[tables]]
//! name = "Projects"
//! fields = [
//!     { name = "Name", kind = "text" },
//!     { name = "Client", kind = "link_row", link_table = "Clients" },
//! ]
//! rows = [{ Name = "Roof", Client = ["Acme"] }]
//!
//! [[views]]
//! table = "Projects"
//! name = "Shared"
//! type = "grid"
//! public = true
//! filters = [{ field = "Name", type = "contains", value = "roof" }]
//! sorts = [{ field = "Name", direction = "DESC" }]
//! ```
//!
//! Link cells name target rows by their primary field text, so a linked
//! table must be declared before the tables linking to it.

use crate::{NewView, ViewHandler};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tabula_core::{
    Actor, CellValue, Field, FieldId, FieldKind, FilterConjunction, RowId, SortDirection, TableId,
    ViewId,
};
use tabula_error::{ConfigError, ViewResult};
use tracing::{debug, info, instrument};

/// A table declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableFixture {
    /// Unique table name
    pub name: String,
    /// Fields in creation order; the first becomes primary
    #[serde(default)]
    pub fields: Vec<FieldFixture>,
    /// Rows keyed by field name
    #[serde(default)]
    pub rows: Vec<BTreeMap<String, Value>>,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldFixture {
    /// Field name, unique within its table
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
    /// Target table name for link row fields
    #[serde(default)]
    pub link_table: Option<String>,
    /// Move the field to the trash after rows are inserted
    #[serde(default)]
    pub trashed: bool,
}

/// A view declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewFixture {
    /// Owning table name
    pub table: String,
    /// View name, unique within the fixture
    pub name: String,
    /// View type tag
    #[serde(rename = "type")]
    pub view_type: String,
    /// Filter combination
    #[serde(default)]
    pub filter_type: Option<FilterConjunction>,
    /// Keep filters unapplied
    #[serde(default)]
    pub filters_disabled: bool,
    /// Share through a public slug
    #[serde(default)]
    pub public: bool,
    /// Type specific attributes
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Filters in creation order
    #[serde(default)]
    pub filters: Vec<FilterFixture>,
    /// Sorts in creation order
    #[serde(default)]
    pub sorts: Vec<SortFixture>,
    /// Field options keyed by field name
    #[serde(default)]
    pub field_options: BTreeMap<String, Map<String, Value>>,
}

/// A filter declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterFixture {
    /// Field name
    pub field: String,
    /// Filter type tag
    #[serde(rename = "type")]
    pub filter_type: String,
    /// Raw value
    #[serde(default)]
    pub value: String,
}

/// A sort declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortFixture {
    /// Field name
    pub field: String,
    /// Direction, ascending when omitted
    #[serde(default)]
    pub direction: SortDirection,
}

/// A complete fixture document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Fixture {
    /// Tables in declaration order
    #[serde(default)]
    pub tables: Vec<TableFixture>,
    /// Views in declaration order
    #[serde(default)]
    pub views: Vec<ViewFixture>,
}

/// Ids assigned while installing a fixture, keyed by declared names.
#[derive(Debug, Clone, Default, PartialEq, derive_getters::Getters)]
pub struct InstalledFixture {
    tables: BTreeMap<String, TableId>,
    fields: BTreeMap<(String, String), FieldId>,
    views: BTreeMap<String, ViewId>,
}

impl InstalledFixture {
    /// Id of a declared table.
    pub fn table(&self, name: &str) -> Option<TableId> {
        self.tables.get(name).copied()
    }

    /// Id of a declared field.
    pub fn field(&self, table: &str, name: &str) -> Option<FieldId> {
        self.fields
            .get(&(table.to_string(), name.to_string()))
            .copied()
    }

    /// Id of a declared view.
    pub fn view(&self, name: &str) -> Option<ViewId> {
        self.views.get(name).copied()
    }

    fn require_table(&self, name: &str) -> Result<TableId, ConfigError> {
        self.table(name)
            .ok_or_else(|| ConfigError::new(format!("unknown table '{}'", name)))
    }

    fn require_field(&self, table: &str, name: &str) -> Result<FieldId, ConfigError> {
        self.field(table, name)
            .ok_or_else(|| ConfigError::new(format!("unknown field '{}.{}'", table, name)))
    }
}

impl Fixture {
    /// Parse a fixture from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::new(format!("invalid fixture: {}", e)))
    }

    /// Load a fixture file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("cannot read fixture: {}", e)))?;
        Self::from_toml_str(&contents)
    }

    /// Create every declared table, field, row and view.
    ///
    /// # Errors
    ///
    /// `Config` for dangling names in the document; any view engine error
    /// raised while creating the declared views.
    #[instrument(skip_all, fields(tables = self.tables.len(), views = self.views.len()))]
    pub async fn install(
        &self,
        tables: &crate::InMemoryTables,
        handler: &ViewHandler,
        actor: &Actor,
    ) -> ViewResult<InstalledFixture> {
        let mut installed = InstalledFixture::default();

        for table in &self.tables {
            if installed.tables.contains_key(&table.name) {
                return Err(ConfigError::new(format!("duplicate table '{}'", table.name)).into());
            }
            let created = tables.create_table(&table.name).await;
            installed.tables.insert(table.name.clone(), *created.id());
        }

        let mut fields: HashMap<FieldId, Field> = HashMap::new();
        for table in &self.tables {
            let table_id = installed.require_table(&table.name)?;
            for field in &table.fields {
                let created = match (&field.kind, &field.link_table) {
                    (FieldKind::LinkRow, Some(target)) => {
                        let target = installed.require_table(target)?;
                        tables.create_link_field(table_id, &field.name, target).await?
                    }
                    (FieldKind::LinkRow, None) => {
                        return Err(ConfigError::new(format!(
                            "link field '{}.{}' needs link_table",
                            table.name, field.name
                        ))
                        .into());
                    }
                    (kind, _) => tables.create_field(table_id, &field.name, *kind).await?,
                };
                installed
                    .fields
                    .insert((table.name.clone(), field.name.clone()), *created.id());
                fields.insert(*created.id(), created);
            }
        }

        // Primary text of every inserted row, for resolving link cells.
        let mut row_names: HashMap<(TableId, String), RowId> = HashMap::new();
        for table in &self.tables {
            let table_id = installed.require_table(&table.name)?;
            for declared in &table.rows {
                let mut cells = Vec::with_capacity(declared.len());
                for (name, raw) in declared {
                    let field_id = installed.require_field(&table.name, name)?;
                    let field = fields
                        .get(&field_id)
                        .ok_or_else(|| ConfigError::new(format!("unknown field '{}'", name)))?;
                    cells.push((field_id, cell_value(field, raw, &row_names)?));
                }
                let row = tables.insert_row(table_id, cells).await?;
                if let Some(primary) = fields
                    .values()
                    .find(|f| *f.table_id() == table_id && *f.primary())
                {
                    let text = row.cell(*primary.id()).as_search_text();
                    row_names.insert((table_id, text), *row.id());
                }
            }
            for field in table.fields.iter().filter(|f| f.trashed) {
                let field_id = installed.require_field(&table.name, &field.name)?;
                tables.trash_field(field_id).await?;
            }
        }

        for view in &self.views {
            let table_id = installed.require_table(&view.table)?;
            let attrs = NewView {
                name: view.name.clone(),
                filter_type: view.filter_type,
                filters_disabled: Some(view.filters_disabled),
                public: Some(view.public),
                options: view.options.clone(),
            };
            let created = handler
                .create_view(actor, table_id, &view.view_type, attrs)
                .await?;
            let view_id = *created.id();
            for filter in &view.filters {
                let field_id = installed.require_field(&view.table, &filter.field)?;
                handler
                    .create_filter(actor, view_id, field_id, &filter.filter_type, filter.value.clone())
                    .await?;
            }
            for sort in &view.sorts {
                let field_id = installed.require_field(&view.table, &sort.field)?;
                handler
                    .create_sort(actor, view_id, field_id, sort.direction)
                    .await?;
            }
            if !view.field_options.is_empty() {
                let mut options = BTreeMap::new();
                for (name, attrs) in &view.field_options {
                    options.insert(installed.require_field(&view.table, name)?, attrs.clone());
                }
                handler
                    .update_field_options(actor, view_id, options)
                    .await?;
            }
            debug!(view = %view.name, %view_id, "Fixture view installed");
            installed.views.insert(view.name.clone(), view_id);
        }

        info!(
            tables = installed.tables.len(),
            views = installed.views.len(),
            "Fixture installed"
        );
        Ok(installed)
    }
}

/// Convert a declared cell to the stored representation of `field`.
fn cell_value(
    field: &Field,
    raw: &Value,
    row_names: &HashMap<(TableId, String), RowId>,
) -> Result<CellValue, ConfigError> {
    let invalid = || {
        ConfigError::new(format!(
            "invalid value {} for {} field '{}'",
            raw,
            field.kind(),
            field.name()
        ))
    };
    let value = match (field.kind(), raw) {
        (_, Value::Null) => CellValue::Null,
        (FieldKind::LinkRow, raw) => {
            let target = field.link_table().as_ref().copied().ok_or_else(invalid)?;
            let names: Vec<&Value> = match raw {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            let mut ids = Vec::with_capacity(names.len());
            for name in names {
                let name = name.as_str().ok_or_else(invalid)?;
                let id = row_names
                    .get(&(target, name.to_string()))
                    .copied()
                    .ok_or_else(|| ConfigError::new(format!("unknown linked row '{}'", name)))?;
                ids.push(id);
            }
            CellValue::Links(ids)
        }
        (FieldKind::Boolean, Value::Bool(b)) => CellValue::Boolean(*b),
        (FieldKind::Number, Value::Number(n)) => CellValue::Number(n.as_f64().ok_or_else(invalid)?),
        (_, Value::String(s)) => CellValue::Text(s.clone()),
        _ => return Err(invalid()),
    };
    Ok(value)
}
