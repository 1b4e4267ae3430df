//! Canonical data model: folders of tables of rows.
//!
//! All entities are value-like and identified by UUID; ids are generated at
//! creation and never reused. Timestamps are milliseconds since the Unix
//! epoch and strictly increase per entity across mutations, so derived-state
//! caches can key on `(id, updated_at)`.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::normalize_label;

pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Next timestamp for an entity whose previous stamp is `previous`.
///
/// Clamped so repeated mutations within one clock tick still advance the
/// stamp; `updated_at` is therefore strictly increasing per entity.
pub fn stamp(previous: i64) -> i64 {
    current_millis().max(previous + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Classic,
    Pairwise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: Uuid,
    pub label: String,
}

impl Column {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicRow {
    pub id: Uuid,
    /// Cell values keyed by column id. A missing key is equivalent to the
    /// empty string.
    #[serde(default)]
    pub values: BTreeMap<Uuid, String>,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DynamicRow {
    pub fn new(values: BTreeMap<Uuid, String>) -> Self {
        Self {
            id: new_id(),
            values,
            updated_at: current_millis(),
            comment: None,
        }
    }

    pub fn value(&self, column_id: Uuid) -> &str {
        self.values.get(&column_id).map(String::as_str).unwrap_or("")
    }

    pub fn set_value(&mut self, column_id: Uuid, value: impl Into<String>) {
        self.values.insert(column_id, value.into());
        self.updated_at = stamp(self.updated_at);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTable {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub rows: Vec<DynamicRow>,
    pub auto_id_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_id_column_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectTable {
    /// Creates an empty table. When `with_auto_id` is set, an identifier
    /// column is created up front and wired as the table's auto-id column;
    /// this wiring happens only here, never later.
    pub fn new(name: impl Into<String>, kind: TableKind, with_auto_id: bool) -> Self {
        let now = current_millis();
        let mut table = Self {
            id: new_id(),
            name: name.into(),
            kind,
            columns: Vec::new(),
            rows: Vec::new(),
            auto_id_enabled: with_auto_id,
            auto_id_column_id: None,
            created_at: now,
            updated_at: now,
        };
        if with_auto_id {
            let column = Column::new("ID");
            table.auto_id_column_id = Some(column.id);
            table.columns.push(column);
        }
        table
    }

    pub fn column(&self, id: Uuid) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: Uuid) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// Looks a column up by case/whitespace-insensitive label.
    pub fn column_by_label(&self, label: &str) -> Option<&Column> {
        let needle = normalize_label(label);
        self.columns
            .iter()
            .find(|c| normalize_label(&c.label) == needle)
    }

    /// The identifier column, when auto-id is enabled and the reference is
    /// still live.
    pub fn auto_id_column(&self) -> Option<Uuid> {
        if !self.auto_id_enabled {
            return None;
        }
        self.auto_id_column_id
            .filter(|id| self.columns.iter().any(|c| c.id == *id))
    }

    pub fn row(&self, id: Uuid) -> Option<&DynamicRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn row_mut(&mut self, id: Uuid) -> Option<&mut DynamicRow> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    /// Removes a column and eagerly prunes its cells from every row, keeping
    /// row value keys a subset of the live column set.
    pub fn remove_column(&mut self, id: Uuid) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c.id != id);
        if self.columns.len() == before {
            return false;
        }
        if self.auto_id_column_id == Some(id) {
            self.auto_id_column_id = None;
            self.auto_id_enabled = false;
        }
        for row in &mut self.rows {
            row.values.remove(&id);
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tables: Vec<ProjectTable>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = current_millis();
        Self {
            id: new_id(),
            name: name.into(),
            description: description.into(),
            tables: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn table(&self, id: Uuid) -> Option<&ProjectTable> {
        self.tables.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

/// Transient include/exclude constraint on one (column, value) pair. The
/// empty string denotes "is empty". Never persisted; scoped to the table
/// currently in view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilter {
    pub column_id: Uuid,
    pub value: String,
    pub mode: FilterMode,
}
