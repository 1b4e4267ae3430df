//! Import reconciliation: merging externally sourced columns and rows into
//! an existing table.
//!
//! Two payload shapes are recognized by structure, never by a format tag:
//!
//! - **Native**: an object with array-valued `columns` (`{id, label}`) and
//!   `rows` (`{values, ...}`), as produced by [`crate::export::to_json`].
//!   Columns match existing columns by exact id; unmatched columns are
//!   appended. Imported rows are always re-identified so they can never
//!   collide with existing rows.
//! - **Generic**: any other JSON document, normalized to a list of objects
//!   (`data` array, top-level array, or a singleton). Columns are matched by
//!   normalized label so `Name` and `name` land in one column. Within each
//!   source object, the first array-valued field (in document order) fans
//!   out into one row per element.
//!
//! Classification and validation happen before any mutation, so a failed
//! import never leaves a partial merge behind. Rows from either shape are
//! appended after existing rows; the manual creation path prepends instead,
//! and that asymmetry is intentional.

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    codec,
    generate::next_auto_id,
    model::{Column, DynamicRow, ProjectTable},
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload contains no importable rows")]
    Empty,
    #[error("payload defines no usable columns")]
    NoColumns,
}

/// Outcome of a successful import, reported to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_added: usize,
    pub columns_added: usize,
}

/// An object's fields as an explicitly ordered list of pairs. Document
/// order decides which array-valued field fans out, so the order is kept
/// explicit instead of living in incidental map iteration.
pub type GenericRecord = Vec<(String, Value)>;

#[derive(Debug, Clone)]
pub struct NativeColumn {
    pub id: Uuid,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct NativeRow {
    pub values: Vec<(Uuid, String)>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NativeDocument {
    pub columns: Vec<NativeColumn>,
    pub rows: Vec<NativeRow>,
}

/// Classified import payload. Once a payload classifies successfully,
/// applying it cannot fail.
#[derive(Debug, Clone)]
pub enum ImportPayload {
    Native(NativeDocument),
    Generic(Vec<GenericRecord>),
}

/// Parses and classifies a JSON import document.
pub fn classify_json(text: &str) -> Result<ImportPayload, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(map) if is_native_shape(&map) => {
            Ok(ImportPayload::Native(parse_native(map)?))
        }
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                generic_from_items(items.clone())
            } else {
                generic_from_items(vec![Value::Object(map)])
            }
        }
        Value::Array(items) => generic_from_items(items),
        other => generic_from_items(vec![other]),
    }
}

/// Converts delimited text into a generic payload: the first decoded row is
/// the header, every later row becomes one record keyed by header label.
pub fn classify_delimited(text: &str) -> Result<ImportPayload, ImportError> {
    let grid = codec::decode(text);
    let Some((header, body)) = grid.split_first() else {
        return Err(ImportError::Empty);
    };
    let records: Vec<GenericRecord> = body
        .iter()
        .map(|row| {
            header
                .iter()
                .enumerate()
                .filter(|(_, label)| !label.trim().is_empty())
                .map(|(index, label)| {
                    let cell = row
                        .get(index)
                        .map(|cell| Value::String(cell.clone()))
                        .unwrap_or(Value::Null);
                    (label.clone(), cell)
                })
                .collect()
        })
        .filter(|record: &GenericRecord| !record.is_empty())
        .collect();
    if records.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(ImportPayload::Generic(records))
}

/// Merges a classified payload into the table. Infallible by construction;
/// returns how many rows and columns were added.
pub fn apply(table: &mut ProjectTable, payload: ImportPayload) -> ImportSummary {
    match payload {
        ImportPayload::Native(doc) => apply_native(table, doc),
        ImportPayload::Generic(records) => apply_generic(table, records),
    }
}

/// Parse-and-merge convenience for a JSON document.
pub fn import_json(table: &mut ProjectTable, text: &str) -> Result<ImportSummary, ImportError> {
    let payload = classify_json(text)?;
    Ok(apply(table, payload))
}

/// Parse-and-merge convenience for delimited text.
pub fn import_delimited(
    table: &mut ProjectTable,
    text: &str,
) -> Result<ImportSummary, ImportError> {
    let payload = classify_delimited(text)?;
    Ok(apply(table, payload))
}

fn is_native_shape(map: &serde_json::Map<String, Value>) -> bool {
    matches!(map.get("columns"), Some(Value::Array(_)))
        && matches!(map.get("rows"), Some(Value::Array(_)))
}

fn parse_native(mut map: serde_json::Map<String, Value>) -> Result<NativeDocument, ImportError> {
    let Some(Value::Array(raw_columns)) = map.remove("columns") else {
        return Err(ImportError::NoColumns);
    };
    let columns: Vec<NativeColumn> = raw_columns
        .into_iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let id = object.get("id")?.as_str()?.parse().ok()?;
            let label = object.get("label")?.as_str()?.to_string();
            Some(NativeColumn { id, label })
        })
        .collect();
    if columns.is_empty() {
        return Err(ImportError::NoColumns);
    }

    let raw_rows = match map.remove("rows") {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    };
    let rows = raw_rows
        .into_iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let values = object
                .get("values")?
                .as_object()?
                .iter()
                .filter_map(|(key, value)| {
                    let column_id: Uuid = key.parse().ok()?;
                    Some((column_id, stringify(value)))
                })
                .collect();
            let comment = object
                .get("comment")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(NativeRow { values, comment })
        })
        .collect();
    Ok(NativeDocument { columns, rows })
}

fn generic_from_items(items: Vec<Value>) -> Result<ImportPayload, ImportError> {
    let records: Vec<GenericRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        })
        .collect();
    if records.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(ImportPayload::Generic(records))
}

fn apply_native(table: &mut ProjectTable, doc: NativeDocument) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for incoming in doc.columns {
        if table.column(incoming.id).is_none() {
            table.columns.push(Column {
                id: incoming.id,
                label: incoming.label,
            });
            summary.columns_added += 1;
        }
    }

    let auto_column = table.auto_id_column();
    let mut next = next_auto_id(table);
    for entry in doc.rows {
        let mut values: std::collections::BTreeMap<Uuid, String> = entry
            .values
            .into_iter()
            .filter(|(column_id, _)| table.column(*column_id).is_some())
            .collect();
        if let Some(column_id) = auto_column {
            values.insert(column_id, next.to_string());
            next += 1;
        }
        let mut row = DynamicRow::new(values);
        row.comment = entry.comment;
        table.rows.push(row);
        summary.rows_added += 1;
    }
    summary
}

fn apply_generic(table: &mut ProjectTable, records: Vec<GenericRecord>) -> ImportSummary {
    let mut summary = ImportSummary::default();
    let auto_column = table.auto_id_column();
    let mut next = next_auto_id(table);

    for record in records {
        for expanded in expand_record(record) {
            let mut values = std::collections::BTreeMap::new();
            for (key, value) in expanded {
                let column_id = ensure_column(table, &key, &mut summary.columns_added);
                values.insert(column_id, stringify(&value));
            }
            if let Some(column_id) = auto_column {
                values.insert(column_id, next.to_string());
                next += 1;
            }
            table.rows.push(DynamicRow::new(values));
            summary.rows_added += 1;
        }
    }
    summary
}

/// Fans a record out on its first array-valued field: one output record per
/// element, other fields copied unchanged. Applied independently per source
/// object; later array-valued fields are kept verbatim.
fn expand_record(record: GenericRecord) -> Vec<GenericRecord> {
    let Some(position) = record.iter().position(|(_, value)| value.is_array()) else {
        return vec![record];
    };
    let Value::Array(elements) = record[position].1.clone() else {
        return vec![record];
    };
    elements
        .into_iter()
        .map(|element| {
            let mut copy = record.clone();
            copy[position].1 = element;
            copy
        })
        .collect()
}

fn ensure_column(table: &mut ProjectTable, label: &str, added: &mut usize) -> Uuid {
    if let Some(column) = table.column_by_label(label) {
        return column.id;
    }
    let column = Column::new(label);
    let id = column.id;
    table.columns.push(column);
    *added += 1;
    id
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
