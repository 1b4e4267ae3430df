//! Export documents offered for download: delimited text and a JSON shape
//! that round-trips through the native import path.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    codec,
    model::{Column, DynamicRow, ProjectTable, TableKind},
    text::sanitize_filename,
};

/// Delimited rendition: header row of column labels in display order, then
/// one line per row in table order.
pub fn to_delimited(table: &ProjectTable) -> Result<String> {
    if table.columns.is_empty() {
        return Ok(String::new());
    }
    let mut grid = Vec::with_capacity(table.rows.len() + 1);
    grid.push(table.columns.iter().map(|c| c.label.clone()).collect());
    for row in &table.rows {
        grid.push(
            table
                .columns
                .iter()
                .map(|column| row.value(column.id).to_string())
                .collect(),
        );
    }
    codec::encode(&grid)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: TableKind,
    columns: &'a [Column],
    rows: &'a [DynamicRow],
}

/// JSON rendition mirroring the native import shape
/// `{name, type, columns, rows}`.
pub fn to_json(table: &ProjectTable) -> Result<String> {
    let document = ExportDocument {
        name: &table.name,
        kind: table.kind,
        columns: &table.columns,
        rows: &table.rows,
    };
    serde_json::to_string_pretty(&document).context("Serializing export document")
}

/// Download filename for a table: sanitized name plus extension, with a
/// fallback stem for names that sanitize away entirely.
pub fn export_filename(name: &str, extension: &str) -> String {
    let stem = sanitize_filename(name);
    let stem = if stem.is_empty() { "table" } else { &stem };
    format!("{stem}.{extension}")
}
