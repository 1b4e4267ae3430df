//! Delimited text ⇄ grid conversion.
//!
//! Decoding is a single-pass scanner with a quote-toggle state. The rules,
//! in priority order per character:
//!
//! 1. a doubled quote inside a quoted cell emits one literal quote;
//! 2. any other quote toggles the quoted state;
//! 3. a comma outside quotes ends the cell;
//! 4. a newline outside quotes ends the cell and the row;
//! 5. a carriage return is dropped;
//! 6. anything else is appended verbatim.
//!
//! Rows whose every cell is blank after trimming are dropped, which
//! tolerates trailing blank lines in pasted text. Encoding goes through the
//! `csv` writer with [`QuoteStyle::Necessary`], so a cell is quote-wrapped
//! exactly when it contains a comma, quote, or newline.

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};

pub const DELIMITER: char = ',';

/// Parses delimited text into a grid of cell strings.
pub fn decode(text: &str) -> Vec<Vec<String>> {
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                cell.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == DELIMITER && !in_quotes {
            row.push(std::mem::take(&mut cell));
        } else if ch == '\n' && !in_quotes {
            row.push(std::mem::take(&mut cell));
            grid.push(std::mem::take(&mut row));
        } else if ch == '\r' {
            // dropped, including inside quotes
        } else {
            cell.push(ch);
        }
    }
    row.push(cell);
    grid.push(row);

    grid.retain(|cells| cells.iter().any(|cell| !cell.trim().is_empty()));
    grid
}

/// Renders a grid back to delimited text. Ragged rows are allowed; rows are
/// joined with `\n` and there is no trailing newline.
pub fn encode(grid: &[Vec<String>]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(Vec::new());
    for row in grid {
        writer.write_record(row).context("Encoding grid row")?;
    }
    let bytes = writer
        .into_inner()
        .context("Flushing encoded grid")?;
    let mut text = String::from_utf8(bytes).context("Encoded grid is not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
