// src/csv/decode.rs
use std::{collections::HashMap, mem};

use tracing::trace;

use super::keys::normalize_key;

/// One decoded data row, keyed by normalized header.
pub type CsvRow = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRecords {
    /// Header cells as written in the file, trimmed.
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl CsvRecords {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Normalized keys in header order. Colliding headers appear once per column.
    pub fn keys(&self) -> Vec<String> {
        self.headers.iter().map(|h| normalize_key(h)).collect()
    }
}

/// Trims like a browser `String.prototype.trim`, which also drops a stray BOM.
pub(crate) fn trim_cell(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Turns uploaded file bytes into text the way a browser `File.text()` does:
/// UTF-8 with replacement characters, leading BOM removed.
pub fn text_from_bytes(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Decodes comma-separated text into a header list and one record per
/// non-blank data row.
///
/// Never fails. Quoted fields may hold commas, newlines and `""` escapes; an
/// unterminated quote swallows the rest of the input into the open field.
/// Rows whose cells are all blank are dropped, short rows are padded with
/// empty strings, surplus cells are ignored, and headers that normalize to the
/// same key resolve to the rightmost column.
pub fn parse_csv_records(text: &str) -> CsvRecords {
    let mut grid = split_rows(text).into_iter();

    let Some(header_cells) = grid.next() else {
        return CsvRecords::default();
    };

    let headers: Vec<String> = header_cells
        .iter()
        .map(|h| trim_cell(h).to_string())
        .collect();
    let keys: Vec<String> = headers.iter().map(|h| normalize_key(h)).collect();

    let rows: Vec<CsvRow> = grid
        .map(|cells| {
            let mut record = CsvRow::with_capacity(keys.len());
            for (idx, key) in keys.iter().enumerate() {
                let value = cells.get(idx).map(|c| trim_cell(c)).unwrap_or("");
                record.insert(key.clone(), value.to_string());
            }
            record
        })
        .collect();

    trace!(columns = headers.len(), rows = rows.len(), "decoded csv");
    CsvRecords { headers, rows }
}

/// Single left-to-right scan producing raw (untrimmed) cells per kept row.
fn split_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => row.push(mem::take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(mem::take(&mut field));
                push_if_content(&mut rows, mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_if_content(&mut rows, row);
    }

    rows
}

fn push_if_content(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|cell| !trim_cell(cell).is_empty()) {
        rows.push(row);
    }
}
