// src/csv/encode.rs
use serde_json::{Map, Value};

/// Loosely typed export row; absent keys and `null` render as empty cells.
pub type ExportRow = Map<String, Value>;

/// Quotes a cell only when it holds a comma, a double quote or a line break,
/// doubling any inner quotes.
pub fn escape_cell(value: &str) -> String {
    let needs_quotes = value.contains(|c: char| matches!(c, '"' | ',' | '\n' | '\r'));
    let escaped = value.replace('"', "\"\"");
    if needs_quotes {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => escape_cell(s),
        Some(other) => escape_cell(&other.to_string()),
    }
}

/// Renders the header line followed by one line per row, joined with `\n`.
/// Each row is projected onto `headers` by exact key.
pub fn encode_csv<H: AsRef<str>>(headers: &[H], rows: &[ExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_cell(h.as_ref()))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let line = headers
            .iter()
            .map(|h| cell_text(row.get(h.as_ref())))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}
