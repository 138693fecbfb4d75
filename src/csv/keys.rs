// src/csv/keys.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::decode::CsvRow;

static NON_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("key filter pattern is valid"));

/// Canonical field identifier for a header: trimmed, lowercased, and stripped
/// of everything outside `[a-z0-9_]`.
pub fn normalize_key(header: &str) -> String {
    let lowered = header.trim().to_lowercase();
    NON_KEY_CHARS.replace_all(&lowered, "").into_owned()
}

/// Returns the value of the first alias (in the given order) that resolves to a
/// non-empty cell, or an empty string when none does.
pub fn get_row_value(row: &CsvRow, aliases: &[&str]) -> String {
    aliases
        .iter()
        .filter_map(|alias| row.get(&normalize_key(alias)))
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default()
}
