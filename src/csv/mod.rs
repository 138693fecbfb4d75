// src/csv/mod.rs
//! Lenient comma-separated text handling for bulk uploads and report exports.
//!
//! Decoding never fails: ragged rows, blank lines and unterminated quotes are
//! absorbed so hand-edited spreadsheet exports keep loading.

pub mod decode;
pub mod encode;
pub mod keys;

pub use decode::{parse_csv_records, text_from_bytes, CsvRecords, CsvRow};
pub use encode::{encode_csv, escape_cell, ExportRow};
pub use keys::{get_row_value, normalize_key};
