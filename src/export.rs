// src/export.rs
//! Report exports: JSON reports from the backend become CSV or pretty JSON
//! downloads, and raw export blobs are saved as-is.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::csv::ExportRow;
use crate::download::{download_csv, Download, DownloadSink, CSV_MIME, JSON_MIME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Json => JSON_MIME,
        }
    }
}

/// Appends the format's extension unless `name` already has one.
pub fn export_filename(name: &str, format: ExportFormat) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.{}", format.extension())
    }
}

/// `<stem>_<YYYY-MM-DD>.<ext>`
pub fn stamped_filename(stem: &str, format: ExportFormat, day: NaiveDate) -> String {
    format!("{stem}_{}.{}", day.format("%Y-%m-%d"), format.extension())
}

/// Report rows from either a bare array or an object wrapping one under
/// `rows`, `items` or `data`.
pub fn report_rows(report: &Value) -> Result<Vec<ExportRow>> {
    let list = match report {
        Value::Array(items) => items,
        Value::Object(map) => ["rows", "items", "data"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .context("report object has no rows/items/data array")?,
        _ => bail!("report must be a JSON array or object"),
    };

    list.iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_object()
                .cloned()
                .with_context(|| format!("report entry {idx} is not an object"))
        })
        .collect()
}

/// Union of row keys in first-seen order.
pub fn derive_headers(rows: &[ExportRow]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

/// Writes `report` to `sink` in the requested format. `headers` fixes the
/// CSV column order; otherwise it is derived from the rows.
pub fn export_report<S: DownloadSink + ?Sized>(
    sink: &S,
    filename: &str,
    report: &Value,
    format: ExportFormat,
    headers: Option<&[String]>,
) -> Result<usize> {
    let filename = export_filename(filename, format);
    match format {
        ExportFormat::Csv => {
            let rows = report_rows(report)?;
            let headers = match headers {
                Some(h) if !h.is_empty() => h.to_vec(),
                _ => derive_headers(&rows),
            };
            download_csv(sink, &filename, &headers, &rows)?;
            info!(file = %filename, rows = rows.len(), columns = headers.len(), "csv export written");
            Ok(rows.len())
        }
        ExportFormat::Json => {
            let text = serde_json::to_string_pretty(report)?;
            sink.deliver(Download::new(&filename, JSON_MIME, text.into_bytes()))?;
            let count = report_rows(report).map(|r| r.len()).unwrap_or(0);
            info!(file = %filename, rows = count, "json export written");
            Ok(count)
        }
    }
}

/// Saves bytes fetched from an export endpoint untouched.
pub fn save_blob<S: DownloadSink + ?Sized>(
    sink: &S,
    filename: &str,
    format: ExportFormat,
    bytes: Vec<u8>,
) -> Result<()> {
    sink.deliver(Download::new(
        export_filename(filename, format),
        format.mime(),
        bytes,
    ))
}
