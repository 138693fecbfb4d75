// src/download.rs
//! Hands finished files to wherever downloads land.
//!
//! A download is built in memory, delivered to a sink in one synchronous call,
//! and any temporary file used on the way is gone when `deliver` returns.

use anyhow::{Context, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::NamedTempFile;
use tracing::info;

use crate::csv::{encode_csv, ExportRow};

pub const CSV_MIME: &str = "text/csv;charset=utf-8;";
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(filename: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub trait DownloadSink {
    fn deliver(&self, download: Download) -> Result<()>;
}

/// Encodes `rows` under `headers` and delivers the text as a CSV download.
pub fn download_csv<S, H>(sink: &S, filename: &str, headers: &[H], rows: &[ExportRow]) -> Result<()>
where
    S: DownloadSink + ?Sized,
    H: AsRef<str>,
{
    let text = encode_csv(headers, rows);
    sink.deliver(Download::new(filename, CSV_MIME, text.into_bytes()))
}

/// Writes downloads into a directory, replacing same-named files atomically.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Only the final path component of `filename` is honoured.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|n| !n.is_empty())
            .with_context(|| format!("invalid download filename {filename:?}"))?;
        Ok(self.dir.join(name))
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: Download) -> Result<()> {
        let dest = self.path_for(&download.filename)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating download dir {}", self.dir.display()))?;

        // dropped (and removed) on any early return
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(&download.bytes)?;
        tmp.flush()?;
        tmp.persist(&dest)
            .with_context(|| format!("saving download to {}", dest.display()))?;

        info!(
            path = %dest.display(),
            mime = %download.mime,
            bytes = download.bytes.len(),
            "download saved"
        );
        Ok(())
    }
}

/// Keeps downloads in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Download> {
        match self.delivered.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, download: Download) -> Result<()> {
        self.delivered
            .lock()
            .map_err(|_| anyhow::anyhow!("download buffer poisoned"))?
            .push(download);
        Ok(())
    }
}
