//! Batch extraction shared by the CLI and library users.
//! Files are processed one at a time; a file that cannot be extracted is
//! recorded and skipped without affecting the rest of the batch.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cable::CableError;
use crate::matrix::{LayoutError, MatrixError};
use crate::parser::classifier::TestType;
use crate::parser::extractor::{
    format_value, ExtractError, ExtractedTable, ExtractionOptions, RawFile, RecordExtractor,
};

#[derive(Debug, thiserror::Error)]
pub enum CableLogError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Layout error: {0}")]
    Layout(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl From<ExtractError> for CableLogError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Io(io) => CableLogError::Io(io),
            other => CableLogError::Parse(other.to_string()),
        }
    }
}

impl From<MatrixError> for CableLogError {
    fn from(e: MatrixError) -> Self {
        CableLogError::Layout(e.to_string())
    }
}

impl From<LayoutError> for CableLogError {
    fn from(e: LayoutError) -> Self {
        CableLogError::Layout(e.to_string())
    }
}

impl From<CableError> for CableLogError {
    fn from(e: CableError) -> Self {
        match e {
            CableError::Matrix(m) => m.into(),
            CableError::Extract(x) => x.into(),
            other => CableLogError::Other(other.to_string()),
        }
    }
}

impl From<csv::Error> for CableLogError {
    fn from(e: csv::Error) -> Self {
        CableLogError::Parse(e.to_string())
    }
}

/// One export found by [`discover_test_logs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLogEntry {
    pub path: PathBuf,
    pub size: String,
    pub serial: String,
}

/// List exports laid out as `root/<size>/<serial>/<file>`, sorted by path.
/// Entries that are not directories at the size or serial level are ignored.
pub fn discover_test_logs(root: &Path) -> Result<Vec<TestLogEntry>, CableLogError> {
    let mut entries = Vec::new();
    for size_dir in sorted_children(root)? {
        if !size_dir.is_dir() {
            continue;
        }
        for serial_dir in sorted_children(&size_dir)? {
            if !serial_dir.is_dir() {
                continue;
            }
            for path in sorted_children(&serial_dir)? {
                if path.is_file() {
                    entries.push(TestLogEntry {
                        size: dir_name(&size_dir),
                        serial: dir_name(&serial_dir),
                        path,
                    });
                }
            }
        }
    }
    Ok(entries)
}

fn sorted_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A file the batch did not extract, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    pub files: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub rows: usize,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<ExtractedTable>,
    pub skipped: Vec<SkippedFile>,
    pub stats: BatchStats,
}

impl BatchResult {
    /// Tables of one test type.
    pub fn tables_of(&self, test_type: TestType) -> impl Iterator<Item = &ExtractedTable> {
        self.tables.iter().filter(move |t| t.test_type == test_type)
    }

    /// Write every row of every table, with provenance, as one CSV.
    pub fn write_combined_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "Size",
            "Serial",
            "Test Type",
            "Channel",
            "Measured",
            "Expected",
            "Unit",
        ])?;
        for table in &self.tables {
            let unit = table.quantity.canonical_symbol();
            for row in &table.rows {
                let measured = format_value(row.measured);
                let expected = format_value(row.expected);
                csv.write_record([
                    table.provenance.size.as_str(),
                    table.provenance.serial.as_str(),
                    table.test_type.label(),
                    row.channel.as_str(),
                    measured.as_str(),
                    expected.as_str(),
                    unit,
                ])?;
            }
        }
        csv.flush()?;
        Ok(())
    }
}

/// Extraction API used by the CLI.
pub struct CableLogCore;

impl CableLogCore {
    /// Extract a single export.
    pub fn extract_file(
        path: &Path,
        size: &str,
        serial: &str,
        options: ExtractionOptions,
    ) -> Result<ExtractedTable, CableLogError> {
        let file = RawFile::from_path(path)?;
        Ok(RecordExtractor::new(options).extract(&file, size, serial)?)
    }

    /// Extract every export under `root` (see [`discover_test_logs`]).
    pub fn run_batch(root: &Path, options: ExtractionOptions) -> Result<BatchResult, CableLogError> {
        let entries = discover_test_logs(root)?;
        let extractor = RecordExtractor::new(options);

        let mut tables = Vec::new();
        let mut skipped = Vec::new();
        for entry in &entries {
            let outcome = RawFile::from_path(&entry.path)
                .map_err(ExtractError::from)
                .and_then(|file| extractor.extract(&file, &entry.size, &entry.serial));
            match outcome {
                Ok(table) => tables.push(table),
                Err(e) => {
                    if e.is_skip() {
                        tracing::debug!("Skipping {:?}: {}", entry.path, e);
                    } else {
                        tracing::warn!("Failed to extract {:?}: {}", entry.path, e);
                    }
                    skipped.push(SkippedFile {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let stats = BatchStats {
            files: entries.len(),
            extracted: tables.len(),
            skipped: skipped.len(),
            rows: tables.iter().map(ExtractedTable::len).sum(),
        };
        tracing::info!(
            "Extracted {} of {} files ({} rows)",
            stats.extracted,
            stats.files,
            stats.rows
        );

        Ok(BatchResult {
            generated_at: Utc::now(),
            tables,
            skipped,
            stats,
        })
    }
}
