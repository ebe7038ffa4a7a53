//! Record extraction
//!
//! Turns one raw tester export into a normalized measurement table:
//!
//! ```text
//! raw bytes ─▶ classify ─▶ locate header ─▶ parse table ─▶ filter rows
//!                                                            │
//!        derived CSV ◀─ emit ◀─ normalize ◀─ parse cells ◀───┘
//! ```
//!
//! Any stage that fails ends extraction for that file with an [`ExtractError`];
//! the skip-class errors ([`ExtractError::is_skip`]) are expected in a batch
//! and never abort it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::parser::cell::{has_unit_hint, parse_quantity};
use crate::parser::channel::{resolve_channel, Channel};
use crate::parser::classifier::{classify, TestType};
use crate::parser::table::{decode_lossy, locate_data_region, MeasurementTable, TableError};
use crate::units::{Quantity, UnitNormalizer};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No test type marker in file name: {0}")]
    ClassificationMiss(String),
    #[error("No '{}' header line in {0}", crate::parser::table::HEADER_MARKER)]
    HeaderNotFound(String),
    #[error("No data rows after the header in {0}")]
    EmptyRegion(String),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExtractError {
    /// True for the errors that mean "nothing to extract here" rather than a fault.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ExtractError::ClassificationMiss(_)
                | ExtractError::HeaderNotFound(_)
                | ExtractError::EmptyRegion(_)
        )
    }
}

/// A tester export as read from disk or received as an upload.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

/// Where a table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source: String,
    pub size: String,
    pub serial: String,
}

/// One normalized reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMeasurement {
    pub channel: Channel,
    /// Raw "From Points" text, kept for position matching.
    #[serde(skip)]
    pub point_label: String,
    pub measured: f64,
    /// Zero when the export asserts no expected value.
    pub expected: f64,
}

/// Normalized measurements of one export.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTable {
    pub test_type: TestType,
    pub quantity: Quantity,
    pub provenance: Provenance,
    pub rows: Vec<CanonicalMeasurement>,
}

impl ExtractedTable {
    /// Header row of the derived CSV.
    pub fn column_headers(&self) -> [&'static str; 3] {
        match self.quantity {
            Quantity::Current => ["Channel", "Measured_pA", "Expected_pA"],
            Quantity::Resistance => ["Channel", "Measured_R (mOhm)", "Expected_R (mOhm)"],
        }
    }

    /// `{prefix}_{size}_{serial}.csv`
    pub fn derived_file_name(&self) -> String {
        format!(
            "{}_{}_{}.csv",
            self.test_type.file_prefix().unwrap_or("unknown"),
            self.provenance.size,
            self.provenance.serial
        )
    }

    /// `root/size/serial/{derived_file_name}`
    pub fn derived_path(&self, root: &Path) -> PathBuf {
        root.join(&self.provenance.size)
            .join(&self.provenance.serial)
            .join(self.derived_file_name())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(point label, measured)` pairs for matrix construction.
    pub fn point_readings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rows
            .iter()
            .map(|row| (row.point_label.as_str(), row.measured))
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.column_headers())?;
        for row in &self.rows {
            let measured = format_value(row.measured);
            let expected = format_value(row.expected);
            csv.write_record([row.channel.as_str(), measured.as_str(), expected.as_str()])?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the derived CSV under `root`, replacing any previous copy.
    ///
    /// Written to a hidden sibling first and renamed into place; the sibling
    /// is removed again if either step fails.
    pub fn persist(&self, root: &Path) -> Result<PathBuf, ExtractError> {
        let path = self.derived_path(root);
        let dir = path.parent().unwrap_or(root);
        fs::create_dir_all(dir)?;

        let tmp = dir.join(format!(".{}.tmp", self.derived_file_name()));
        let written = fs::File::create(&tmp)
            .map_err(ExtractError::from)
            .and_then(|file| Ok(self.write_csv(io::BufWriter::new(file))?))
            .and_then(|()| Ok(fs::rename(&tmp, &path)?));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e);
        }
        Ok(path)
    }
}

/// Format a canonical value the way the derived CSVs always have: whole
/// numbers keep one decimal place (`12500.0`).
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Options for extraction runs.
#[derive(Clone, Debug, Default)]
pub struct ExtractionOptions {
    /// Root for derived CSVs; `None` skips persistence.
    pub output_root: Option<PathBuf>,
}

/// Drives a raw export through every extraction stage.
#[derive(Debug, Clone, Default)]
pub struct RecordExtractor {
    options: ExtractionOptions,
    normalizer: UnitNormalizer,
}

impl RecordExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self {
            options,
            normalizer: UnitNormalizer::new(),
        }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extract `file`, tagging the result with its size and serial folder.
    /// Persists the derived CSV when an output root is configured.
    pub fn extract(
        &self,
        file: &RawFile,
        size: &str,
        serial: &str,
    ) -> Result<ExtractedTable, ExtractError> {
        let test_type = classify(&file.name);
        let Some(quantity) = test_type.quantity() else {
            return Err(ExtractError::ClassificationMiss(file.name.clone()));
        };

        let text = decode_lossy(&file.bytes);
        let region = locate_data_region(&text)
            .ok_or_else(|| ExtractError::HeaderNotFound(file.name.clone()))?;
        let table = MeasurementTable::parse(&region)?;
        if table.is_empty() {
            return Err(ExtractError::EmptyRegion(file.name.clone()));
        }

        let target = table.target_instruction(test_type);
        let selected = table.filter_instruction(target);
        tracing::debug!(
            "{}: {} of {} rows are {}",
            file.name,
            selected.len(),
            table.len(),
            target
        );

        let mut rows = Vec::with_capacity(selected.len());
        for row in selected {
            let measured_text = row.value_measured();
            if !has_unit_hint(quantity, measured_text) {
                tracing::debug!("{}: no unit hint in {:?}", file.name, measured_text);
                continue;
            }
            let Some(measured) = self.parse_canonical(quantity, measured_text) else {
                tracing::debug!("{}: dropping unparseable value {:?}", file.name, measured_text);
                continue;
            };
            let expected = self
                .parse_canonical(quantity, row.value_expected())
                .unwrap_or(0.0);

            rows.push(CanonicalMeasurement {
                channel: resolve_channel([row.from_points()]),
                point_label: row.from_points().to_string(),
                measured,
                expected,
            });
        }

        let extracted = ExtractedTable {
            test_type,
            quantity,
            provenance: Provenance {
                source: file.name.clone(),
                size: size.to_string(),
                serial: serial.to_string(),
            },
            rows,
        };

        if let Some(root) = &self.options.output_root {
            let path = extracted.persist(root)?;
            tracing::info!(
                "Wrote {} {} rows to {}",
                extracted.len(),
                test_type,
                path.display()
            );
        }

        Ok(extracted)
    }

    fn parse_canonical(&self, quantity: Quantity, text: &str) -> Option<f64> {
        let parsed = parse_quantity(quantity, text)?;
        self.normalizer
            .normalize(quantity, parsed.magnitude, &parsed.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leakage_file(rows: &str) -> RawFile {
        let content = format!(
            "Cable Test Report\nFixture: DIB\n\nInstruction Type,From Points,Value Measured,Value Expected\n{rows}"
        );
        RawFile::new("0312345678 Leakage Rev A.csv", content)
    }

    #[test]
    fn test_leakage_row() {
        let file = leakage_file("CUSTOM,F5 (DIB - SIGNAL),12.5nA,10nA\n");
        let table = RecordExtractor::default().extract(&file, "11", "0312345678").unwrap();

        assert_eq!(table.test_type, TestType::Leakage);
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.channel.as_str(), "F5");
        assert_eq!(row.measured, 12500.0);
        assert_eq!(row.expected, 10000.0);
        assert_eq!(row.point_label, "F5 (DIB - SIGNAL)");
    }

    #[test]
    fn test_missing_expected_defaults_to_zero() {
        let file = leakage_file("CUSTOM,F1,3pA,\nCUSTOM,F2,4pA,n/a\n");
        let table = RecordExtractor::default().extract(&file, "11", "SN").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|r| r.expected == 0.0));
    }

    #[test]
    fn test_unparseable_measured_dropped() {
        let file = leakage_file(
            "CUSTOM,F1,42,1nA\nCUSTOM,F2,Fail,1nA\nCUSTOM,F3,7 nA,1nA\nDELAY,F4,1nA,1nA\n",
        );
        let table = RecordExtractor::default().extract(&file, "11", "SN").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].channel.as_str(), "F3");
        assert_eq!(table.rows[0].measured, 7000.0);
    }

    #[test]
    fn test_resistance_four_wire() {
        let content = "Instruction Type,From Points,Value Measured,Value Expected\n\
                       4WIRE,R3,2.3 kohm,\n\
                       CUSTOM,R4,1 ohm,\n";
        let file = RawFile::new("Resistance Rev A 0412345678.csv", content);
        let table = RecordExtractor::default().extract(&file, "15", "0412345678").unwrap();

        assert_eq!(table.test_type, TestType::Resistance);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].channel.as_str(), "R3");
        assert_eq!(table.rows[0].measured, 2_300_000.0);
        assert_eq!(table.rows[0].expected, 0.0);
        assert_eq!(
            table.column_headers(),
            ["Channel", "Measured_R (mOhm)", "Expected_R (mOhm)"]
        );
    }

    #[test]
    fn test_skip_errors() {
        let extractor = RecordExtractor::default();

        let err = extractor
            .extract(&RawFile::new("notes.csv", "Instruction Type\n"), "11", "SN")
            .unwrap_err();
        assert!(matches!(err, ExtractError::ClassificationMiss(_)));
        assert!(err.is_skip());

        let err = extractor
            .extract(&RawFile::new("Leakage Rev A.csv", "a,b\n1,2\n"), "11", "SN")
            .unwrap_err();
        assert!(matches!(err, ExtractError::HeaderNotFound(_)));
        assert!(err.is_skip());

        let header_only = leakage_file("\n\n");
        let err = extractor.extract(&header_only, "11", "SN").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyRegion(_)));
        assert!(err.is_skip());
    }

    #[test]
    fn test_persist_leaves_no_temp_file_on_failure() {
        let root = tempfile::tempdir().unwrap();
        let file = leakage_file("CUSTOM,F5 (DIB - SIGNAL),12.5nA,10nA\n");
        let table = RecordExtractor::default().extract(&file, "11", "0312345678").unwrap();

        // A directory squatting on the derived path makes the rename fail.
        let target = table.derived_path(root.path());
        fs::create_dir_all(target.join("occupied")).unwrap();

        assert!(table.persist(root.path()).is_err());
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_derived_names_and_csv() {
        let file = leakage_file("CUSTOM,F5 (DIB - SIGNAL),12.5nA,10nA\n");
        let table = RecordExtractor::default().extract(&file, "11", "0312345678").unwrap();
        assert_eq!(table.derived_file_name(), "leakage_11_0312345678.csv");
        assert_eq!(
            table.derived_path(Path::new("out")),
            Path::new("out/11/0312345678/leakage_11_0312345678.csv")
        );

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Channel,Measured_pA,Expected_pA\nF5,12500.0,10000.0\n"
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(2300000.0), "2300000.0");
        assert_eq!(format_value(0.5), "0.5");
    }
}
