//! Data-region location and tabular parsing for tester exports.
//!
//! An export starts with free-form preamble lines (station, operator, fixture
//! revision, ...). The measurement table begins at the first line containing
//! [`HEADER_MARKER`]; everything from there on, minus blank lines, is parsed
//! as comma-separated values with a header row.

use thiserror::Error;

use crate::parser::classifier::TestType;
use crate::units::Quantity;

/// Literal that identifies the header line of the measurement table.
pub const HEADER_MARKER: &str = "Instruction Type";

/// Column names used by the extractor.
pub mod columns {
    pub const INSTRUCTION_TYPE: &str = "Instruction Type";
    pub const FROM_POINTS: &str = "From Points";
    pub const VALUE_MEASURED: &str = "Value Measured";
    pub const VALUE_EXPECTED: &str = "Value Expected";
}

/// Instruction type selected for leakage rows (and the resistance fallback).
pub const CUSTOM_INSTRUCTION: &str = "CUSTOM";
/// Instruction type selected for resistance and continuity rows.
pub const FOUR_WIRE_INSTRUCTION: &str = "4WIRE";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Decode raw bytes as UTF-8, dropping undecodable sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "")
}

/// Return the tabular region of `text`: the header line and every following
/// non-blank line. `None` if the header marker never appears.
pub fn locate_data_region(text: &str) -> Option<String> {
    let mut lines = text.lines();
    let header = lines.find(|line| line.contains(HEADER_MARKER))?;

    let mut region = String::from(header);
    for line in lines.filter(|line| !line.trim().is_empty()) {
        region.push('\n');
        region.push_str(line);
    }
    Some(region)
}

/// Parsed measurement table with trimmed column names.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped: usize,
}

impl MeasurementTable {
    /// Parse a data region. Records with more fields than the header, or that
    /// fail to decode, are skipped one by one; short records read as empty
    /// cells.
    pub fn parse(region: &str) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(region.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut skipped = 0;
        for (index, record) in reader.records().enumerate() {
            match record {
                Ok(record) if record.len() <= columns.len() => {
                    rows.push(record.iter().map(str::to_string).collect());
                }
                Ok(record) => {
                    tracing::debug!(
                        "Skipping row {}: {} fields for {} columns",
                        index + 1,
                        record.len(),
                        columns.len()
                    );
                    skipped += 1;
                }
                Err(e) => {
                    tracing::debug!("Skipping unreadable row {}: {}", index + 1, e);
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            columns,
            rows,
            skipped,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of malformed records dropped while parsing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn rows(&self) -> impl Iterator<Item = MeasurementRow<'_>> {
        self.rows.iter().map(move |fields| MeasurementRow {
            table: self,
            fields,
        })
    }

    /// Rows whose trimmed instruction type equals `target` exactly.
    pub fn filter_instruction(&self, target: &str) -> Vec<MeasurementRow<'_>> {
        self.rows()
            .filter(|row| row.instruction_type().trim() == target)
            .collect()
    }

    /// Instruction type that selects the measurement rows for `test_type`.
    pub fn target_instruction(&self, test_type: TestType) -> &'static str {
        match test_type.quantity() {
            Some(Quantity::Resistance) if self.has_column(columns::INSTRUCTION_TYPE) => {
                FOUR_WIRE_INSTRUCTION
            }
            _ => CUSTOM_INSTRUCTION,
        }
    }
}

/// Borrowed view of one record.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementRow<'a> {
    table: &'a MeasurementTable,
    fields: &'a [String],
}

impl<'a> MeasurementRow<'a> {
    /// Cell text for `column`, empty when the column or the cell is missing.
    pub fn get(&self, column: &str) -> &'a str {
        self.table
            .column_index(column)
            .and_then(|i| self.fields.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn instruction_type(&self) -> &'a str {
        self.get(columns::INSTRUCTION_TYPE)
    }

    pub fn from_points(&self) -> &'a str {
        self.get(columns::FROM_POINTS)
    }

    pub fn value_measured(&self) -> &'a str {
        self.get(columns::VALUE_MEASURED)
    }

    pub fn value_expected(&self) -> &'a str {
        self.get(columns::VALUE_EXPECTED)
    }
}
