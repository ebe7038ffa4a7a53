//! CableLog - tester-log extraction for manufactured cable assemblies
//!
//! This library reads leakage, resistance and continuity exports from a cable
//! tester, normalizes every reading to a canonical unit (picoamps or
//! milliohms) and arranges leakage readings into the 2x66 fixture matrix.
//!
//! # Quick Start
//!
//! ```no_run
//! use cablelog::{CableLogCore, ExtractionOptions, MatrixBuilder};
//! use std::path::Path;
//!
//! let table = CableLogCore::extract_file(
//!     Path::new("0312345678 Leakage Rev A.csv"),
//!     "11",
//!     "0312345678",
//!     ExtractionOptions::default(),
//! ).unwrap();
//!
//! for row in &table.rows {
//!     println!("{}: {} pA", row.channel, row.measured);
//! }
//!
//! let matrix = MatrixBuilder::default().build_from_table(&table).unwrap();
//! println!("{:?}", matrix.row(0).unwrap_or_default());
//! ```
//!
//! # Features
//!
//! - **Classification**: test type from the export's file name
//! - **Extraction**: header location, row filtering, value and channel parsing
//! - **Normalization**: exact pA / mOhm conversion tables
//! - **Matrix**: fixed 132-position layout, strict count invariant
//! - **Batch**: `root/<size>/<serial>/<file>` traversal with per-file skips

pub mod cable;
pub mod core;
pub mod matrix;
pub mod parser;
pub mod units;

// Re-export main types
pub use crate::core::{
    discover_test_logs, BatchResult, BatchStats, CableLogCore, CableLogError, SkippedFile,
    TestLogEntry,
};
pub use cable::{Cable, CableError, CableId, CableKind, CableRegistry};
pub use matrix::{
    CountPolicy, Matrix, MatrixBuilder, MatrixError, MatrixOptions, MatrixRenderer,
    PhysicalLayout, TextHeatmap, TieBreak,
};
pub use parser::{
    classify, format_value, resolve_channel, CanonicalMeasurement, Channel, ExtractError,
    ExtractedTable, ExtractionOptions, RawFile, RecordExtractor, TestType,
};
pub use units::{to_milliohms, to_picoamps, Quantity, UnitNormalizer};

/// Extract an export from disk without persisting a derived file (convenience wrapper).
pub fn extract_file(
    path: &std::path::Path,
    size: &str,
    serial: &str,
) -> Result<ExtractedTable, CableLogError> {
    CableLogCore::extract_file(path, size, serial, ExtractionOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CableLogCore, CableLogError, ExtractedTable, ExtractionOptions, Matrix, MatrixBuilder,
        PhysicalLayout, TestType,
    };
}
