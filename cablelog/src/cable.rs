//! Cable identification and per-cable aggregation
//!
//! Uploaded exports carry the cable serial number in their file name. The
//! serial's second digit encodes the cable kind and length:
//!
//! | digit | kind     | length (in) |
//! |-------|----------|-------------|
//! | 0     | Paradise | 11          |
//! | 1     | Paradise | 15          |
//! | 3     | Tesla    | 11          |
//! | 4     | Tesla    | 15          |

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::{Matrix, MatrixBuilder, MatrixError};
use crate::parser::classifier::TestType;
use crate::parser::extractor::{
    ExtractError, ExtractedTable, ExtractionOptions, RawFile, RecordExtractor,
};

// The regex crate has no look-around, so the alphanumeric boundaries are
// matched explicitly and the serial taken from group 1.
static SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])(0[0-4][a-z0-9]{8})(?:$|[^a-z0-9])").expect("serial pattern")
});

#[derive(Debug, Error)]
pub enum CableError {
    #[error("Missing serial number in {0}")]
    MissingIdentifier(String),
    #[error("Unknown cable type for serial {0}")]
    UnknownCableType(String),
    #[error("No {test_type} data for cable {serial}")]
    MissingTable { serial: String, test_type: TestType },
    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CableKind {
    Paradise,
    Tesla,
}

impl CableKind {
    /// Working directory the cable's derived files live under.
    pub fn work_dir(&self) -> &'static str {
        match self {
            CableKind::Paradise => "paradiseTemp",
            CableKind::Tesla => "teslaTemp",
        }
    }
}

impl fmt::Display for CableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CableKind::Paradise => f.write_str("Paradise"),
            CableKind::Tesla => f.write_str("Tesla"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CableId {
    pub serial: String,
    pub kind: CableKind,
    pub length_in: u32,
}

impl CableId {
    /// Find the serial in `file_name` and decode kind and length from it.
    pub fn from_file_name(file_name: &str) -> Result<Self, CableError> {
        let serial = SERIAL
            .captures(file_name)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| CableError::MissingIdentifier(file_name.to_string()))?;
        Self::from_serial(&serial)
    }

    pub fn from_serial(serial: &str) -> Result<Self, CableError> {
        let (kind, length_in) = match serial.chars().nth(1) {
            Some('0') => (CableKind::Paradise, 11),
            Some('1') => (CableKind::Paradise, 15),
            Some('3') => (CableKind::Tesla, 11),
            Some('4') => (CableKind::Tesla, 15),
            _ => return Err(CableError::UnknownCableType(serial.to_string())),
        };
        Ok(Self {
            serial: serial.to_string(),
            kind,
            length_in,
        })
    }

    /// Extraction root for this cable: `root/<work dir>`; size and serial
    /// folders are added by the extractor.
    pub fn output_root(&self, root: &Path) -> PathBuf {
        root.join(self.kind.work_dir())
    }

    /// Folder holding every derived file of this cable.
    pub fn folder(&self, root: &Path) -> PathBuf {
        self.output_root(root)
            .join(self.length_in.to_string())
            .join(&self.serial)
    }
}

/// Everything extracted for one cable.
#[derive(Debug, Clone)]
pub struct Cable {
    pub id: CableId,
    tables: BTreeMap<TestType, ExtractedTable>,
}

impl Cable {
    pub fn new(id: CableId) -> Self {
        Self {
            id,
            tables: BTreeMap::new(),
        }
    }

    /// Keep `table`, replacing an earlier table of the same test type.
    pub fn absorb(&mut self, table: ExtractedTable) {
        if let Some(previous) = self.tables.insert(table.test_type, table) {
            tracing::debug!(
                "Cable {}: replaced {} table from {}",
                self.id.serial,
                previous.test_type,
                previous.provenance.source
            );
        }
    }

    pub fn table(&self, test_type: TestType) -> Option<&ExtractedTable> {
        self.tables.get(&test_type)
    }

    pub fn tables(&self) -> impl Iterator<Item = &ExtractedTable> {
        self.tables.values()
    }

    pub fn has_leakage(&self) -> bool {
        self.tables.contains_key(&TestType::Leakage)
    }

    pub fn has_one_second_leakage(&self) -> bool {
        self.tables.contains_key(&TestType::OneSecondLeakage)
    }

    /// Build the 2x66 matrix from this cable's `test_type` table.
    pub fn matrix(&self, test_type: TestType, builder: &MatrixBuilder) -> Result<Matrix, CableError> {
        let table = self.table(test_type).ok_or_else(|| CableError::MissingTable {
            serial: self.id.serial.clone(),
            test_type,
        })?;
        Ok(builder.build_from_table(table)?)
    }
}

/// Groups uploaded exports by cable serial.
#[derive(Debug, Default)]
pub struct CableRegistry {
    work_root: PathBuf,
    persist: bool,
    cables: BTreeMap<String, Cable>,
}

impl CableRegistry {
    /// Registry that writes derived files under `work_root`.
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            persist: true,
            cables: BTreeMap::new(),
        }
    }

    /// Registry that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Identify the cable of `file`, extract it and attach the table.
    ///
    /// Returns the serial and test type on success. Identification and
    /// extraction failures concern this file only.
    pub fn ingest(&mut self, file: &RawFile) -> Result<(String, TestType), CableError> {
        let id = CableId::from_file_name(&file.name)?;

        let options = ExtractionOptions {
            output_root: self.persist.then(|| id.output_root(&self.work_root)),
        };
        let table = RecordExtractor::new(options).extract(
            file,
            &id.length_in.to_string(),
            &id.serial,
        )?;
        let test_type = table.test_type;

        let serial = id.serial.clone();
        self.cables
            .entry(serial.clone())
            .or_insert_with(|| Cable::new(id))
            .absorb(table);
        Ok((serial, test_type))
    }

    pub fn get(&self, serial: &str) -> Option<&Cable> {
        self.cables.get(serial)
    }

    pub fn cables(&self) -> impl Iterator<Item = &Cable> {
        self.cables.values()
    }

    pub fn len(&self) -> usize {
        self.cables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cables.is_empty()
    }
}
