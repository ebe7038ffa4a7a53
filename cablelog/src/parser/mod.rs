pub mod cell;
pub mod channel;
pub mod classifier;
pub mod extractor;
pub mod table;

// Re-export for convenience
pub use cell::{parse_current, parse_resistance, ParsedQuantity};
pub use channel::{resolve_channel, Channel, UNRESOLVED_CHANNEL};
pub use classifier::{classify, TestType, TEST_TYPE_MARKERS};
pub use extractor::{
    format_value, CanonicalMeasurement, ExtractError, ExtractedTable, ExtractionOptions,
    Provenance, RawFile, RecordExtractor,
};
pub use table::{MeasurementRow, MeasurementTable, TableError};
