//! Test-type classification from export file names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::Quantity;

/// Kind of tester run a log export belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestType {
    Leakage,
    OneSecondLeakage,
    Resistance,
    InvertedResistance,
    Continuity,
    InvertedContinuity,
    Unknown,
}

/// File-name markers, evaluated first match wins.
///
/// Inverted variants sit ahead of their plain counterparts.
pub const TEST_TYPE_MARKERS: &[(&str, TestType)] = &[
    ("continuity-test-inv-revc", TestType::InvertedContinuity),
    ("continuity-test-revc", TestType::Continuity),
    ("leakage 1s", TestType::OneSecondLeakage),
    ("leakage rev a", TestType::Leakage),
    ("resistance inverted rev a", TestType::InvertedResistance),
    ("resistance rev a", TestType::Resistance),
];

/// Classify an export by case-insensitive substring match on its file name.
pub fn classify(file_name: &str) -> TestType {
    let lowered = file_name.to_lowercase();
    TEST_TYPE_MARKERS
        .iter()
        .find(|(marker, _)| lowered.contains(marker))
        .map(|(_, test_type)| *test_type)
        .unwrap_or(TestType::Unknown)
}

impl TestType {
    /// All classifiable types in marker order.
    pub fn known() -> impl Iterator<Item = TestType> {
        TEST_TYPE_MARKERS.iter().map(|(_, t)| *t)
    }

    /// False only for [`TestType::Unknown`].
    pub fn is_known(&self) -> bool {
        *self != TestType::Unknown
    }

    /// Quantity measured by this test family, `None` for [`TestType::Unknown`].
    pub fn quantity(&self) -> Option<Quantity> {
        match self {
            TestType::Leakage | TestType::OneSecondLeakage => Some(Quantity::Current),
            TestType::Resistance
            | TestType::InvertedResistance
            | TestType::Continuity
            | TestType::InvertedContinuity => Some(Quantity::Resistance),
            TestType::Unknown => None,
        }
    }

    pub fn is_leakage(&self) -> bool {
        matches!(self, TestType::Leakage | TestType::OneSecondLeakage)
    }

    /// Prefix of the derived CSV file name.
    pub fn file_prefix(&self) -> Option<&'static str> {
        match self {
            TestType::Leakage => Some("leakage"),
            TestType::OneSecondLeakage => Some("1s_leakage"),
            TestType::Resistance => Some("resistance"),
            TestType::InvertedResistance => Some("inv_resistance"),
            TestType::Continuity => Some("continuity"),
            TestType::InvertedContinuity => Some("inv_continuity"),
            TestType::Unknown => None,
        }
    }

    /// Label for display
    pub fn label(&self) -> &'static str {
        match self {
            TestType::Leakage => "Leakage",
            TestType::OneSecondLeakage => "1s Leakage",
            TestType::Resistance => "Resistance",
            TestType::InvertedResistance => "Inv Resistance",
            TestType::Continuity => "Continuity",
            TestType::InvertedContinuity => "Inv Continuity",
            TestType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
