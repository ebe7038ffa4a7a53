//! Unit normalization
//!
//! Converts a parsed `(magnitude, unit token)` pair into the canonical unit of
//! its test family: picoamps for current, milliohms for resistance.
//!
//! The multiplier tables are immutable data owned by [`UnitNormalizer`]. Unit
//! tokens are canonicalized before lookup: surrounding whitespace is removed,
//! the token is lowercased, micro signs become `u` and trailing plural `s`
//! characters are stripped. Spelled-out synonyms (`pamp`, `microa`, `kiloohm`,
//! ...) are plain entries in the tables.

use serde::{Deserialize, Serialize};

/// Physical quantity a unit token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    /// Canonical unit: picoamps
    Current,
    /// Canonical unit: milliohms
    Resistance,
}

impl Quantity {
    /// Symbol of the canonical unit, as used in derived CSV headers.
    pub fn canonical_symbol(&self) -> &'static str {
        match self {
            Quantity::Current => "pA",
            Quantity::Resistance => "mOhm",
        }
    }
}

/// Multipliers to picoamps.
const CURRENT_TO_PICOAMPS: &[(&str, f64)] = &[
    ("pa", 1.0),
    ("pamp", 1.0),
    ("picoamp", 1.0),
    ("na", 1e3),
    ("namp", 1e3),
    ("nanoamp", 1e3),
    ("ua", 1e6),
    ("uamp", 1e6),
    ("microa", 1e6),
    ("microamp", 1e6),
    ("ma", 1e9),
    ("mamp", 1e9),
    ("milliamp", 1e9),
    ("a", 1e12),
    ("amp", 1e12),
];

/// Multipliers to milliohms. `mohm` is milli, megaohm must be spelled out
/// (or written `MΩ`, see [`UnitNormalizer::canonical_key`]).
const RESISTANCE_TO_MILLIOHMS: &[(&str, f64)] = &[
    ("mohm", 1.0),
    ("mω", 1.0),
    ("milliohm", 1.0),
    ("ohm", 1e3),
    ("ω", 1e3),
    ("kohm", 1e6),
    ("kω", 1e6),
    ("kiloohm", 1e6),
    ("megaohm", 1e9),
    ("gohm", 1e12),
    ("gω", 1e12),
    ("gigaohm", 1e12),
    ("uohm", 1e-3),
    ("uω", 1e-3),
    ("microohm", 1e-3),
];

/// Converts parsed quantities into canonical scalars.
#[derive(Debug, Clone, Copy)]
pub struct UnitNormalizer {
    current: &'static [(&'static str, f64)],
    resistance: &'static [(&'static str, f64)],
}

impl Default for UnitNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitNormalizer {
    pub const fn new() -> Self {
        Self {
            current: CURRENT_TO_PICOAMPS,
            resistance: RESISTANCE_TO_MILLIOHMS,
        }
    }

    /// Convert `magnitude` expressed in `unit` to the canonical unit of
    /// `quantity`. Returns `None` when the unit is not recognized.
    pub fn normalize(&self, quantity: Quantity, magnitude: f64, unit: &str) -> Option<f64> {
        self.multiplier(quantity, unit).map(|m| magnitude * m)
    }

    /// Multiplier that takes one `unit` to the canonical unit.
    pub fn multiplier(&self, quantity: Quantity, unit: &str) -> Option<f64> {
        let key = Self::canonical_key(unit);
        let table = match quantity {
            Quantity::Current => self.current,
            Quantity::Resistance => self.resistance,
        };
        table
            .iter()
            .find(|(token, _)| *token == key)
            .map(|(_, multiplier)| *multiplier)
    }

    /// Canonical lookup key for a raw unit token.
    pub fn canonical_key(unit: &str) -> String {
        let trimmed: String = unit.chars().filter(|c| !c.is_whitespace()).collect();

        // Case carries the prefix for the symbol form: MΩ is mega, mΩ is milli.
        let mut chars = trimmed.chars();
        if chars.next() == Some('M') && matches!(chars.next(), Some('Ω') | Some('\u{2126}')) {
            return "megaohm".to_string();
        }

        let lowered = trimmed
            .to_lowercase()
            .replace(['µ', 'μ'], "u")
            .replace('\u{2126}', "ω");
        lowered.trim_end_matches('s').to_string()
    }
}

static NORMALIZER: UnitNormalizer = UnitNormalizer::new();

/// Convert a current reading to picoamps.
pub fn to_picoamps(magnitude: f64, unit: &str) -> Option<f64> {
    NORMALIZER.normalize(Quantity::Current, magnitude, unit)
}

/// Convert a resistance reading to milliohms.
pub fn to_milliohms(magnitude: f64, unit: &str) -> Option<f64> {
    NORMALIZER.normalize(Quantity::Resistance, magnitude, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_multipliers() {
        assert_eq!(to_picoamps(1.0, "pa"), Some(1.0));
        assert_eq!(to_picoamps(1.0, "na"), Some(1000.0));
        assert_eq!(to_picoamps(1.0, "ua"), Some(1e6));
        assert_eq!(to_picoamps(1.0, "µa"), Some(1e6));
        assert_eq!(to_picoamps(1.0, "ma"), Some(1e9));
        assert_eq!(to_picoamps(1.0, "a"), Some(1e12));
    }

    #[test]
    fn test_resistance_multipliers() {
        assert_eq!(to_milliohms(1.0, "mohm"), Some(1.0));
        assert_eq!(to_milliohms(1.0, "ohm"), Some(1000.0));
        assert_eq!(to_milliohms(1.0, "Ω"), Some(1000.0));
        assert_eq!(to_milliohms(1.0, "kohm"), Some(1e6));
        assert_eq!(to_milliohms(1.0, "megaohm"), Some(1e9));
        assert_eq!(to_milliohms(1.0, "MΩ"), Some(1e9));
        assert_eq!(to_milliohms(1.0, "gohm"), Some(1e12));
        assert_eq!(to_milliohms(1.0, "uohm"), Some(1e-3));
    }

    #[test]
    fn test_synonyms_and_plurals() {
        assert_eq!(to_picoamps(2.0, "pAmps"), Some(2.0));
        assert_eq!(to_picoamps(2.0, " nAmp "), Some(2000.0));
        assert_eq!(to_picoamps(1.0, "microamps"), Some(1e6));
        assert_eq!(to_milliohms(3.0, "Ohms"), Some(3000.0));
        assert_eq!(to_milliohms(1.0, "kiloohms"), Some(1e6));
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(to_picoamps(1.0, "volt"), None);
        assert_eq!(to_milliohms(1.0, "na"), None);
        assert_eq!(to_picoamps(1.0, ""), None);
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(UnitNormalizer::canonical_key("µA"), "ua");
        assert_eq!(UnitNormalizer::canonical_key("mΩ"), "mω");
        assert_eq!(UnitNormalizer::canonical_key("MΩ"), "megaohm");
    }
}
