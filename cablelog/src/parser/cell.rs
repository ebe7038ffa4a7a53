//! Measurement cell parsing
//!
//! Tester exports put values and units in one free-text cell, e.g. `12.5nA`,
//! `2.3 kohm` or `< 10 pA (limit)`. Both entry points look for the first
//! `<number><optional whitespace><unit>` occurrence and return the raw,
//! lowercased unit token; conversion happens in [`crate::units`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::units::Quantity;

static CURRENT_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([+-]?[0-9]+(?:\.[0-9]+)?)\s*([munpµμ]a)").expect("current cell pattern")
});

static RESISTANCE_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([+-]?[0-9]+(?:\.[0-9]+)?)\s*(ohm|Ω|kohm|mohm|uohm)")
        .expect("resistance cell pattern")
});

/// A magnitude with its unit token, before canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuantity {
    pub magnitude: f64,
    /// Lowercase unit symbol as found in the cell (`na`, `ua`, `kohm`, `ω`)
    pub unit: String,
}

/// Parse the first current reading (`mA`, `uA`/`µA`, `nA`, `pA`) in `text`.
pub fn parse_current(text: &str) -> Option<ParsedQuantity> {
    let caps = CURRENT_CELL.captures(text)?;
    let magnitude = caps[1].parse::<f64>().ok()?;
    let unit = caps[2].to_lowercase().replace(['µ', 'μ'], "u");
    Some(ParsedQuantity { magnitude, unit })
}

/// Parse the first resistance reading (`ohm`, `Ω`, `kohm`, `mohm`, `uohm`) in `text`.
pub fn parse_resistance(text: &str) -> Option<ParsedQuantity> {
    let caps = RESISTANCE_CELL.captures(text)?;
    let magnitude = caps[1].parse::<f64>().ok()?;
    let unit = caps[2].to_lowercase().replace(' ', "");
    Some(ParsedQuantity { magnitude, unit })
}

/// Parse `text` with the parser matching `quantity`.
pub fn parse_quantity(quantity: Quantity, text: &str) -> Option<ParsedQuantity> {
    match quantity {
        Quantity::Current => parse_current(text),
        Quantity::Resistance => parse_resistance(text),
    }
}

/// Cheap unit-presence guard applied to a measured cell before the regex parse.
///
/// Coarse on purpose: any `a` admits a current cell and any `ohm` admits a
/// resistance cell. A cell that passes can still fail [`parse_quantity`].
/// Note that a resistance written only as `Ω` does not pass.
pub fn has_unit_hint(quantity: Quantity, text: &str) -> bool {
    let lowered = text.to_lowercase();
    match quantity {
        Quantity::Current => lowered.contains('a'),
        Quantity::Resistance => lowered.contains("ohm"),
    }
}
