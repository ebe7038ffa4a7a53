//! Channel resolution from free-text point descriptions.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Channel value used when no point identifier could be found.
pub const UNRESOLVED_CHANNEL: &str = "0";

/// Ordered most specific first. Parenthesized forms beat bare mentions and
/// the `\b` anchors keep `FS`/`RS` tokens out of the `F`/`R` patterns.
const CHANNEL_PATTERNS: [&str; 8] = [
    r"\((F[0-9]+)\)",
    r"\b(F[0-9]+)\b",
    r"\((R[0-9]+)\)",
    r"\b(R[0-9]+)\b",
    r"\((FS[0-9]+)\)",
    r"\b(FS[0-9]+)\b",
    r"\((RS[0-9]+)\)",
    r"\b(RS[0-9]+)\b",
];

static CHANNEL_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CHANNEL_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("channel pattern"))
        .collect()
});

/// Logical channel identifier on the cable fixture (`F12`, `R7`, `FS3`, `RS9`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unresolved() -> Self {
        Self(UNRESOLVED_CHANNEL.to_string())
    }

    pub fn is_resolved(&self) -> bool {
        self.0 != UNRESOLVED_CHANNEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a channel from candidate fields, checked in order.
///
/// The first field in which any pattern matches decides the result; within a
/// field the earliest pattern in [`CHANNEL_PATTERNS`] wins. Empty fields are
/// skipped. Falls back to [`Channel::unresolved`].
pub fn resolve_channel<'a, I>(fields: I) -> Channel
where
    I: IntoIterator<Item = &'a str>,
{
    for field in fields {
        if field.is_empty() {
            continue;
        }
        for regex in CHANNEL_REGEXES.iter() {
            if let Some(caps) = regex.captures(field) {
                return Channel::new(&caps[1]);
            }
        }
    }
    Channel::unresolved()
}
