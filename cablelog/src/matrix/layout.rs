//! Physical position layout of the leakage fixture
//!
//! The DIB fixture exposes 132 probe positions: 66 on the top half (A/B/C
//! rows) and 66 on the bottom half (E/F/G rows). The built-in layout lists
//! them in the order they appear on the heatmap. Other fixtures can supply
//! their own layout as JSON:
//!
//! ```json
//! { "name": "my-fixture", "top": ["A2", "..."], "bottom": ["G2", "..."] }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Positions per matrix row.
pub const ROW_WIDTH: usize = 66;
/// Positions in a complete layout.
pub const LAYOUT_POSITIONS: usize = 2 * ROW_WIDTH;

const DIB_TOP: [&str; ROW_WIDTH] = [
    "A2", "C2", "A4", "C4", "A6", "C6", "A8", "C8", "A13", "C13", "A15", "C15", "A17", "C17",
    "A19", "C19", "A24", "C24", "A26", "C26", "A28", "C28",
    "A30", "C30", "A35", "C35", "A37", "C37", "A39", "C39", "A41", "C41", "A44", "B44", "C47",
    "A47", "C49", "A49", "C51", "A51", "C53", "A53", "C58", "A58",
    "C60", "A60", "C62", "A62", "C64", "A64", "C69", "A69", "C71", "A71", "C73", "A73", "C75",
    "A75", "C80", "A80", "C82", "A82", "C84", "A84", "C86", "A86",
];

const DIB_BOTTOM: [&str; ROW_WIDTH] = [
    "G2", "E2", "G4", "E4", "G6", "E6", "G8", "E8", "G13", "E13", "G15", "E15", "G17", "E17",
    "G19", "E19", "G24", "E24", "G26", "E26", "G28", "E28",
    "G30", "E30", "G35", "E35", "G37", "E37", "G39", "E39", "G41", "E41", "F44", "G44", "E47",
    "G47", "E49", "G49", "E51", "G51", "E53", "G53", "E58", "G58",
    "E60", "G60", "E62", "G62", "E64", "G64", "E69", "G69", "E71", "G71", "E73", "G73", "E75",
    "G75", "E80", "G80", "E82", "G82", "E84", "G84", "E86", "G86",
];

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Layout '{name}' has {found} {half} positions, expected {}", ROW_WIDTH)]
    WrongCount {
        name: String,
        half: &'static str,
        found: usize,
    },
    #[error("Layout '{0}' has an empty position label")]
    EmptyLabel(String),
    #[error("Layout '{name}' lists position {label} more than once")]
    Duplicate { name: String, label: String },
}

/// Ordered 132-position layout; `top` fills matrix row 0, `bottom` row 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalLayout {
    pub name: String,
    top: Vec<String>,
    bottom: Vec<String>,
}

impl Default for PhysicalLayout {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PhysicalLayout {
    /// The DIB leakage fixture layout.
    pub fn builtin() -> Self {
        Self {
            name: "dib-132".to_string(),
            top: DIB_TOP.iter().map(|s| s.to_string()).collect(),
            bottom: DIB_BOTTOM.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build a layout from explicit halves, validating it.
    pub fn new(
        name: impl Into<String>,
        top: Vec<String>,
        bottom: Vec<String>,
    ) -> Result<Self, LayoutError> {
        let layout = Self {
            name: name.into(),
            top,
            bottom,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout file.
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let content = std::fs::read_to_string(path)?;
        let layout = Self::from_json_str(&content)?;
        tracing::info!("Loaded layout '{}' from {:?}", layout.name, path);
        Ok(layout)
    }

    /// Check half sizes and label uniqueness.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (half, labels) in [("top", &self.top), ("bottom", &self.bottom)] {
            if labels.len() != ROW_WIDTH {
                return Err(LayoutError::WrongCount {
                    name: self.name.clone(),
                    half,
                    found: labels.len(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(LAYOUT_POSITIONS);
        for label in self.positions() {
            if label.trim().is_empty() {
                return Err(LayoutError::EmptyLabel(self.name.clone()));
            }
            if !seen.insert(label) {
                return Err(LayoutError::Duplicate {
                    name: self.name.clone(),
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    /// All positions, top half first.
    pub fn positions(&self) -> impl Iterator<Item = &str> {
        self.top.iter().chain(self.bottom.iter()).map(String::as_str)
    }

    pub fn top(&self) -> &[String] {
        &self.top
    }

    pub fn bottom(&self) -> &[String] {
        &self.bottom
    }

    pub fn len(&self) -> usize {
        self.top.len() + self.bottom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label at flat index `index` (0..132).
    pub fn get(&self, index: usize) -> Option<&str> {
        if index < self.top.len() {
            self.top.get(index).map(String::as_str)
        } else {
            self.bottom.get(index - self.top.len()).map(String::as_str)
        }
    }
}
