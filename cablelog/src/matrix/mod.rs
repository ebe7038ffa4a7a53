//! Leakage matrix construction
//!
//! Leakage readings are matched to the fixed positions of the test fixture
//! and arranged into a 2x66 grid:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Extracted   │───▶│   Matrix     │───▶│   Renderer   │
//! │    Table     │    │   Builder    │    │  (heatmap)   │
//! └──────────────┘    └──────┬───────┘    └──────────────┘
//!                            │
//!                     ┌──────┴───────┐
//!                     │   Physical   │
//!                     │    Layout    │
//!                     └──────────────┘
//! ```
//!
//! A layout that does not resolve to exactly 132 values is a hard error for
//! that cable; the builder never pads or truncates.

pub mod builder;
pub mod layout;
pub mod render;

pub use builder::{
    CountPolicy, Matrix, MatrixBuilder, MatrixError, MatrixOptions, Resolution, TieBreak,
    DGS_SUFFIX, SIGNAL_SUFFIX,
};
pub use layout::{LayoutError, PhysicalLayout, LAYOUT_POSITIONS, ROW_WIDTH};
pub use render::{MatrixRenderer, TextHeatmap};
