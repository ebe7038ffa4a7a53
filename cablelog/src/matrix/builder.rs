//! Matrix construction from leakage readings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::layout::{LayoutError, PhysicalLayout, LAYOUT_POSITIONS, ROW_WIDTH};
use crate::parser::extractor::{format_value, ExtractedTable};

/// Point-label suffix of signal-conductor readings.
pub const SIGNAL_SUFFIX: &str = " (DIB - SIGNAL)";
/// Point-label suffix of drain/ground-shield readings.
pub const DGS_SUFFIX: &str = " (DIB - DGS)";

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error(
        "Resolved {positions} of {expected} layout positions from {readings} readings; \
         refusing to reshape into 2x{}",
        ROW_WIDTH
    )]
    LayoutMismatch {
        positions: usize,
        readings: usize,
        expected: usize,
    },
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// Which reading a position keeps when several match it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Later readings (and DGS over SIGNAL within a reading) overwrite earlier ones
    #[default]
    LastWins,
    FirstWins,
}

/// What the 132-value invariant is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// Every position filled and exactly 132 readings matched a position.
    /// Surplus readings for an already-filled position are an error.
    #[default]
    Readings,
    /// Every position filled; surplus readings are settled by the tie-break.
    Positions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixOptions {
    pub tie_break: TieBreak,
    pub count_policy: CountPolicy,
}

/// Result of matching readings against the layout, before the count check.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// One slot per layout position, in layout order.
    pub values: Vec<Option<f64>>,
    /// Readings that matched at least one position.
    pub matched_readings: usize,
}

impl Resolution {
    pub fn filled(&self) -> usize {
        self.values.iter().flatten().count()
    }
}

/// Fixed 2x66 grid of canonical currents; row 0 is the top half of the layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    rows: Vec<Vec<f64>>,
}

impl Matrix {
    fn from_flat(values: Vec<f64>) -> Self {
        Self {
            rows: values.chunks(ROW_WIDTH).map(<[f64]>::to_vec).collect(),
        }
    }

    /// Row 0 (top) or 1 (bottom); `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// All values row-major, i.e. in layout order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flatten().copied()
    }

    /// Two CSV lines of 66 values each.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for row in &self.rows {
            csv.write_record(row.iter().map(|v| format_value(*v)))?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Maps point-labelled readings onto a [`PhysicalLayout`].
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    layout: PhysicalLayout,
    options: MatrixOptions,
    /// `[SIGNAL, DGS]` needles per position, in layout order.
    needles: Vec<[String; 2]>,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        Self::new(PhysicalLayout::builtin())
    }
}

impl MatrixBuilder {
    pub fn new(layout: PhysicalLayout) -> Self {
        Self::with_options(layout, MatrixOptions::default())
    }

    pub fn with_options(layout: PhysicalLayout, options: MatrixOptions) -> Self {
        let needles = layout
            .positions()
            .map(|p| [format!("{p}{SIGNAL_SUFFIX}"), format!("{p}{DGS_SUFFIX}")])
            .collect();
        Self {
            layout,
            options,
            needles,
        }
    }

    pub fn layout(&self) -> &PhysicalLayout {
        &self.layout
    }

    pub fn options(&self) -> MatrixOptions {
        self.options
    }

    /// Assign readings to positions by substring match on the point label.
    pub fn resolve<'r, I>(&self, readings: I) -> Resolution
    where
        I: IntoIterator<Item = (&'r str, f64)>,
    {
        let mut values = vec![None; self.needles.len()];
        let mut matched_readings = 0;

        for (label, current) in readings {
            let mut matched = false;
            for (slot, needles) in values.iter_mut().zip(&self.needles) {
                for needle in needles {
                    if !label.contains(needle.as_str()) {
                        continue;
                    }
                    matched = true;
                    match self.options.tie_break {
                        TieBreak::LastWins => *slot = Some(current),
                        TieBreak::FirstWins => {
                            slot.get_or_insert(current);
                        }
                    }
                }
            }
            if matched {
                matched_readings += 1;
            }
        }

        Resolution {
            values,
            matched_readings,
        }
    }

    /// Resolve readings and reshape them into a 2x66 matrix.
    pub fn build<'r, I>(&self, readings: I) -> Result<Matrix, MatrixError>
    where
        I: IntoIterator<Item = (&'r str, f64)>,
    {
        let resolution = self.resolve(readings);
        let filled: Vec<f64> = resolution.values.iter().flatten().copied().collect();

        let readings_ok = match self.options.count_policy {
            CountPolicy::Readings => resolution.matched_readings == LAYOUT_POSITIONS,
            CountPolicy::Positions => true,
        };
        if filled.len() != LAYOUT_POSITIONS || !readings_ok {
            return Err(MatrixError::LayoutMismatch {
                positions: filled.len(),
                readings: resolution.matched_readings,
                expected: LAYOUT_POSITIONS,
            });
        }

        Ok(Matrix::from_flat(filled))
    }

    /// Build from the measured values of an extracted leakage table.
    pub fn build_from_table(&self, table: &ExtractedTable) -> Result<Matrix, MatrixError> {
        self.build(table.point_readings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_readings(layout: &PhysicalLayout) -> Vec<(String, f64)> {
        layout
            .positions()
            .enumerate()
            .map(|(i, p)| {
                let suffix = if i % 2 == 0 { SIGNAL_SUFFIX } else { DGS_SUFFIX };
                (format!("{p}{suffix}"), i as f64)
            })
            .collect()
    }

    fn as_refs(readings: &[(String, f64)]) -> impl Iterator<Item = (&str, f64)> {
        readings.iter().map(|(l, v)| (l.as_str(), *v))
    }

    #[test]
    fn test_full_layout_reshapes_row_major() {
        let builder = MatrixBuilder::default();
        let mut readings = full_readings(builder.layout());
        readings.reverse();

        let matrix = builder.build(as_refs(&readings)).unwrap();
        assert_eq!(matrix.rows().len(), 2);
        assert_eq!(matrix.row(0).map(<[f64]>::len), Some(ROW_WIDTH));
        assert_eq!(matrix.row(1).map(<[f64]>::len), Some(ROW_WIDTH));
        assert!(matrix.row(2).is_none());
        for k in 0..ROW_WIDTH {
            assert_eq!(matrix.get(0, k), Some(k as f64));
            assert_eq!(matrix.get(1, k), Some((ROW_WIDTH + k) as f64));
        }
    }

    #[test]
    fn test_missing_position_is_fatal() {
        let builder = MatrixBuilder::default();
        let mut readings = full_readings(builder.layout());
        readings.pop();

        let err = builder.build(as_refs(&readings)).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::LayoutMismatch { positions: 131, readings: 131, expected: 132 }
        ));
    }

    #[test]
    fn test_surplus_reading_is_fatal_by_default() {
        let builder = MatrixBuilder::default();
        let mut readings = full_readings(builder.layout());
        readings.push((format!("A2{DGS_SUFFIX}"), 99.0));

        let err = builder.build(as_refs(&readings)).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::LayoutMismatch { positions: 132, readings: 133, .. }
        ));
    }

    #[test]
    fn test_tie_break_under_position_policy() {
        let layout = PhysicalLayout::builtin();
        let mut readings = full_readings(&layout);
        readings.push((format!("A2{DGS_SUFFIX}"), 99.0));

        let last = MatrixBuilder::with_options(
            layout.clone(),
            MatrixOptions {
                tie_break: TieBreak::LastWins,
                count_policy: CountPolicy::Positions,
            },
        );
        assert_eq!(last.build(as_refs(&readings)).unwrap().get(0, 0), Some(99.0));

        let first = MatrixBuilder::with_options(
            layout,
            MatrixOptions {
                tie_break: TieBreak::FirstWins,
                count_policy: CountPolicy::Positions,
            },
        );
        assert_eq!(first.build(as_refs(&readings)).unwrap().get(0, 0), Some(0.0));
    }

    #[test]
    fn test_suffix_required() {
        let builder = MatrixBuilder::default();
        let resolution = builder.resolve([("A2", 1.0), ("A2 (DIB - OTHER)", 2.0)]);
        assert_eq!(resolution.filled(), 0);
        assert_eq!(resolution.matched_readings, 0);
    }

    #[test]
    fn test_similar_labels_do_not_collide() {
        let builder = MatrixBuilder::default();
        let resolution = builder.resolve([("A24 (DIB - SIGNAL)", 5.0)]);
        assert_eq!(resolution.filled(), 1);
        let index = builder.layout().positions().position(|p| p == "A24").unwrap();
        assert_eq!(resolution.values[index], Some(5.0));
    }

    #[test]
    fn test_matrix_csv() {
        let builder = MatrixBuilder::default();
        let readings = full_readings(builder.layout());
        let matrix = builder.build(as_refs(&readings)).unwrap();

        let mut buf = Vec::new();
        matrix.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0.0,1.0,2.0"));
        assert_eq!(lines[1].split(',').count(), ROW_WIDTH);
    }
}
