//! Matrix rendering.

use crate::matrix::builder::Matrix;

/// Turns a finished matrix into something viewable. Renderers never parse or
/// normalize; they receive canonical picoamp values.
pub trait MatrixRenderer {
    type Output;

    fn render(&self, matrix: &Matrix, cable_id: &str) -> Self::Output;
}

/// Seven-step ramp, low to high.
const RAMP: [char; 7] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇'];

/// Terminal heatmap with a fixed color range.
#[derive(Debug, Clone, Copy)]
pub struct TextHeatmap {
    /// Divisor applied to picoamp values before scaling (1000 renders nA).
    pub divisor: f64,
    pub vmin: f64,
    pub vmax: f64,
    pub unit: &'static str,
}

impl Default for TextHeatmap {
    fn default() -> Self {
        Self {
            divisor: 1000.0,
            vmin: 0.0,
            vmax: 6.0,
            unit: "nA",
        }
    }
}

impl TextHeatmap {
    fn cell(&self, picoamps: f64) -> char {
        let value = picoamps / self.divisor;
        if !value.is_finite() {
            return '?';
        }
        let span = self.vmax - self.vmin;
        let t = if span > 0.0 {
            ((value - self.vmin) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        RAMP[(t * (RAMP.len() - 1) as f64).round() as usize]
    }
}

impl MatrixRenderer for TextHeatmap {
    type Output = String;

    fn render(&self, matrix: &Matrix, cable_id: &str) -> String {
        let mut out = format!("Heatmap for cable with SN: {}\n", cable_id);
        for (name, row) in ["top", "bottom"].iter().zip(matrix.rows()) {
            let cells: String = row.iter().map(|v| self.cell(*v)).collect();
            out.push_str(&format!("{:<7}|{}|\n", name, cells));
        }
        let ramp: String = RAMP.iter().collect();
        out.push_str(&format!(
            "scale  {} {} {} {}\n",
            self.vmin, self.unit, ramp, self.vmax
        ));
        out
    }
}
