// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Grid Output
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Plain-text grid dump and grid comparison helpers.
//!
//! Format: one grid row per line, values separated by single spaces.
//! Blank lines and lines starting with `#` are ignored on read.

use halo_types::error::{HaloError, HaloResult};
use ndarray::{Array2, Zip};
use std::io::{BufRead, Write};

/// Write `grid` row by row with `precision` fractional digits.
pub fn write_grid<W: Write>(grid: &Array2<f64>, mut out: W, precision: usize) -> HaloResult<()> {
    let mut line = String::new();
    for row in grid.rows() {
        line.clear();
        for (j, v) in row.iter().enumerate() {
            if j > 0 {
                line.push(' ');
            }
            line.push_str(&format!("{v:.precision$}"));
        }
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Parse a grid written by [`write_grid`].
pub fn read_grid<R: BufRead>(input: R) -> HaloResult<Array2<f64>> {
    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0usize;

    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|e| {
                    HaloError::Parse(format!("line {}: '{tok}': {e}", lineno + 1))
                })
            })
            .collect::<HaloResult<_>>()?;
        match ncols {
            None => ncols = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(HaloError::Parse(format!(
                    "line {}: expected {n} values, found {}",
                    lineno + 1,
                    row.len()
                )));
            }
            Some(_) => {}
        }
        values.extend(row);
        nrows += 1;
    }

    let ncols = ncols.unwrap_or(0);
    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| HaloError::Parse(format!("grid shape {nrows}x{ncols}: {e}")))
}

/// Cell-wise difference between two grids of equal shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDelta {
    /// Largest absolute difference.
    pub max_abs: f64,
    /// Euclidean norm of the difference.
    pub l2: f64,
}

impl GridDelta {
    /// True when the largest difference is at most `tolerance`. A NaN
    /// delta never passes.
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_abs <= tolerance
    }
}

/// Compare `a` against `b` in one pass. A NaN in either grid makes both
/// fields NaN.
pub fn grid_delta(a: &Array2<f64>, b: &Array2<f64>) -> HaloResult<GridDelta> {
    if a.dim() != b.dim() {
        return Err(HaloError::Shape(format!(
            "cannot compare a {:?} grid with a {:?} grid",
            a.dim(),
            b.dim()
        )));
    }
    let (max_abs, sum_sq) = Zip::from(a)
        .and(b)
        .fold((0.0f64, 0.0f64), |(max_abs, sum_sq), &x, &y| {
            let d = (x - y).abs();
            let max_abs = if d.is_nan() || d > max_abs { d } else { max_abs };
            (max_abs, sum_sq + d * d)
        });
    Ok(GridDelta {
        max_abs,
        l2: sum_sq.sqrt(),
    })
}

pub fn max_abs_delta(a: &Array2<f64>, b: &Array2<f64>) -> HaloResult<f64> {
    grid_delta(a, b).map(|d| d.max_abs)
}
