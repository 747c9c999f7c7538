// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Jacobi Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 5-point Jacobi relaxation on a padded tile.
//!
//! ```text
//! dst[i][j] = 0.2 · (src[i][j] + src[i][j-1] + src[i][j+1] + src[i+1][j] + src[i-1][j])
//! ```
//!
//! Only owned cells (1..=h, 1..=w) of `dst` are written. The halo ring of
//! `src` is read, so it must be current before a sweep starts.

use crate::decomp::TilePair;
use ndarray::Array2;
use rayon::prelude::*;

/// Equal weight of the centre and the four face neighbours.
pub const WEIGHT: f64 = 0.2;

#[inline]
fn relax_cell(src: &Array2<f64>, i: usize, j: usize) -> f64 {
    WEIGHT
        * (src[[i, j]]
            + src[[i, j - 1]]
            + src[[i, j + 1]]
            + src[[i + 1, j]]
            + src[[i - 1, j]])
}

/// One sweep over the owned cells, reading `src` and writing `dst`.
pub fn sweep(src: &Array2<f64>, dst: &mut Array2<f64>) {
    debug_assert_eq!(src.dim(), dst.dim(), "sweep buffers differ in shape");
    let (nrows, ncols) = src.dim();
    for i in 1..nrows.saturating_sub(1) {
        for j in 1..ncols.saturating_sub(1) {
            dst[[i, j]] = relax_cell(src, i, j);
        }
    }
}

/// Same as [`sweep`] with owned rows split across the rayon pool.
///
/// Each row of `dst` is written by exactly one task, so the result is
/// bit-identical to the serial sweep.
pub fn sweep_parallel(src: &Array2<f64>, dst: &mut Array2<f64>) {
    debug_assert_eq!(src.dim(), dst.dim(), "sweep buffers differ in shape");
    let (nrows, ncols) = src.dim();
    if nrows < 3 || ncols < 3 {
        return;
    }
    match dst.as_slice_mut() {
        Some(flat) => flat
            .par_chunks_mut(ncols)
            .enumerate()
            .skip(1)
            .take(nrows - 2)
            .for_each(|(i, row)| {
                for (j, cell) in row.iter_mut().enumerate().take(ncols - 1).skip(1) {
                    *cell = relax_cell(src, i, j);
                }
            }),
        // Rows are not contiguous; fall back to the indexed sweep.
        None => sweep(src, dst),
    }
}

impl TilePair {
    /// Sweep active → inactive, then swap roles.
    pub fn step(&mut self, parallel: bool) {
        {
            let (src, dst) = self.split();
            if parallel {
                sweep_parallel(src, dst);
            } else {
                sweep(src, dst);
            }
        }
        self.swap();
    }
}
