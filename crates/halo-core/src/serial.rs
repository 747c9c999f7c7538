// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Serial Baseline
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Single-node reference: the whole N × N grid relaxed in one process.
//!
//! The outer ring plays the role of the halo, so the same kernel applies
//! and the frame is never written.

use crate::decomp::TilePair;
use halo_types::error::HaloResult;
use halo_types::state::{FieldInit, InitialFields};
use ndarray::Array2;

pub fn initial_grid(n: usize, field: &FieldInit) -> Array2<f64> {
    field.global(n)
}

/// Relax from arbitrary start buffers; returns the buffer active after
/// `generations` sweeps.
pub fn relax(a: Array2<f64>, b: Array2<f64>, generations: usize) -> HaloResult<Array2<f64>> {
    let mut tiles = TilePair::from_buffers(a, b)?;
    for _ in 0..generations {
        tiles.step(false);
    }
    Ok(tiles.into_active())
}

/// Reference result after `generations` sweeps from the closed-form
/// initial fields.
pub fn run(n: usize, generations: usize, fields: &InitialFields) -> HaloResult<Array2<f64>> {
    relax(
        initial_grid(n, &fields.a),
        initial_grid(n, &fields.b),
        generations,
    )
}
