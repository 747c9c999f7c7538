// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Closed-form initial value of a grid cell from its global coordinates.
///
/// `value(gr, gc) = (gr * (gc + col_shift) + offset) / scale`
///
/// Every worker evaluates the same function at the global coordinate of
/// each of its padded cells, so a distributed run and a single-worker run
/// start from bit-identical input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub col_shift: f64,
    pub offset: f64,
    pub scale: f64,
}

impl FieldInit {
    pub fn new(col_shift: f64, offset: f64, scale: f64) -> Self {
        Self {
            col_shift,
            offset,
            scale,
        }
    }

    #[inline]
    pub fn value(&self, gr: usize, gc: usize) -> f64 {
        (gr as f64 * (gc as f64 + self.col_shift) + self.offset) / self.scale
    }

    /// Fill a `(nrows × ncols)` window whose cell (0, 0) sits at global
    /// coordinate `(row0, col0)`.
    pub fn window(&self, row0: usize, col0: usize, nrows: usize, ncols: usize) -> Array2<f64> {
        Array2::from_shape_fn((nrows, ncols), |(i, j)| self.value(row0 + i, col0 + j))
    }

    /// The full `n × n` global field.
    pub fn global(&self, n: usize) -> Array2<f64> {
        self.window(0, 0, n, n)
    }
}

/// Initial fields of the two ping-pong buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialFields {
    pub a: FieldInit,
    pub b: FieldInit,
}

impl InitialFields {
    /// Reference-kernel initialisation, normalised by the grid size `n`:
    /// A = (i*(j+2)+2)/n, B = (i*(j+3)+3)/n.
    pub fn scaled(n: usize) -> Self {
        let scale = n.max(1) as f64;
        Self {
            a: FieldInit::new(2.0, 2.0, scale),
            b: FieldInit::new(3.0, 3.0, scale),
        }
    }

    /// Same shape functions without the 1/n normalisation.
    pub fn unscaled() -> Self {
        Self {
            a: FieldInit::new(2.0, 2.0, 1.0),
            b: FieldInit::new(3.0, 3.0, 1.0),
        }
    }

    /// Initializer of the buffer that is active after `generations` sweeps.
    pub fn active_after(&self, generations: usize) -> &FieldInit {
        if generations % 2 == 0 {
            &self.a
        } else {
            &self.b
        }
    }
}
