// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Domain Decomposition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cartesian domain decomposition and padded tile buffers.
//!
//! The global N × N grid keeps its outermost ring fixed. The (N-2) × (N-2)
//! interior is split evenly across the (R × C) process grid; each tile is
//! stored with a one-cell halo so that padded local cell (i, j) mirrors
//! global cell (origin_row + i, origin_col + j). On the domain edge that
//! halo lies on the fixed frame.

use crate::descriptor::TransferDescriptor;
use crate::topology::{Direction, ProcessTopology};
use halo_types::error::{HaloError, HaloResult};
use halo_types::state::InitialFields;
use ndarray::Array2;

/// Halo width on every face.
pub const HALO: usize = 1;

/// Geometry of one worker's tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Global grid side N.
    pub grid_size: usize,
    /// Owned rows.
    pub height: usize,
    /// Owned columns.
    pub width: usize,
    /// Interior-space origin of the owned block; also the global
    /// coordinate of padded cell (0, 0).
    pub origin_row: usize,
    pub origin_col: usize,
}

impl TileGeometry {
    /// Row pitch of the padded buffer.
    pub fn pitch(&self) -> usize {
        self.width + 2 * HALO
    }

    pub fn padded_shape(&self) -> (usize, usize) {
        (self.height + 2 * HALO, self.width + 2 * HALO)
    }

    /// Flat index of padded cell (i, j).
    pub fn flat(&self, i: usize, j: usize) -> usize {
        i * self.pitch() + j
    }

    /// Global row of padded row `i`.
    pub fn global_row(&self, i: usize) -> usize {
        self.origin_row + i
    }

    /// Global column of padded column `j`.
    pub fn global_col(&self, j: usize) -> usize {
        self.origin_col + j
    }

    /// Global coordinate of the first owned cell.
    pub fn owned_origin(&self) -> (usize, usize) {
        (self.origin_row + HALO, self.origin_col + HALO)
    }

    pub fn owned_cells(&self) -> usize {
        self.height * self.width
    }

    /// The block this worker contributes to the assembled grid: its owned
    /// cells plus the halo strips that lie on the global frame.
    ///
    /// Returns the local descriptor (row stride = pitch) and the matching
    /// global descriptor (row stride = N).
    pub fn contribution(
        &self,
        topo: &ProcessTopology,
    ) -> (TransferDescriptor, TransferDescriptor) {
        // Halo extent included on a side: 0 towards a neighbour, HALO on
        // the frame.
        let extra = |dir: Direction| {
            if topo.neighbor(dir).is_none() {
                HALO
            } else {
                0
            }
        };
        let top = HALO - extra(Direction::Up);
        let left = HALO - extra(Direction::Left);
        let rows = extra(Direction::Up) + self.height + extra(Direction::Down);
        let cols = extra(Direction::Left) + self.width + extra(Direction::Right);

        let local = TransferDescriptor::block(self.flat(top, left), rows, cols, self.pitch());
        let global_offset = self.global_row(top) * self.grid_size + self.global_col(left);
        let global = TransferDescriptor::block(global_offset, rows, cols, self.grid_size);
        (local, global)
    }
}

fn interior_split(grid_size: usize, parts: usize, axis: &str) -> HaloResult<usize> {
    let interior = grid_size - 2 * HALO;
    if interior % parts != 0 {
        return Err(HaloError::Decomposition(format!(
            "interior {axis} extent {interior} (grid {grid_size}) is not divisible by {parts} process {axis}s"
        )));
    }
    let tile = interior / parts;
    if tile == 0 {
        return Err(HaloError::Decomposition(format!(
            "cannot split interior {axis} extent {interior} across {parts} process {axis}s"
        )));
    }
    Ok(tile)
}

/// Tile geometry of the worker described by `topo`.
pub fn decompose(grid_size: usize, topo: &ProcessTopology) -> HaloResult<TileGeometry> {
    if grid_size < 1 + 2 * HALO {
        return Err(HaloError::Decomposition(format!(
            "grid size {grid_size} leaves no interior to relax"
        )));
    }
    let (rows, cols) = topo.dims;
    let height = interior_split(grid_size, rows, "row")?;
    let width = interior_split(grid_size, cols, "column")?;
    let (row, col) = topo.coords;
    Ok(TileGeometry {
        grid_size,
        height,
        width,
        origin_row: row * height,
        origin_col: col * width,
    })
}

/// Geometry of every worker in rank order.
pub fn decompose_all(grid_size: usize, dims: (usize, usize)) -> HaloResult<Vec<TileGeometry>> {
    let size = dims.0 * dims.1;
    (0..size)
        .map(|rank| {
            let topo = ProcessTopology::with_dims(rank, size, dims)?;
            decompose(grid_size, &topo)
        })
        .collect()
}

/// The two ping-pong buffers of one worker.
///
/// Only the `active` flag changes between generations; buffers are never
/// copied or aliased.
#[derive(Debug, Clone)]
pub struct TilePair {
    buffers: [Array2<f64>; 2],
    active: usize,
}

impl TilePair {
    /// Allocate both padded buffers and set every cell, halo included,
    /// from the closed-form initial fields.
    pub fn allocate(geom: &TileGeometry, fields: &InitialFields) -> Self {
        let (nrows, ncols) = geom.padded_shape();
        let a = fields.a.window(geom.origin_row, geom.origin_col, nrows, ncols);
        let b = fields.b.window(geom.origin_row, geom.origin_col, nrows, ncols);
        Self {
            buffers: [a, b],
            active: 0,
        }
    }

    pub fn from_buffers(a: Array2<f64>, b: Array2<f64>) -> HaloResult<Self> {
        if a.dim() != b.dim() {
            return Err(HaloError::Shape(format!(
                "ping-pong buffers differ in shape: {:?} vs {:?}",
                a.dim(),
                b.dim()
            )));
        }
        Ok(Self {
            buffers: [a, b],
            active: 0,
        })
    }

    pub fn active(&self) -> &Array2<f64> {
        &self.buffers[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Array2<f64> {
        &mut self.buffers[self.active]
    }

    pub fn inactive(&self) -> &Array2<f64> {
        &self.buffers[1 - self.active]
    }

    /// Index (0 = A, 1 = B) of the active buffer.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Borrow the active buffer for reading and the other for writing.
    pub fn split(&mut self) -> (&Array2<f64>, &mut Array2<f64>) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.active == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }

    pub fn into_active(self) -> Array2<f64> {
        let [a, b] = self.buffers;
        if self.active == 0 {
            a
        } else {
            b
        }
    }
}
