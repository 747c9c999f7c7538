// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Gather & Scatter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reassembly of the global grid on the coordinator, and the inverse
//! split of an existing global grid into worker tiles.

use crate::comm::{Communicator, Incoming, Outgoing, GATHER_TAG};
use crate::decomp::{decompose_all, TileGeometry, TilePair};
use crate::descriptor::TransferDescriptor;
use crate::topology::ProcessTopology;
use halo_types::error::{HaloError, HaloResult};
use ndarray::{s, Array2};

fn flat(tile: &Array2<f64>) -> HaloResult<&[f64]> {
    tile.as_slice()
        .ok_or_else(|| HaloError::Gather("tile buffer is not contiguous".to_string()))
}

/// Collect every worker's contribution block into the `N × N` grid.
///
/// Returns `Some(grid)` on the coordinator and `None` elsewhere.
pub fn gather<C: Communicator + ?Sized>(
    comm: &C,
    topo: &ProcessTopology,
    geom: &TileGeometry,
    tile: &Array2<f64>,
) -> HaloResult<Option<Array2<f64>>> {
    let (local, global) = geom.contribution(topo);
    let data = flat(tile)?;

    if !topo.is_coordinator() {
        let mut block = Vec::with_capacity(local.len());
        local.pack(data, &mut block)?;
        let send = Outgoing {
            peer: 0,
            tag: GATHER_TAG,
            data: &block,
        };
        comm.exchange(&[send], &mut [])
            .map_err(|e| HaloError::Gather(format!("rank {} sending block: {e}", topo.rank)))?;
        tracing::debug!(rank = topo.rank, len = block.len(), "sent gather block");
        return Ok(None);
    }

    let n = geom.grid_size;
    let mut grid = vec![0.0; n * n];
    TransferDescriptor::copy(data, &local, &mut grid, &global)?;

    let geoms = decompose_all(n, topo.dims)?;
    let mut plans: Vec<(usize, TransferDescriptor)> =
        Vec::with_capacity(topo.size.saturating_sub(1));
    for (rank, g) in geoms.iter().enumerate().skip(1) {
        let peer = topo.for_rank(rank)?;
        let (_, dst) = g.contribution(&peer);
        plans.push((rank, dst));
    }

    let mut blocks: Vec<Vec<f64>> = plans
        .iter()
        .map(|(_, d)| Vec::with_capacity(d.len()))
        .collect();
    {
        let mut recvs: Vec<Incoming<'_>> = plans
            .iter()
            .zip(blocks.iter_mut())
            .map(|((rank, dst), buf)| Incoming {
                peer: *rank,
                tag: GATHER_TAG,
                expected_len: dst.len(),
                buf,
            })
            .collect();
        comm.exchange(&[], &mut recvs)
            .map_err(|e| HaloError::Gather(format!("coordinator receiving blocks: {e}")))?;
    }

    for ((rank, dst), block) in plans.iter().zip(&blocks) {
        if block.len() != dst.len() {
            return Err(HaloError::Gather(format!(
                "rank {rank} contributed {} values, expected {}",
                block.len(),
                dst.len()
            )));
        }
        dst.unpack(block, &mut grid)?;
    }
    tracing::debug!(workers = topo.size, grid_size = n, "assembled global grid");

    Array2::from_shape_vec((n, n), grid)
        .map(Some)
        .map_err(|e| HaloError::Gather(format!("assembled grid has wrong shape: {e}")))
}

/// Build one worker's buffers from an existing global grid.
///
/// Both buffers start as the padded window of `global` around the
/// worker's tile, so the frame seen by either buffer is the input frame.
pub fn scatter(global: &Array2<f64>, geom: &TileGeometry) -> HaloResult<TilePair> {
    let n = geom.grid_size;
    if global.dim() != (n, n) {
        return Err(HaloError::Shape(format!(
            "scatter expects a {n}x{n} grid, got {:?}",
            global.dim()
        )));
    }
    let (nrows, ncols) = geom.padded_shape();
    let (r0, c0) = (geom.origin_row, geom.origin_col);
    let a = global.slice(s![r0..r0 + nrows, c0..c0 + ncols]).to_owned();
    let b = a.clone();
    TilePair::from_buffers(a, b)
}
