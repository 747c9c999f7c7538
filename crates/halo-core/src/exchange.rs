// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Halo Exchange
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-generation refresh of the halo ring from face neighbours.
//!
//! The plan is built once per worker. Each generation packs the owned
//! boundary strips of the active buffer, posts all sends and receives in a
//! single communicator call, and unpacks the received strips into the halo.

use crate::comm::{Communicator, Incoming, Outgoing, Tag};
use crate::decomp::TileGeometry;
use crate::descriptor::TransferDescriptor;
use crate::topology::{Direction, ProcessTopology};
use halo_types::error::{HaloError, HaloResult};
use ndarray::Array2;

/// Tag of a halo message travelling in `dir`.
pub fn direction_tag(dir: Direction) -> Tag {
    dir.index() as Tag
}

/// Transfers across one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceTransfer {
    pub face: Direction,
    pub peer: usize,
    /// Owned boundary strip sent to `peer`.
    pub send: TransferDescriptor,
    /// Halo strip filled from `peer`.
    pub recv: TransferDescriptor,
}

impl FaceTransfer {
    /// Our strip travels towards the face.
    pub fn send_tag(&self) -> Tag {
        direction_tag(self.face)
    }

    /// The neighbour's strip travels the opposite way.
    pub fn recv_tag(&self) -> Tag {
        direction_tag(self.face.opposite())
    }
}

/// Static halo transfer plan of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloPlan {
    rank: usize,
    faces: Vec<FaceTransfer>,
}

impl HaloPlan {
    pub fn new(topo: &ProcessTopology, geom: &TileGeometry) -> Self {
        let (h, w, pitch) = (geom.height, geom.width, geom.pitch());
        let faces = Direction::ALL
            .iter()
            .filter_map(|&face| {
                let peer = topo.neighbor(face)?;
                let (send, recv) = match face {
                    Direction::Up => (
                        TransferDescriptor::row(geom.flat(1, 1), w),
                        TransferDescriptor::row(geom.flat(0, 1), w),
                    ),
                    Direction::Down => (
                        TransferDescriptor::row(geom.flat(h, 1), w),
                        TransferDescriptor::row(geom.flat(h + 1, 1), w),
                    ),
                    Direction::Left => (
                        TransferDescriptor::column(geom.flat(1, 1), h, pitch),
                        TransferDescriptor::column(geom.flat(1, 0), h, pitch),
                    ),
                    Direction::Right => (
                        TransferDescriptor::column(geom.flat(1, w), h, pitch),
                        TransferDescriptor::column(geom.flat(1, w + 1), h, pitch),
                    ),
                };
                Some(FaceTransfer {
                    face,
                    peer,
                    send,
                    recv,
                })
            })
            .collect();
        Self {
            rank: topo.rank,
            faces,
        }
    }

    pub fn faces(&self) -> &[FaceTransfer] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Halo exchange engine with reusable staging buffers.
#[derive(Debug)]
pub struct HaloExchange {
    plan: HaloPlan,
    send_bufs: Vec<Vec<f64>>,
    recv_bufs: Vec<Vec<f64>>,
}

impl HaloExchange {
    pub fn new(plan: HaloPlan) -> Self {
        let send_bufs = plan.faces.iter().map(|f| Vec::with_capacity(f.send.len())).collect();
        let recv_bufs = plan.faces.iter().map(|f| Vec::with_capacity(f.recv.len())).collect();
        Self {
            plan,
            send_bufs,
            recv_bufs,
        }
    }

    pub fn plan(&self) -> &HaloPlan {
        &self.plan
    }

    /// Refresh every halo strip of `tile` that faces a neighbour.
    ///
    /// Returns only after all sends and receives have completed. Halo
    /// strips on the domain edge are left untouched.
    pub fn exchange<C: Communicator + ?Sized>(
        &mut self,
        comm: &C,
        tile: &mut Array2<f64>,
    ) -> HaloResult<()> {
        if self.plan.is_empty() {
            return Ok(());
        }
        let rank = self.plan.rank;
        let stage = |message: String| HaloError::Exchange { rank, message };

        let flat = tile
            .as_slice_mut()
            .ok_or_else(|| stage("tile buffer is not contiguous".to_string()))?;

        for (face, buf) in self.plan.faces.iter().zip(self.send_bufs.iter_mut()) {
            face.send
                .pack(flat, buf)
                .map_err(|e| stage(format!("packing {:?} strip: {e}", face.face)))?;
        }

        let sends: Vec<Outgoing<'_>> = self
            .plan
            .faces
            .iter()
            .zip(&self.send_bufs)
            .map(|(face, buf)| Outgoing {
                peer: face.peer,
                tag: face.send_tag(),
                data: buf,
            })
            .collect();
        let mut recvs: Vec<Incoming<'_>> = self
            .plan
            .faces
            .iter()
            .zip(self.recv_bufs.iter_mut())
            .map(|(face, buf)| Incoming {
                peer: face.peer,
                tag: face.recv_tag(),
                expected_len: face.recv.len(),
                buf,
            })
            .collect();

        comm.exchange(&sends, &mut recvs)?;
        drop(recvs);

        for (face, buf) in self.plan.faces.iter().zip(&self.recv_bufs) {
            face.recv
                .unpack(buf, flat)
                .map_err(|e| stage(format!("unpacking {:?} halo: {e}", face.face)))?;
        }
        tracing::trace!(rank, faces = self.plan.faces.len(), "halo exchange complete");
        Ok(())
    }
}
