// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — MPI Communicator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `Communicator` over an MPI world communicator.
//!
//! Every exchange posts nonblocking sends and receives inside one request
//! scope and waits on all of them before returning.

use crate::comm::{Communicator, Incoming, Outgoing};
use crate::topology::ProcessTopology;
use halo_types::error::{HaloError, HaloResult};
use mpi::collective::CommunicatorCollectives;
use mpi::datatype::Equivalence;
use mpi::point_to_point::{Destination, Source};
use mpi::request;
use mpi::topology::{Communicator as MpiCommunicator, SimpleCommunicator};

pub struct MpiComm {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
}

impl MpiComm {
    /// Wrap `world`, rejecting a negative rank or a non-positive size.
    pub fn new(world: SimpleCommunicator) -> HaloResult<Self> {
        let topo = ProcessTopology::from_signed(i64::from(world.rank()), i64::from(world.size()))?;
        Ok(Self {
            world,
            rank: topo.rank,
            size: topo.size,
        })
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&self, sends: &[Outgoing<'_>], recvs: &mut [Incoming<'_>]) -> HaloResult<()> {
        let rank = self.rank();
        let mut staging: Vec<Vec<f64>> =
            recvs.iter().map(|op| vec![0.0; op.expected_len]).collect();

        let counts: Vec<i32> = request::scope(|scope| {
            let send_requests: Vec<_> = sends
                .iter()
                .map(|op| {
                    self.world
                        .process_at_rank(op.peer as i32)
                        .immediate_send_with_tag(scope, op.data, i32::from(op.tag))
                })
                .collect();
            let recv_requests: Vec<_> = recvs
                .iter()
                .zip(staging.iter_mut())
                .map(|(op, buf)| {
                    self.world
                        .process_at_rank(op.peer as i32)
                        .immediate_receive_into_with_tag(scope, &mut buf[..], i32::from(op.tag))
                })
                .collect();

            let counts = recv_requests
                .into_iter()
                .map(|req| req.wait().count(f64::equivalent_datatype()))
                .collect();
            for req in send_requests {
                req.wait();
            }
            counts
        });

        for ((op, buf), count) in recvs.iter_mut().zip(staging).zip(counts) {
            if count as usize != op.expected_len {
                return Err(HaloError::Exchange {
                    rank,
                    message: format!(
                        "expected {} values from peer {} (tag {}), got {count}",
                        op.expected_len, op.peer, op.tag
                    ),
                });
            }
            *op.buf = buf;
        }
        Ok(())
    }

    fn barrier(&self) -> HaloResult<()> {
        self.world.barrier();
        Ok(())
    }
}
