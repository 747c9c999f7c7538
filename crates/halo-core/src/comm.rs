// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Communicators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Message-passing backend abstraction for the distributed stencil.
//!
//! Provides the `Communicator` trait used by halo exchange and gather, a
//! no-op single-worker implementation, and an in-process channel backend
//! that runs one worker per thread.

use crossbeam::channel::{unbounded, Receiver, Sender};
use halo_types::error::{HaloError, HaloResult};

/// Message tag. Halo messages are tagged with their travel direction,
/// gather messages with `GATHER_TAG`.
pub type Tag = u16;

pub const GATHER_TAG: Tag = 64;
pub const BARRIER_TAG: Tag = 65;

/// A send posted as part of an exchange.
#[derive(Debug)]
pub struct Outgoing<'a> {
    pub peer: usize,
    pub tag: Tag,
    pub data: &'a [f64],
}

/// A receive posted as part of an exchange. `buf` is replaced with the
/// payload once the operation completes.
#[derive(Debug)]
pub struct Incoming<'a> {
    pub peer: usize,
    pub tag: Tag,
    pub expected_len: usize,
    pub buf: &'a mut Vec<f64>,
}

/// Abstraction over inter-worker communication.
///
/// Implementations: `SoloComm` (no peers), `ChannelComm` (one thread per
/// worker), `MpiComm` (via the `mpi` crate, feature `mpi`).
pub trait Communicator {
    /// This worker's rank.
    fn rank(&self) -> usize;

    /// Total number of workers.
    fn size(&self) -> usize;

    /// Post every send and every receive, then block until all of them
    /// have completed.
    ///
    /// Sends never wait for the matching receive to be posted, so the
    /// order in which peers call `exchange` cannot deadlock. A receive
    /// whose tag or length differs from what was posted is an error.
    fn exchange(&self, sends: &[Outgoing<'_>], recvs: &mut [Incoming<'_>]) -> HaloResult<()>;

    /// Synchronization barrier across all workers.
    fn barrier(&self) -> HaloResult<()>;
}

fn transfer_error(rank: usize, message: String) -> HaloError {
    HaloError::Exchange { rank, message }
}

/// No-op backend for a single worker.
///
/// There are no peers, so any posted operation is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloComm;

impl Communicator for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(&self, sends: &[Outgoing<'_>], recvs: &mut [Incoming<'_>]) -> HaloResult<()> {
        if let Some(op) = sends.first() {
            return Err(transfer_error(
                0,
                format!("single worker cannot send to peer {}", op.peer),
            ));
        }
        if let Some(op) = recvs.first() {
            return Err(transfer_error(
                0,
                format!("single worker cannot receive from peer {}", op.peer),
            ));
        }
        Ok(())
    }

    fn barrier(&self) -> HaloResult<()> {
        Ok(())
    }
}

struct Envelope {
    tag: Tag,
    payload: Vec<f64>,
}

/// In-process backend: one endpoint per worker, unbounded point-to-point
/// channels for every ordered pair of workers.
///
/// When a worker drops its endpoint (normally or because it failed),
/// receives posted against it report a disconnected peer once its
/// already-sent messages have been drained. The barrier is built from the
/// same channels, so a failed worker also releases peers waiting in it.
pub struct ChannelComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank.
    outboxes: Vec<Option<Sender<Envelope>>>,
    /// Indexed by source rank.
    inboxes: Vec<Option<Receiver<Envelope>>>,
}

impl ChannelComm {
    /// Build the endpoints of a `size`-worker world, in rank order.
    pub fn world(size: usize) -> Vec<ChannelComm> {
        let mut outboxes: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = unbounded();
                outboxes[src][dst] = Some(tx);
                inboxes[dst][src] = Some(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ChannelComm {
                rank,
                size,
                outboxes,
                inboxes,
            })
            .collect()
    }

    fn outbox(&self, peer: usize) -> HaloResult<&Sender<Envelope>> {
        self.outboxes
            .get(peer)
            .and_then(Option::as_ref)
            .ok_or_else(|| transfer_error(self.rank, format!("no channel to peer {peer}")))
    }

    fn inbox(&self, peer: usize) -> HaloResult<&Receiver<Envelope>> {
        self.inboxes
            .get(peer)
            .and_then(Option::as_ref)
            .ok_or_else(|| transfer_error(self.rank, format!("no channel from peer {peer}")))
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&self, sends: &[Outgoing<'_>], recvs: &mut [Incoming<'_>]) -> HaloResult<()> {
        for op in sends {
            let envelope = Envelope {
                tag: op.tag,
                payload: op.data.to_vec(),
            };
            self.outbox(op.peer)?.send(envelope).map_err(|_| {
                transfer_error(self.rank, format!("peer {} is unreachable", op.peer))
            })?;
            tracing::trace!(
                rank = self.rank,
                peer = op.peer,
                tag = op.tag,
                len = op.data.len(),
                "posted send"
            );
        }

        // Wait phase: every send above is already buffered, so receives
        // can complete in any order.
        for op in recvs.iter_mut() {
            let envelope = self.inbox(op.peer)?.recv().map_err(|_| {
                transfer_error(
                    self.rank,
                    format!("peer {} disconnected before sending tag {}", op.peer, op.tag),
                )
            })?;
            if envelope.tag != op.tag {
                return Err(transfer_error(
                    self.rank,
                    format!(
                        "expected tag {} from peer {}, got {}",
                        op.tag, op.peer, envelope.tag
                    ),
                ));
            }
            if envelope.payload.len() != op.expected_len {
                return Err(transfer_error(
                    self.rank,
                    format!(
                        "expected {} values from peer {} (tag {}), got {}",
                        op.expected_len,
                        op.peer,
                        op.tag,
                        envelope.payload.len()
                    ),
                ));
            }
            *op.buf = envelope.payload;
        }
        Ok(())
    }

    /// Every worker checks in with rank 0, which releases all of them once
    /// the last one has arrived.
    fn barrier(&self) -> HaloResult<()> {
        if self.size <= 1 {
            return Ok(());
        }
        let mut tokens: Vec<Vec<f64>> = vec![Vec::new(); self.size - 1];
        if self.rank == 0 {
            let mut arrivals: Vec<Incoming<'_>> = tokens
                .iter_mut()
                .enumerate()
                .map(|(i, buf)| Incoming {
                    peer: i + 1,
                    tag: BARRIER_TAG,
                    expected_len: 0,
                    buf,
                })
                .collect();
            self.exchange(&[], &mut arrivals)?;
            let releases: Vec<Outgoing<'_>> = (1..self.size)
                .map(|peer| Outgoing {
                    peer,
                    tag: BARRIER_TAG,
                    data: &[],
                })
                .collect();
            self.exchange(&releases, &mut [])
        } else {
            let arrive = Outgoing {
                peer: 0,
                tag: BARRIER_TAG,
                data: &[],
            };
            let release = Incoming {
                peer: 0,
                tag: BARRIER_TAG,
                expected_len: 0,
                buf: &mut tokens[0],
            };
            self.exchange(&[arrive], &mut [release])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(peer: usize, tag: Tag, data: &[f64]) -> Outgoing<'_> {
        Outgoing { peer, tag, data }
    }

    fn recv(peer: usize, tag: Tag, expected_len: usize, buf: &mut Vec<f64>) -> Incoming<'_> {
        Incoming {
            peer,
            tag,
            expected_len,
            buf,
        }
    }

    #[test]
    fn solo_rank_and_size() {
        let comm = SoloComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        comm.exchange(&[], &mut []).unwrap();
        comm.barrier().unwrap();
    }

    #[test]
    fn solo_rejects_peer_operations() {
        let comm = SoloComm;
        let data = [1.0];
        let err = comm
            .exchange(&[send(1, 0, &data)], &mut [])
            .expect_err("no peers");
        assert!(matches!(err, HaloError::Exchange { rank: 0, .. }));
    }

    #[test]
    fn channel_roundtrip_two_ranks() {
        let mut world = ChannelComm::world(2);
        let c1 = world.pop().unwrap();
        let c0 = world.pop().unwrap();

        let mut got0 = Vec::new();
        let mut got1 = Vec::new();
        std::thread::scope(|s| {
            s.spawn(|| {
                let payload = [1.0, 2.0, 3.0];
                c0.exchange(
                    &[send(1, 7, &payload)],
                    &mut [recv(1, 8, 2, &mut got0)],
                )
                .unwrap();
            });
            s.spawn(|| {
                let payload = [9.0, 8.0];
                c1.exchange(
                    &[send(0, 8, &payload)],
                    &mut [recv(0, 7, 3, &mut got1)],
                )
                .unwrap();
            });
        });
        assert_eq!(got0, vec![9.0, 8.0]);
        assert_eq!(got1, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn channel_detects_length_mismatch() {
        let world = ChannelComm::world(2);
        world[0]
            .exchange(&[send(1, 1, &[1.0, 2.0])], &mut [])
            .unwrap();
        let mut buf = Vec::new();
        let err = world[1]
            .exchange(&[], &mut [recv(0, 1, 3, &mut buf)])
            .expect_err("length mismatch");
        match err {
            HaloError::Exchange { rank, message } => {
                assert_eq!(rank, 1);
                assert!(message.contains("expected 3"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn channel_detects_tag_mismatch() {
        let world = ChannelComm::world(2);
        world[0].exchange(&[send(1, 2, &[1.0])], &mut []).unwrap();
        let mut buf = Vec::new();
        let err = world[1]
            .exchange(&[], &mut [recv(0, 3, 1, &mut buf)])
            .expect_err("tag mismatch");
        assert!(matches!(err, HaloError::Exchange { .. }));
    }

    #[test]
    fn channel_reports_disconnected_peer() {
        let mut world = ChannelComm::world(2);
        let c1 = world.pop().unwrap();
        drop(world);
        let mut buf = Vec::new();
        let err = c1
            .exchange(&[], &mut [recv(0, 0, 1, &mut buf)])
            .expect_err("peer 0 is gone");
        match err {
            HaloError::Exchange { message, .. } => assert!(message.contains("disconnected")),
            other => panic!("Unexpected error: {other:?}"),
        }
        let err = c1
            .exchange(&[send(0, 0, &[1.0])], &mut [])
            .expect_err("peer 0 is gone");
        assert!(matches!(err, HaloError::Exchange { .. }));
    }

    #[test]
    fn channel_barrier_releases_all_workers() {
        let world = ChannelComm::world(4);
        std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .map(|comm| s.spawn(move || (0..3).try_for_each(|_| comm.barrier())))
                .collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
        });
    }

    #[test]
    fn channel_barrier_fails_when_peer_is_gone() {
        let mut world = ChannelComm::world(3);
        let c1 = world.remove(1);
        drop(world);
        let err = c1.barrier().expect_err("rank 0 is gone");
        assert!(matches!(err, HaloError::Exchange { rank: 1, .. }));
    }

    #[test]
    fn channel_rejects_self_and_unknown_peers() {
        let world = ChannelComm::world(3);
        assert!(world[0].exchange(&[send(0, 0, &[])], &mut []).is_err());
        assert!(world[0].exchange(&[send(5, 0, &[])], &mut []).is_err());
    }
}
