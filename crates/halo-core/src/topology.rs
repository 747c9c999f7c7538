// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Process Topology
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 2D Cartesian process topology.
//!
//! Workers are enumerated row-major on an (R × C) process grid. Each one
//! knows its coordinate and its four face neighbours; faces on the domain
//! edge have no neighbour and never take part in a transfer.

use halo_types::error::{HaloError, HaloResult};

/// Face of a tile, also used as the travel direction of a halo message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Offset (drow, dcol) on the process grid.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Process-grid shape closest to square for `size` workers.
///
/// Starts from `floor(sqrt(size))` rows and steps down until the row count
/// divides `size` exactly.
pub fn dims_create(size: usize) -> HaloResult<(usize, usize)> {
    if size == 0 {
        return Err(HaloError::Topology("worker count must be >= 1".to_string()));
    }
    let mut rows = (size as f64).sqrt().floor() as usize;
    // Guard against sqrt rounding for large perfect squares.
    while (rows + 1) * (rows + 1) <= size {
        rows += 1;
    }
    while rows > 1 && size % rows != 0 {
        rows -= 1;
    }
    let rows = rows.max(1);
    Ok((rows, size / rows))
}

/// Immutable description of one worker's place in the process grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTopology {
    pub rank: usize,
    pub size: usize,
    /// Process-grid dimensions (rows, cols).
    pub dims: (usize, usize),
    /// This worker's (row, col).
    pub coords: (usize, usize),
    /// Neighbour ranks indexed by `Direction::index()`.
    neighbors: [Option<usize>; 4],
}

impl ProcessTopology {
    /// Topology with the near-square process grid.
    pub fn new(rank: usize, size: usize) -> HaloResult<Self> {
        let dims = dims_create(size)?;
        Self::with_dims(rank, size, dims)
    }

    /// Topology with an explicitly requested process grid.
    pub fn with_dims(rank: usize, size: usize, dims: (usize, usize)) -> HaloResult<Self> {
        let (rows, cols) = dims;
        if size == 0 {
            return Err(HaloError::Topology("worker count must be >= 1".to_string()));
        }
        if rows == 0 || cols == 0 {
            return Err(HaloError::Topology(format!(
                "process grid dimensions must be >= 1, got {rows}x{cols}"
            )));
        }
        if rows * cols != size {
            return Err(HaloError::Topology(format!(
                "{size} workers cannot be arranged as a {rows}x{cols} grid"
            )));
        }
        if rank >= size {
            return Err(HaloError::Topology(format!(
                "rank {rank} out of range for {size} workers"
            )));
        }

        let coords = (rank / cols, rank % cols);
        let mut topo = ProcessTopology {
            rank,
            size,
            dims,
            coords,
            neighbors: [None; 4],
        };
        for dir in Direction::ALL {
            topo.neighbors[dir.index()] = topo.shifted(dir);
        }
        Ok(topo)
    }

    /// Adapter for bootstrap layers that report rank and size as signed
    /// integers.
    pub fn from_signed(rank: i64, size: i64) -> HaloResult<Self> {
        if size <= 0 {
            return Err(HaloError::Topology(format!("worker count must be positive, got {size}")));
        }
        if rank < 0 {
            return Err(HaloError::Topology(format!("rank must be non-negative, got {rank}")));
        }
        Self::new(rank as usize, size as usize)
    }

    fn shifted(&self, dir: Direction) -> Option<usize> {
        let (dr, dc) = dir.offset();
        let r = self.coords.0 as i64 + dr;
        let c = self.coords.1 as i64 + dc;
        if r < 0 || r >= self.dims.0 as i64 || c < 0 || c >= self.dims.1 as i64 {
            return None;
        }
        Some(self.rank_of(r as usize, c as usize))
    }

    /// Neighbour rank across the given face, `None` on the domain edge.
    pub fn neighbor(&self, dir: Direction) -> Option<usize> {
        self.neighbors[dir.index()]
    }

    pub fn rank_of(&self, row: usize, col: usize) -> usize {
        row * self.dims.1 + col
    }

    pub fn coords_of(&self, rank: usize) -> (usize, usize) {
        (rank / self.dims.1, rank % self.dims.1)
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }

    pub fn has_neighbors(&self) -> bool {
        self.neighbors.iter().any(Option::is_some)
    }

    /// Topology of another rank in the same process grid.
    pub fn for_rank(&self, rank: usize) -> HaloResult<Self> {
        Self::with_dims(rank, self.size, self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_create_near_square() {
        assert_eq!(dims_create(1).unwrap(), (1, 1));
        assert_eq!(dims_create(2).unwrap(), (1, 2));
        assert_eq!(dims_create(4).unwrap(), (2, 2));
        assert_eq!(dims_create(6).unwrap(), (2, 3));
        assert_eq!(dims_create(7).unwrap(), (1, 7));
        assert_eq!(dims_create(12).unwrap(), (3, 4));
        assert_eq!(dims_create(16).unwrap(), (4, 4));
    }

    #[test]
    fn test_dims_create_rejects_zero() {
        let err = dims_create(0).expect_err("zero workers must fail");
        assert!(matches!(err, HaloError::Topology(_)));
    }

    #[test]
    fn test_neighbors_2x2() {
        // Top-left corner (0,0): has bottom and right neighbours.
        let tl = ProcessTopology::new(0, 4).unwrap();
        assert_eq!(tl.neighbor(Direction::Down), Some(2));
        assert_eq!(tl.neighbor(Direction::Right), Some(1));
        assert_eq!(tl.neighbor(Direction::Up), None);
        assert_eq!(tl.neighbor(Direction::Left), None);
        // Bottom-right corner (1,1).
        let br = ProcessTopology::new(3, 4).unwrap();
        assert_eq!(br.coords, (1, 1));
        assert_eq!(br.neighbor(Direction::Up), Some(1));
        assert_eq!(br.neighbor(Direction::Left), Some(2));
        assert_eq!(br.neighbor(Direction::Down), None);
        assert_eq!(br.neighbor(Direction::Right), None);
    }

    #[test]
    fn test_interior_worker_has_all_neighbors() {
        let t = ProcessTopology::new(4, 9).unwrap();
        assert_eq!(t.coords, (1, 1));
        assert_eq!(t.neighbor(Direction::Up), Some(1));
        assert_eq!(t.neighbor(Direction::Down), Some(7));
        assert_eq!(t.neighbor(Direction::Left), Some(3));
        assert_eq!(t.neighbor(Direction::Right), Some(5));
    }

    #[test]
    fn test_single_worker_has_no_neighbors() {
        let t = ProcessTopology::new(0, 1).unwrap();
        assert!(!t.has_neighbors());
        assert!(t.is_coordinator());
    }

    #[test]
    fn test_no_periodic_wrap_on_row_topology() {
        let last = ProcessTopology::with_dims(4, 5, (1, 5)).unwrap();
        assert_eq!(last.neighbor(Direction::Right), None);
        assert_eq!(last.neighbor(Direction::Left), Some(3));
        let first = ProcessTopology::with_dims(0, 5, (1, 5)).unwrap();
        assert_eq!(first.neighbor(Direction::Left), None);
    }

    #[test]
    fn test_topology_is_idempotent() {
        for size in 1..=12 {
            for rank in 0..size {
                let a = ProcessTopology::new(rank, size).unwrap();
                let b = ProcessTopology::new(rank, size).unwrap();
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_neighbor_relation_is_symmetric() {
        let size = 12;
        for rank in 0..size {
            let t = ProcessTopology::new(rank, size).unwrap();
            for dir in Direction::ALL {
                if let Some(peer) = t.neighbor(dir) {
                    let p = t.for_rank(peer).unwrap();
                    assert_eq!(p.neighbor(dir.opposite()), Some(rank));
                }
            }
        }
    }

    #[test]
    fn test_rejects_invalid_requests() {
        assert!(ProcessTopology::with_dims(0, 6, (4, 2)).is_err());
        assert!(ProcessTopology::with_dims(0, 6, (0, 6)).is_err());
        assert!(ProcessTopology::new(6, 6).is_err());
        assert!(ProcessTopology::from_signed(0, -4).is_err());
        assert!(ProcessTopology::from_signed(0, 0).is_err());
        assert!(ProcessTopology::from_signed(-1, 4).is_err());
        assert!(ProcessTopology::from_signed(3, 4).is_ok());
    }

    #[test]
    fn test_from_signed_matches_unsigned_constructor() {
        // Launchers such as MPI report rank and size as i32.
        let (rank, size): (i32, i32) = (5, 6);
        let signed = ProcessTopology::from_signed(i64::from(rank), i64::from(size)).unwrap();
        assert_eq!(signed, ProcessTopology::new(5, 6).unwrap());
        assert_eq!((signed.rank, signed.size), (5, 6));

        let err = ProcessTopology::from_signed(i64::from(i32::MIN), 6).expect_err("negative rank");
        match err {
            HaloError::Topology(msg) => assert!(msg.contains("non-negative")),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(ProcessTopology::from_signed(0, i64::from(i32::MIN)).is_err());
        assert!(ProcessTopology::from_signed(6, 6).is_err());
    }
}
