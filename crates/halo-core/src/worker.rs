// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Worker Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One worker's full run: topology → tile → T × (exchange, sweep, swap)
//! → gather, plus an in-process launcher that runs every worker on its
//! own thread.

use crate::comm::{ChannelComm, Communicator};
use crate::decomp::{decompose, TileGeometry, TilePair};
use crate::exchange::{HaloExchange, HaloPlan};
use crate::gather::{gather, scatter};
use crate::topology::ProcessTopology;
use halo_types::config::RunConfig;
use halo_types::error::{HaloError, HaloResult};
use ndarray::Array2;

/// A worker bound to a communicator endpoint.
pub struct Worker<C: Communicator> {
    comm: C,
    topo: ProcessTopology,
    geom: TileGeometry,
    tiles: TilePair,
    halo: HaloExchange,
    generations: usize,
    barrier_each_generation: bool,
    parallel_sweep: bool,
}

fn topology_for<C: Communicator>(comm: &C, config: &RunConfig) -> HaloResult<ProcessTopology> {
    if comm.size() != config.workers {
        return Err(HaloError::Config(format!(
            "communicator has {} workers, configuration expects {}",
            comm.size(),
            config.workers
        )));
    }
    match config.process_grid {
        Some([rows, cols]) => ProcessTopology::with_dims(comm.rank(), comm.size(), (rows, cols)),
        None => ProcessTopology::new(comm.rank(), comm.size()),
    }
}

impl<C: Communicator> Worker<C> {
    /// Worker whose buffers start from the closed-form initial fields.
    pub fn new(comm: C, config: &RunConfig) -> HaloResult<Self> {
        config.validate()?;
        let topo = topology_for(&comm, config)?;
        let geom = decompose(config.grid_size, &topo)?;
        let tiles = TilePair::allocate(&geom, &config.initial_fields());
        Ok(Self::assemble(comm, config, topo, geom, tiles))
    }

    /// Worker whose buffers are both scattered from an existing global grid.
    pub fn from_global(comm: C, config: &RunConfig, global: &Array2<f64>) -> HaloResult<Self> {
        config.validate()?;
        let topo = topology_for(&comm, config)?;
        let geom = decompose(config.grid_size, &topo)?;
        let tiles = scatter(global, &geom)?;
        Ok(Self::assemble(comm, config, topo, geom, tiles))
    }

    fn assemble(
        comm: C,
        config: &RunConfig,
        topo: ProcessTopology,
        geom: TileGeometry,
        tiles: TilePair,
    ) -> Self {
        let halo = HaloExchange::new(HaloPlan::new(&topo, &geom));
        tracing::debug!(
            rank = topo.rank,
            coords = ?topo.coords,
            tile = ?(geom.height, geom.width),
            faces = halo.plan().faces().len(),
            "worker initialised"
        );
        Self {
            comm,
            topo,
            geom,
            tiles,
            halo,
            generations: config.generations,
            barrier_each_generation: config.barrier_each_generation,
            parallel_sweep: config.parallel_sweep,
        }
    }

    pub fn topology(&self) -> &ProcessTopology {
        &self.topo
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geom
    }

    pub fn tiles(&self) -> &TilePair {
        &self.tiles
    }

    /// Run every generation, then gather. Returns the assembled grid on
    /// the coordinator, `None` on every other worker.
    pub fn run(mut self) -> HaloResult<Option<Array2<f64>>> {
        let rank = self.topo.rank;
        for generation in 0..self.generations {
            self.halo.exchange(&self.comm, self.tiles.active_mut())?;
            self.tiles.step(self.parallel_sweep);
            if self.barrier_each_generation {
                self.comm.barrier()?;
            }
            tracing::trace!(rank, generation, "generation complete");
        }
        tracing::debug!(rank, generations = self.generations, "relaxation finished");
        gather(&self.comm, &self.topo, &self.geom, self.tiles.active())
    }
}

fn run_threads<F>(config: &RunConfig, build: F) -> HaloResult<Array2<f64>>
where
    F: Fn(ChannelComm) -> HaloResult<Worker<ChannelComm>> + Sync,
{
    config.validate()?;
    let world = ChannelComm::world(config.workers);
    tracing::info!(
        workers = config.workers,
        grid_size = config.grid_size,
        generations = config.generations,
        "launching in-process workers"
    );

    let results: Vec<HaloResult<Option<Array2<f64>>>> = std::thread::scope(|s| {
        let build = &build;
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| s.spawn(move || build(comm)?.run()))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| {
                h.join().unwrap_or_else(|_| {
                    Err(HaloError::Exchange {
                        rank,
                        message: "worker thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let mut grid = None;
    let mut first_error = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(Some(g)) => grid = Some(g),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(rank, error = %e, "worker failed");
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    grid.ok_or_else(|| HaloError::Gather("coordinator returned no grid".to_string()))
}

/// Run the configured job with one thread per worker and return the
/// assembled grid.
///
/// If any worker fails, its peers observe a disconnected channel and fail
/// as well; the error of the lowest failing rank is returned.
pub fn run_local(config: &RunConfig) -> HaloResult<Array2<f64>> {
    run_threads(config, |comm| Worker::new(comm, config))
}

/// Like [`run_local`], starting both buffers from `global`.
pub fn run_local_from(config: &RunConfig, global: &Array2<f64>) -> HaloResult<Array2<f64>> {
    run_threads(config, |comm| Worker::from_global(comm, config, global))
}
