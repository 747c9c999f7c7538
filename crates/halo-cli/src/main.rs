// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Launcher
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use clap::Parser;
use halo_core::output::{grid_delta, read_grid, write_grid, GridDelta};
use halo_core::serial;
use halo_core::worker::run_local;
use halo_types::config::RunConfig;
use halo_types::error::HaloResult;
use ndarray::Array2;
use std::io::{self, BufReader, BufWriter};
use std::time::Instant;

/// Maximum cell-wise deviation accepted by `--verify`.
const VERIFY_TOLERANCE: f64 = 1e-12;

/// Distributed 2D Jacobi relaxation with halo exchange
#[derive(Parser)]
#[command(name = "halo-stencil", version)]
struct Cli {
    /// JSON run configuration; overrides the size flags below
    #[arg(long)]
    config: Option<String>,

    /// Global grid side N, frame included
    #[arg(short = 'n', long = "size", default_value_t = 66)]
    size: usize,

    /// Number of relaxation generations T
    #[arg(short = 't', long, default_value_t = 10)]
    generations: usize,

    /// Number of workers W
    #[arg(short = 'w', long, default_value_t = 4)]
    workers: usize,

    /// Explicit process grid: rows cols
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"])]
    grid: Option<Vec<usize>>,

    /// Synchronise all workers after every generation
    #[arg(long)]
    barrier: bool,

    /// Split each sweep's rows across the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Use the raw closed-form initial fields (no 1/N normalisation)
    #[arg(long)]
    unscaled: bool,

    /// Compare against the single-node baseline and fail on mismatch
    #[arg(long)]
    verify: bool,

    /// Compare the assembled grid against a reference dump
    #[arg(long, value_name = "DUMP")]
    compare: Option<String>,

    /// Maximum cell-wise deviation accepted by `--compare`
    #[arg(long, default_value_t = VERIFY_TOLERANCE)]
    tolerance: f64,

    /// Write the assembled grid to a file, or `-` for stdout
    #[arg(long)]
    dump: Option<String>,

    /// Fractional digits in the dump
    #[arg(long, default_value_t = 6)]
    precision: usize,

    /// Take rank and size from the MPI launcher
    #[cfg(feature = "mpi")]
    #[arg(long)]
    mpi: bool,
}

impl Cli {
    fn run_config(&self) -> HaloResult<RunConfig> {
        let config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => {
                let mut config = RunConfig::new(self.size, self.generations, self.workers);
                config.process_grid = self.grid.as_deref().map(|g| [g[0], g[1]]);
                config.barrier_each_generation = self.barrier;
                config.parallel_sweep = self.parallel;
                config.scaled_init = !self.unscaled;
                config
            }
        };
        config.validate()?;
        Ok(config)
    }
}

fn dump(grid: &Array2<f64>, target: &str, precision: usize) -> HaloResult<()> {
    if target == "-" {
        write_grid(grid, BufWriter::new(io::stdout().lock()), precision)
    } else {
        let file = std::fs::File::create(target)?;
        write_grid(grid, BufWriter::new(file), precision)
    }
}

fn verify(config: &RunConfig, grid: &Array2<f64>) -> HaloResult<GridDelta> {
    let expected = serial::run(config.grid_size, config.generations, &config.initial_fields())?;
    grid_delta(grid, &expected)
}

fn compare(grid: &Array2<f64>, reference: &str) -> HaloResult<GridDelta> {
    let file = std::fs::File::open(reference)?;
    let expected = read_grid(BufReader::new(file))?;
    grid_delta(grid, &expected)
}

/// Print the deltas and exit non-zero when the max delta exceeds
/// `tolerance`.
fn report(label: &str, delta: HaloResult<GridDelta>, tolerance: f64) {
    let delta = delta.unwrap_or_else(|e| {
        eprintln!("{} error: {}", label, e);
        std::process::exit(1);
    });
    if !delta.within(tolerance) {
        eprintln!(
            "{} failed: max delta {:e} > {:e} (L2 {:e})",
            label, delta.max_abs, tolerance, delta.l2
        );
        std::process::exit(1);
    }
    eprintln!("{} passed: max delta {:e}, L2 {:e}", label, delta.max_abs, delta.l2);
}

/// Runs the job with one process per worker. Returns the grid on rank 0,
/// `None` elsewhere.
#[cfg(feature = "mpi")]
fn run_mpi(config: &RunConfig) -> HaloResult<Option<Array2<f64>>> {
    use halo_core::comm::Communicator;
    use halo_core::comm_mpi::MpiComm;
    use halo_core::worker::Worker;
    use halo_types::error::HaloError;

    let universe = mpi::initialize()
        .ok_or_else(|| HaloError::Config("MPI was already initialised".to_string()))?;
    let comm = MpiComm::new(universe.world())?;
    let mut config = config.clone();
    config.workers = comm.size();
    Worker::new(comm, &config)?.run()
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.run_config().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();

    #[cfg(feature = "mpi")]
    let grid = if cli.mpi {
        match run_mpi(&config) {
            Ok(Some(grid)) => grid,
            Ok(None) => return,
            Err(e) => {
                eprintln!("Run error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        run_local(&config).unwrap_or_else(|e| {
            eprintln!("Run error: {}", e);
            std::process::exit(1);
        })
    };

    #[cfg(not(feature = "mpi"))]
    let grid = run_local(&config).unwrap_or_else(|e| {
        eprintln!("Run error: {}", e);
        std::process::exit(1);
    });

    tracing::info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        grid_size = config.grid_size,
        generations = config.generations,
        "run complete"
    );

    if cli.verify {
        report("Verification", verify(&config, &grid), VERIFY_TOLERANCE);
    }

    if let Some(reference) = &cli.compare {
        report("Comparison", compare(&grid, reference), cli.tolerance);
    }

    if let Some(target) = &cli.dump {
        dump(&grid, target, cli.precision).unwrap_or_else(|e| {
            eprintln!("Output error: {}", e);
            std::process::exit(1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_run_config() {
        let cli = Cli::try_parse_from([
            "halo-stencil",
            "-n",
            "26",
            "-t",
            "3",
            "-w",
            "6",
            "--grid",
            "3",
            "2",
            "--barrier",
            "--unscaled",
        ])
        .unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.grid_size, 26);
        assert_eq!(config.generations, 3);
        assert_eq!(config.workers, 6);
        assert_eq!(config.process_grid, Some([3, 2]));
        assert!(config.barrier_each_generation);
        assert!(!config.parallel_sweep);
        assert!(!config.scaled_init);
    }

    #[test]
    fn mismatched_grid_flag_is_rejected() {
        let cli = Cli::try_parse_from(["halo-stencil", "-w", "4", "--grid", "3", "2"]).unwrap();
        assert!(cli.run_config().is_err());
    }

    #[test]
    fn verify_accepts_distributed_result() {
        let config = RunConfig::new(18, 4, 4);
        let grid = run_local(&config).unwrap();
        let delta = verify(&config, &grid).unwrap();
        assert!(delta.within(VERIFY_TOLERANCE), "{delta:?}");
        assert!(delta.l2 <= VERIFY_TOLERANCE * config.grid_size as f64);
    }

    #[test]
    fn compare_reads_reference_dump() {
        let config = RunConfig::new(14, 3, 6);
        let grid = run_local(&config).unwrap();
        let path = std::env::temp_dir().join(format!("halo-compare-{}.txt", std::process::id()));
        let path_str = path.to_str().unwrap();
        dump(&grid, path_str, 17).unwrap();

        let delta = compare(&grid, path_str).unwrap();
        assert!(delta.within(1e-12), "{delta:?}");

        let shifted = grid.mapv(|v| v + 0.5);
        let delta = compare(&shifted, path_str).unwrap();
        assert!((delta.max_abs - 0.5).abs() < 1e-12);
        assert!((delta.l2 - 0.5 * 14.0).abs() < 1e-9);
        assert!(!delta.within(1e-12));

        let wrong_shape = Array2::zeros((4, 4));
        assert!(compare(&wrong_shape, path_str).is_err());
        std::fs::remove_file(&path).unwrap();
        assert!(compare(&grid, path_str).is_err());
    }

    #[test]
    fn compare_flags_parse() {
        let cli = Cli::try_parse_from([
            "halo-stencil",
            "--compare",
            "ref.txt",
            "--tolerance",
            "1e-6",
        ])
        .unwrap();
        assert_eq!(cli.compare.as_deref(), Some("ref.txt"));
        assert_eq!(cli.tolerance, 1e-6);
        let defaults = Cli::try_parse_from(["halo-stencil"]).unwrap();
        assert_eq!(defaults.tolerance, VERIFY_TOLERANCE);
        assert!(defaults.compare.is_none());
    }
}
