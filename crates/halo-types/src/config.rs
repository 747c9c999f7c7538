// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{HaloError, HaloResult};
use crate::state::InitialFields;
use serde::{Deserialize, Serialize};

/// Run configuration handed over by the bootstrap layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Global grid side N, frame included.
    pub grid_size: usize,
    /// Number of relaxation generations T.
    pub generations: usize,
    /// Total worker count W.
    pub workers: usize,
    /// Explicit process grid `[rows, cols]`. When absent the grid closest
    /// to square is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_grid: Option<[usize; 2]>,
    /// Insert a collective barrier after every sweep.
    #[serde(default)]
    pub barrier_each_generation: bool,
    /// Split owned rows of each sweep across the rayon pool.
    #[serde(default)]
    pub parallel_sweep: bool,
    /// Normalise the initial fields by N (reference kernel behaviour).
    #[serde(default = "default_scaled_init")]
    pub scaled_init: bool,
}

fn default_scaled_init() -> bool {
    true
}

impl RunConfig {
    pub fn new(grid_size: usize, generations: usize, workers: usize) -> Self {
        RunConfig {
            grid_size,
            generations,
            workers,
            process_grid: None,
            barrier_each_generation: false,
            parallel_sweep: false,
            scaled_init: default_scaled_init(),
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &str) -> HaloResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Static checks that do not need the topology.
    pub fn validate(&self) -> HaloResult<()> {
        if self.workers == 0 {
            return Err(HaloError::Config("worker count must be >= 1".to_string()));
        }
        if self.grid_size < 3 {
            return Err(HaloError::Config(format!(
                "grid_size must be >= 3 (frame plus one interior cell), got {}",
                self.grid_size
            )));
        }
        if let Some([rows, cols]) = self.process_grid {
            if rows * cols != self.workers {
                return Err(HaloError::Config(format!(
                    "process grid {rows}x{cols} does not match {} workers",
                    self.workers
                )));
            }
        }
        Ok(())
    }

    pub fn initial_fields(&self) -> InitialFields {
        if self.scaled_init {
            InitialFields::scaled(self.grid_size)
        } else {
            InitialFields::unscaled()
        }
    }
}
