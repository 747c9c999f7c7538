// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Property-Based Tests (proptest) for halo-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for halo-types using proptest.
//!
//! Covers: closed-form field windows, run configuration validation and
//! serialization roundtrip.

use halo_types::config::RunConfig;
use halo_types::state::{FieldInit, InitialFields};
use proptest::prelude::*;

// ── Field Initialisation ─────────────────────────────────────────────

proptest! {
    /// Any window equals the matching slice of the global field.
    #[test]
    fn window_agrees_with_global(
        n in 4usize..40,
        row0 in 0usize..20,
        col0 in 0usize..20,
        nrows in 1usize..20,
        ncols in 1usize..20,
    ) {
        prop_assume!(row0 + nrows <= n && col0 + ncols <= n);
        let init = InitialFields::scaled(n).a;
        let global = init.global(n);
        let win = init.window(row0, col0, nrows, ncols);
        prop_assert_eq!(win.dim(), (nrows, ncols));
        for i in 0..nrows {
            for j in 0..ncols {
                prop_assert_eq!(win[[i, j]], global[[row0 + i, col0 + j]]);
            }
        }
    }

    /// The closed form is affine in each coordinate, so its discrete
    /// 5-point average reproduces the centre value.
    #[test]
    fn field_is_discrete_harmonic(
        gr in 1usize..100,
        gc in 1usize..100,
        col_shift in 0.0f64..5.0,
        offset in -5.0f64..5.0,
    ) {
        let f = FieldInit::new(col_shift, offset, 1.0);
        let avg = 0.2 * (f.value(gr, gc) + f.value(gr, gc - 1) + f.value(gr, gc + 1)
            + f.value(gr + 1, gc) + f.value(gr - 1, gc));
        prop_assert!((avg - f.value(gr, gc)).abs() < 1e-9 * f.value(gr, gc).abs().max(1.0));
    }
}

// ── Run Configuration ────────────────────────────────────────────────

proptest! {
    /// Serialization roundtrip preserves every field.
    #[test]
    fn config_roundtrip(
        grid_size in 3usize..1024,
        generations in 0usize..500,
        rows in 1usize..8,
        cols in 1usize..8,
        barrier in any::<bool>(),
        parallel in any::<bool>(),
    ) {
        let mut cfg = RunConfig::new(grid_size, generations, rows * cols);
        cfg.process_grid = Some([rows, cols]);
        cfg.barrier_each_generation = barrier;
        cfg.parallel_sweep = parallel;
        prop_assert!(cfg.validate().is_ok());

        let json = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(cfg, back);
    }

    /// A process grid that does not multiply out to the worker count is rejected.
    #[test]
    fn config_rejects_mismatched_grid(
        rows in 1usize..8,
        cols in 1usize..8,
        extra in 1usize..5,
    ) {
        let mut cfg = RunConfig::new(64, 1, rows * cols + extra);
        cfg.process_grid = Some([rows, cols]);
        prop_assert!(cfg.validate().is_err());
    }
}
