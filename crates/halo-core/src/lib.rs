// ─────────────────────────────────────────────────────────────────────
// SCPN Halo Stencil — Halo Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Distributed 5-point Jacobi relaxation with halo exchange.
//!
//! Stage 1: topology, decomposition, transfer descriptors
//! Stage 2: communicators, halo exchange, kernel
//! Stage 3: gather/scatter, worker driver, serial baseline, output

pub mod comm;
#[cfg(feature = "mpi")]
pub mod comm_mpi;
pub mod decomp;
pub mod descriptor;
pub mod exchange;
pub mod gather;
pub mod kernel;
pub mod output;
pub mod serial;
pub mod topology;
pub mod worker;
