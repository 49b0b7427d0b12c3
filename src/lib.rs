// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file serves as the main library entry point for the HashForge mining
// engine, located at the root of the source tree. It exports all public
// modules and types that the outer pool/network layer and other crates use.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: core, compute, algo, miner

pub mod algo;
pub mod compute;
pub mod core;
pub mod miner;

// Re-export commonly used types at the crate root for convenience
pub use crate::algo::{AlgoFamily, AlgoImplementation, IterationStart};
pub use crate::compute::{ComputeProvider, CpuProvider, DeviceKind, DeviceProfile, Platform};
pub use crate::core::{CoinbaseDesc, Nonces, WorkSource, WorkUnit};
pub use crate::miner::{Miner, MinerError, MinerStats};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// Changelog:
// - v1.1.0 (2026-07-18): Split the compute provider seam out of miner.
//   - Moved the provider abstraction into its own compute module so algorithm
//     implementations can be written against the seam instead of a backend.
//   - Re-exported the trait surface needed by the stratum adapter.
// - v1.0.0 (2026-06-30): Initial modular layout.
//   - Purpose: Establishes the library root, organizing the engine into core,
//     compute, algo and miner modules.
//   - Features: Exports key types (WorkUnit, Miner, AlgoFamily) for easy
//     access and defines a common Result type for the outer layer.
