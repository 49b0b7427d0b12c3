// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 1.0.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the core functionality of the
// HashForge engine, located in the core subdirectory. It declares submodules
// and re-exports key types for use throughout the project.

pub mod difficulty;
pub mod sha256;
pub mod work;

// Re-export the most commonly used items
pub use difficulty::{hash_meets_target, target_from_difficulty, U256};
pub use sha256::{dsha256, dsha256_pair, dsha256_with_nonce};
pub use work::{CoinbaseDesc, JobInfo, Nonces, ShareDifficulty, WorkSource, WorkUnit};
