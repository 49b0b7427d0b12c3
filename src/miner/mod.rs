// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the mining coordination layer,
// located in the miner subdirectory. It declares submodules and re-exports
// key types for use throughout the project.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: coordinator, mailbox, stats, worker

pub mod coordinator;
pub mod mailbox;
pub mod stats;
pub mod worker;

// Re-export key types for convenience
pub use coordinator::{Miner, MinerError};
pub use mailbox::{Inbox, Outbox};
pub use stats::MinerStats;
