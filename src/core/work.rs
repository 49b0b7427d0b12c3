// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/work.rs
// Version: 1.2.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the work unit: the complete set of inputs needed to hash
// one job's headers at varying nonces. A work unit owns the coinbase, the
// merkle branch and the 128-byte header template; rebuilding the header
// writes the current nonce2 into the coinbase, folds the merkle chain and
// splices the root into the template. Nonce2 rolling happens here so the
// network layer is never bothered for it.
//
// Tree Location:
// - src/core/work.rs (work unit and share records)
// - Depends on: anyhow, sha2 (via core::sha256), uint (via core::difficulty)

use anyhow::{ensure, Result};
use log::debug;
use std::time::SystemTime;

use crate::core::difficulty::U256;
use crate::core::sha256::{dsha256_pair, HEADER_LEN};

const LOG_TARGET: &str = "hashforge::work";

/// Hash function applied to the coinbase to obtain the initial merkle leaf.
/// Bitcoin-family algorithms use double SHA-256 (`core::sha256::dsha256`);
/// other coin families swap in their own.
pub type MerkleLeafFn = fn(&[u8]) -> [u8; 32];

/// Opaque handle to the pool a work unit came from. Implemented by the
/// stratum adapter; the engine only threads it through to share submission.
pub trait WorkSource: Send + Sync {
    fn name(&self) -> &str;
}

/// Job identity shared by every work unit of one pool session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Opaque job identifier assigned by the pool
    pub job_id: String,
    /// Extranonce-1 issued at subscription
    pub nonce1: Vec<u8>,
}

/// Share threshold for a work unit, kept in both forms the pool speaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareDifficulty {
    /// Floating-point difficulty, for bookkeeping and display
    pub share_diff: f64,
    /// 256-bit threshold a candidate hash must stay below
    pub share_target: U256,
}

/// Coinbase data and how to mangle it into the header.
#[derive(Debug, Clone)]
pub struct CoinbaseDesc {
    /// Coinbase transaction with the nonce-2 field zeroed at `nonce2_off`
    pub binary: Vec<u8>,
    /// Where the 32-bit nonce2 gets written before leaf hashing
    pub nonce2_off: usize,
    /// Ordered sibling hashes of the merkle branch
    pub merkles: Vec<[u8; 32]>,
    /// Where in the header the assembled merkle root goes
    pub merkle_off: usize,
}

/// Candidate nonces found by the worker for one pass, stamped with enough
/// state to derive a share submission.
#[derive(Debug, Clone)]
pub struct Nonces {
    pub job_id: String,
    pub nonce2: u32,
    /// Header the pass was started with (nonce slot still zeroed)
    pub header: [u8; HEADER_LEN],
    pub nonces: Vec<u32>,
}

/// Immutable-per-job hashing input. Owned by the stratum adapter while being
/// built, then moved into the miner inbox and consumed exclusively by the
/// worker, which may roll `nonce2` to extend the search space.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub job: JobInfo,
    pub difficulty: ShareDifficulty,
    pub coinbase: CoinbaseDesc,
    /// Protocol timestamp from the job notification
    pub ntime: u32,
    /// Local wall-clock time this unit was generated
    pub gen_time: SystemTime,
    /// Counter the worker increments when rolling; starts at zero
    pub nonce2: u32,
    /// When false the worker keeps its current nonce2 iteration and only
    /// swaps in the new data; when true it resets the iteration.
    pub restart: bool,
    /// Assembled header; valid after `rebuild_header`
    pub header: [u8; HEADER_LEN],
    blank_header: [u8; HEADER_LEN],
    leaf_hash: MerkleLeafFn,
    big_endian_merkle: bool,
}

impl WorkUnit {
    /// Build a work unit and assemble its first header. Fails when the
    /// merkle slot or the nonce2 slot would fall outside its buffer.
    pub fn new(
        job: JobInfo,
        ntime: u32,
        difficulty: ShareDifficulty,
        blank_header: [u8; HEADER_LEN],
        coinbase: CoinbaseDesc,
        leaf_hash: MerkleLeafFn,
        little_endian_algo: bool,
    ) -> Result<Self> {
        ensure!(
            coinbase.merkle_off + 32 <= HEADER_LEN,
            "merkle offset {} leaves no room for a 32-byte root in a {}-byte header",
            coinbase.merkle_off,
            HEADER_LEN
        );
        ensure!(
            coinbase.nonce2_off + 4 <= coinbase.binary.len(),
            "nonce2 offset {} overruns the {}-byte coinbase",
            coinbase.nonce2_off,
            coinbase.binary.len()
        );

        let mut wu = Self {
            job,
            difficulty,
            coinbase,
            ntime,
            gen_time: SystemTime::now(),
            nonce2: 0,
            restart: false,
            header: [0u8; HEADER_LEN],
            blank_header,
            leaf_hash,
            big_endian_merkle: !little_endian_algo,
        };
        wu.rebuild_header();
        Ok(wu)
    }

    /// Rebuild `header` from the template and the current `nonce2`.
    ///
    /// The current nonce2 is written into the coinbase, the coinbase is leaf
    /// hashed, the merkle branch is folded over it with double SHA-256, and
    /// the root (byte-flipped in 4-byte groups for big-endian algorithms)
    /// lands in the template's merkle slot.
    pub fn rebuild_header(&mut self) {
        let off = self.coinbase.nonce2_off;
        self.coinbase.binary[off..off + 4].copy_from_slice(&self.nonce2.to_le_bytes());

        let mut root = (self.leaf_hash)(&self.coinbase.binary);
        for sibling in &self.coinbase.merkles {
            root = dsha256_pair(&root, sibling);
        }
        if self.big_endian_merkle {
            flip_u32_groups(&mut root);
        }
        debug!(target: LOG_TARGET,
            "Merkle root for job {} nonce2 {}: {}",
            self.job.job_id,
            self.nonce2,
            hex::encode(root)
        );

        self.header = self.blank_header;
        let slot = self.coinbase.merkle_off;
        self.header[slot..slot + 32].copy_from_slice(&root);
    }

    /// Advance to the next nonce2 and refresh the header.
    pub fn advance_nonce2(&mut self) {
        self.nonce2 = self.nonce2.wrapping_add(1);
        self.rebuild_header();
    }

    pub fn blank_header(&self) -> &[u8; HEADER_LEN] {
        &self.blank_header
    }

    pub fn share_target(&self) -> U256 {
        self.difficulty.share_target
    }
}

/// Flip a 32-byte value in 4-byte groups, the endian fixup applied to the
/// merkle root for algorithms that read the slot big-endian.
fn flip_u32_groups(bytes: &mut [u8; 32]) {
    for group in bytes.chunks_exact_mut(4) {
        group.reverse();
    }
}


// Changelog:
// - v1.2.1 (2026-07-18): Header rebuild now happens at construction too.
//   - A freshly built unit always carries a valid header, so the worker can
//     begin a pass without a separate rebuild call.
// - v1.2.0 (2026-07-02): Delegated the merkle leaf hash.
//   - The leaf function is supplied per coin family; the fold step stays
//     double SHA-256.
