// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains 256-bit share-target arithmetic, located in the core
// subdirectory of the HashForge source tree. Pool difficulty converts to a
// target threshold; a candidate nonce is a share when its hash, read as a
// little-endian 256-bit integer, is below that threshold.

use log::warn;
use uint::construct_uint;

const LOG_TARGET: &str = "hashforge::difficulty";

construct_uint! {
    pub struct U256(4);
}

const MAX_TARGET: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Difficulties below one are common on test pools, so the conversion runs
/// through a fixed-point scale instead of truncating to an integer first.
pub fn target_from_difficulty(difficulty: f64) -> U256 {
    if difficulty <= 0.0 {
        warn!(target: LOG_TARGET, "Invalid share difficulty: {}", difficulty);
        return U256::MAX;
    }
    let max_target = U256::from_big_endian(&MAX_TARGET);
    let scaled = U256::from((difficulty * 1_000_000.0) as u64);
    if scaled.is_zero() {
        warn!(target: LOG_TARGET, "Share difficulty {} scales to zero, using max target", difficulty);
        return U256::MAX;
    }
    (max_target / scaled)
        .checked_mul(U256::from(1_000_000u64))
        .unwrap_or(U256::MAX)
}

/// Share test: hash bytes are interpreted as a little-endian 256-bit integer
/// and must be strictly below the target.
pub fn hash_meets_target(hash: &[u8; 32], target: &U256) -> bool {
    U256::from_little_endian(hash) < *target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_difficulty_is_max_target() {
        assert_eq!(target_from_difficulty(0.0), U256::MAX);
        assert_eq!(target_from_difficulty(-3.0), U256::MAX);
    }

    #[test]
    fn higher_difficulty_is_lower_target() {
        let easy = target_from_difficulty(1.0);
        let hard = target_from_difficulty(4096.0);
        assert!(hard < easy);
    }

    #[test]
    fn target_test_is_strict() {
        let mut bytes = [0u8; 32];
        let target = U256::from(7u64);
        bytes[0] = 7;
        assert!(!hash_meets_target(&bytes, &target));
        bytes[0] = 6;
        assert!(hash_meets_target(&bytes, &target));
    }

    #[test]
    fn comparison_is_little_endian() {
        // Big byte at the tail dominates when read little-endian.
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!hash_meets_target(&bytes, &U256::from(u64::MAX)));
    }
}

// Changelog:
// - v1.1.0 (2026-07-02): Switched the share test to little-endian reads.
//   - Device kernels report candidates against the LE interpretation, so the
//     CPU verification side must read the same way or valid shares get
//     discarded at high difficulty.
