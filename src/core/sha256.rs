// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/sha256.rs
// Version: 1.0.2
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the SHA256d (double SHA-256) primitives used by the
// merkle assembly and by the sha256d algorithm family. It provides functions
// for hashing arbitrary byte runs, the 64-byte merkle fold step, and header
// hashing with nonce iteration.
//
// Tree Location:
// - src/core/sha256.rs (double SHA-256 primitives)
// - Depends on: sha2

use sha2::{Digest, Sha256};

/// Length of the header template every algorithm hashes against. The merkle
/// root slot and the trailing 4-byte nonce both live inside this buffer.
pub const HEADER_LEN: usize = 128;

/// Byte range of the conventional nonce slot at the tail of the header.
pub const NONCE_RANGE: std::ops::Range<usize> = 124..128;

pub fn dsha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Merkle fold step: hash the 64-byte concatenation of two 32-byte values.
pub fn dsha256_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut joined = [0u8; 64];
    joined[..32].copy_from_slice(left);
    joined[32..].copy_from_slice(right);
    dsha256(&joined)
}

/// Hash a 128-byte header with the given nonce written into the tail slot.
pub fn dsha256_with_nonce(header: &[u8; HEADER_LEN], nonce: u32) -> [u8; 32] {
    let mut buffer = *header;
    buffer[NONCE_RANGE].copy_from_slice(&nonce.to_le_bytes());
    dsha256(&buffer)
}

/// Hash 4 consecutive nonces in batch, reusing the header buffer.
pub fn dsha256_with_nonce_batch(
    header: &[u8; HEADER_LEN],
    start_nonce: u32,
) -> [([u8; 32], u32); 4] {
    let mut buffer = *header;
    let mut results = [([0u8; 32], 0u32); 4];

    for (i, slot) in results.iter_mut().enumerate() {
        let nonce = start_nonce.wrapping_add(i as u32);
        buffer[NONCE_RANGE].copy_from_slice(&nonce.to_le_bytes());
        *slot = (dsha256(&buffer), nonce);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_matches_concatenated_hash() {
        let left = [0x11u8; 32];
        let right = [0x22u8; 32];
        let mut joined = Vec::with_capacity(64);
        joined.extend_from_slice(&left);
        joined.extend_from_slice(&right);
        assert_eq!(dsha256_pair(&left, &right), dsha256(&joined));
    }

    #[test]
    fn nonce_batch_matches_scalar() {
        let header = [0xA5u8; HEADER_LEN];
        let batch = dsha256_with_nonce_batch(&header, 41);
        for (hash, nonce) in batch.iter() {
            assert_eq!(*hash, dsha256_with_nonce(&header, *nonce));
        }
        assert_eq!(batch[3].1, 44);
    }
}

// Changelog:
// - v1.0.2 (2026-07-02): Added the 64-byte merkle fold helper.
//   - dsha256_pair avoids the Vec round trip in the hot rebuild path.
// - v1.0.1 (2026-06-30): Batch hashing for the reference scan loop.
