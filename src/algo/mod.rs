// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/algo/mod.rs
// Version: 1.2.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the contract every mining algorithm implementation must
// satisfy: settings declaration and device binding, per-device resource
// lifetime, the pipelined begin/dispatch/extract surface the worker drives,
// and CPU-side verification. Families group alternative implementations of
// the same algorithm under one name.
//
// Tree Location:
// - src/algo/mod.rs (implementation contract)
// - Depends on: anyhow, serde_json, sha2

pub mod family;
pub mod sha256d;

pub use family::AlgoFamily;
pub use sha256d::Sha256dReference;

use anyhow::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::compute::{ComputeProvider, Platform};
use crate::core::sha256::HEADER_LEN;
use crate::core::work::WorkUnit;

/// One kernel step of an implementation: where its source lives, the source
/// itself (embedded at build time) and the entry point to invoke.
#[derive(Debug, Clone, Copy)]
pub struct KernelStep {
    pub file: &'static str,
    pub source: &'static str,
    pub entry: &'static str,
}

/// State a pipeline pass was started with, returned alongside its candidate
/// nonces so shares can be derived and verified after the work unit moved on.
#[derive(Debug, Clone)]
pub struct IterationStart {
    pub job_id: String,
    pub nonce2: u32,
    pub header: [u8; HEADER_LEN],
}

/// A mining algorithm implementation.
///
/// Implementations are configured with a list of settings (one per candidate
/// device class), bind devices to settings in `select_settings`, and then run
/// one or more concurrent instances per setting. Each `(setting, instance)`
/// slot is an independent pipeline the worker feeds through `begin`, advances
/// through `dispatch` and drains through `results_available`.
///
/// Resources allocated by `allocate` belong to one provider and are never
/// shared across providers. A resource-less clone carries settings only and
/// is safe to inspect from the owner thread.
pub trait AlgoImplementation<P: ComputeProvider>: Send {
    /// Case-sensitive canonical name of this implementation
    fn name(&self) -> &str;

    /// Presentation version string, part of the versioning signature
    fn version(&self) -> &str;

    /// When false the merkle root is byte-flipped in the header template
    fn little_endian(&self) -> bool;

    /// Enumerate kernel steps; `None` ends the enumeration
    fn source_for(&self, step: usize) -> Option<KernelStep>;

    fn settings_count(&self) -> usize;

    /// Append one candidate configuration from its JSON description
    fn add_settings(&mut self, config: &Value) -> Result<()>;

    /// Pick the best-fitting setting for a device, or `settings_count()` if
    /// the device is not eligible. Every rejection invokes `reject` with a
    /// human-readable reason.
    fn choose_settings(
        &self,
        platform: &Platform<P::Device>,
        device: &P::Device,
        reject: &mut dyn FnMut(&str),
    ) -> usize;

    /// Bind every device of the provider to its best-fit setting
    fn select_settings(&mut self, provider: &P);

    /// Allocate per-instance resources for every bound device, returning
    /// `(setting index, instance count)` per active setting
    fn allocate(&mut self, provider: &P) -> Result<Vec<(usize, usize)>>;

    /// Release all resources; settings and bindings survive
    fn clear(&mut self, provider: &P);

    /// True when the slot's pipeline can take a new header
    fn can_accept_input(&self, setting: usize, instance: usize) -> bool;

    /// Feed a slot from a work unit. Valid only when `can_accept_input`;
    /// returns the starting nonce assigned to the pass.
    fn begin(&mut self, setting: usize, instance: usize, wu: &WorkUnit, prev_hashes: u32) -> u32;

    /// Nonce-space stride one `begin` consumes under the given setting
    fn hashes_per_pass(&self, setting: usize) -> u32;

    /// Extract finished results without blocking, if any
    fn results_available(&mut self, setting: usize, instance: usize)
        -> Option<(IterationStart, Vec<u32>)>;

    /// Collect the wait handles the slot is blocked on. Returns the number
    /// added; 0 means the slot can make progress without blocking.
    fn wait_events(&self, setting: usize, instance: usize, list: &mut Vec<P::WaitEvent>) -> usize;

    /// Advance the slot one step. Returns false when the slot finished and
    /// is waiting for its results to be extracted. Errors are fatal to the
    /// worker.
    fn dispatch(&mut self, setting: usize, instance: usize) -> Result<bool>;

    /// Hash a populated header CPU-side, coherently with the slot's setting
    /// (settings can alter the hash function, e.g. a scrypt N parameter)
    fn hash_header(&self, header: &[u8; HEADER_LEN], setting: usize, instance: usize) -> [u8; 32];

    /// Structural copy without per-device resources
    fn clone_without_resources(&self) -> Box<dyn AlgoImplementation<P>>;

    /// 0 when the device is unused, else 1 + the setting index it is bound to
    fn device_used_config(&self, device: &P::Device) -> usize;

    /// Provider-linear index of the device a slot runs on
    fn device_index(&self, setting: usize, instance: usize) -> usize;

    /// Case-insensitive name test
    fn matches_name(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// 64-bit signature of this implementation: SHA-256 over the version
    /// string followed by every kernel source and entry name, XOR-folded.
    /// Stable across runs; changes when any kernel or entry name changes.
    fn versioning_hash(&self) -> u64 {
        let mut blob: Vec<u8> = self.version().as_bytes().to_vec();
        let mut step = 0;
        while let Some(kernel) = self.source_for(step) {
            blob.extend_from_slice(kernel.source.as_bytes());
            blob.extend_from_slice(kernel.entry.as_bytes());
            step += 1;
        }

        let digest = Sha256::digest(&blob);
        let mut folded = 0u64;
        let mut chunk = [0u8; 8];
        for i in 0..4 {
            chunk.copy_from_slice(&digest[i * 8..(i + 1) * 8]);
            folded ^= u64::from_le_bytes(chunk);
        }
        folded
    }

    /// Why the device is not eligible for any setting, gathered by running
    /// `choose_settings` on a resource-less clone.
    fn bad_config_reasons(&self, platform: &Platform<P::Device>, device: &P::Device) -> Vec<String> {
        let mut reasons = Vec::new();
        let probe = self.clone_without_resources();
        probe.choose_settings(platform, device, &mut |reason: &str| {
            reasons.push(reason.to_string());
        });
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuProvider;

    struct SignedAlgo {
        version: &'static str,
        entry: &'static str,
    }

    impl AlgoImplementation<CpuProvider> for SignedAlgo {
        fn name(&self) -> &str {
            "signed"
        }
        fn version(&self) -> &str {
            self.version
        }
        fn little_endian(&self) -> bool {
            true
        }
        fn source_for(&self, step: usize) -> Option<KernelStep> {
            (step == 0).then_some(KernelStep {
                file: "signed.cl",
                source: "__kernel void k() {}",
                entry: self.entry,
            })
        }
        fn settings_count(&self) -> usize {
            0
        }
        fn add_settings(&mut self, _config: &Value) -> Result<()> {
            Ok(())
        }
        fn choose_settings(
            &self,
            _platform: &Platform<crate::compute::CpuDevice>,
            _device: &crate::compute::CpuDevice,
            _reject: &mut dyn FnMut(&str),
        ) -> usize {
            0
        }
        fn select_settings(&mut self, _provider: &CpuProvider) {}
        fn allocate(&mut self, _provider: &CpuProvider) -> Result<Vec<(usize, usize)>> {
            Ok(Vec::new())
        }
        fn clear(&mut self, _provider: &CpuProvider) {}
        fn can_accept_input(&self, _setting: usize, _instance: usize) -> bool {
            false
        }
        fn begin(&mut self, _s: usize, _i: usize, _wu: &WorkUnit, _prev: u32) -> u32 {
            0
        }
        fn hashes_per_pass(&self, _setting: usize) -> u32 {
            0
        }
        fn results_available(
            &mut self,
            _setting: usize,
            _instance: usize,
        ) -> Option<(IterationStart, Vec<u32>)> {
            None
        }
        fn wait_events(&self, _s: usize, _i: usize, _list: &mut Vec<()>) -> usize {
            0
        }
        fn dispatch(&mut self, _setting: usize, _instance: usize) -> Result<bool> {
            Ok(false)
        }
        fn hash_header(&self, _header: &[u8; HEADER_LEN], _s: usize, _i: usize) -> [u8; 32] {
            [0u8; 32]
        }
        fn clone_without_resources(&self) -> Box<dyn AlgoImplementation<CpuProvider>> {
            Box::new(SignedAlgo {
                version: self.version,
                entry: self.entry,
            })
        }
        fn device_used_config(&self, _device: &crate::compute::CpuDevice) -> usize {
            0
        }
        fn device_index(&self, _setting: usize, _instance: usize) -> usize {
            0
        }
    }

    #[test]
    fn versioning_hash_is_deterministic() {
        let algo = SignedAlgo {
            version: "1.0",
            entry: "search",
        };
        assert_eq!(algo.versioning_hash(), algo.versioning_hash());
    }

    #[test]
    fn versioning_hash_tracks_version_and_entry() {
        let base = SignedAlgo {
            version: "1.0",
            entry: "search",
        };
        let bumped = SignedAlgo {
            version: "1.1",
            entry: "search",
        };
        let renamed = SignedAlgo {
            version: "1.0",
            entry: "search2",
        };
        assert_ne!(base.versioning_hash(), bumped.versioning_hash());
        assert_ne!(base.versioning_hash(), renamed.versioning_hash());
    }

    #[test]
    fn matches_name_ignores_case() {
        let algo = SignedAlgo {
            version: "1.0",
            entry: "search",
        };
        assert!(algo.matches_name("SIGNED"));
        assert!(!algo.matches_name("signet"));
    }
}

// Changelog:
// - v1.2.0 (2026-07-18): hashes_per_pass joined the contract.
//   - The worker partitions the 32-bit nonce space across pipeline slots and
//     needs the per-setting stride to know when to roll nonce2.
// - v1.1.0 (2026-07-02): Versioning hash folded over kernel steps.
