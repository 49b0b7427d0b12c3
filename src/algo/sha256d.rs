// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/algo/sha256d.rs
// Version: 1.1.2
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Reference implementation of the sha256d (double SHA-256) family. It runs
// the scan host-side with the exact semantics a device kernel port must
// reproduce: same settings vocabulary (intensity, batch size), same
// pipelined begin/dispatch/extract state machine, same little-endian share
// test. The embedded kernel source participates in the versioning signature
// and is the template an OpenCL backend compiles.
//
// Tree Location:
// - src/algo/sha256d.rs (sha256d reference implementation)
// - Depends on: anyhow, log, serde, serde_json, core::sha256

use std::marker::PhantomData;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algo::{AlgoImplementation, IterationStart, KernelStep};
use crate::compute::{ComputeProvider, DeviceKind, DeviceProfile, Platform};
use crate::core::difficulty::{hash_meets_target, U256};
use crate::core::sha256::{dsha256, dsha256_with_nonce, dsha256_with_nonce_batch, HEADER_LEN};
use crate::core::work::WorkUnit;

const LOG_TARGET: &str = "hashforge::sha256d";

const KERNEL_SOURCE: &str = include_str!("../../kernels/sha256d.cl");
const KERNEL_ENTRY: &str = "sha256d_search";

const MIN_BATCH: u32 = 1_024;
const MAX_BATCH: u32 = 1_048_576;

/// One candidate configuration, as it appears in the settings tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sha256dConfig {
    /// Throttle percentage applied to the batch size
    pub intensity: u8,
    /// Nonces scanned per pass before throttling
    pub batch_size: u32,
    /// Smallest device memory this configuration will accept
    pub min_memory_mb: u64,
}

impl Default for Sha256dConfig {
    fn default() -> Self {
        Self {
            intensity: 90,
            batch_size: 65_536,
            min_memory_mb: 512,
        }
    }
}

impl Sha256dConfig {
    /// Intensity-scaled batch size, with safety clamps
    fn effective_batch(&self) -> u32 {
        let scaled = (self.batch_size as u64 * self.intensity as u64 / 100) as u32;
        scaled.clamp(MIN_BATCH, MAX_BATCH)
    }
}

struct Setting {
    config: Sha256dConfig,
    /// Provider-linear indices bound by select_settings
    devices: Vec<usize>,
}

struct Pass {
    start: IterationStart,
    start_nonce: u32,
    count: u32,
    target: U256,
}

enum SlotState {
    Idle,
    Fed(Pass),
    Done(Pass, Vec<u32>),
}

struct Instance {
    device_linear: usize,
    state: SlotState,
}

/// Host-side sha256d implementation, generic over the provider so settings
/// selection and diagnostics run against any backend's device tree.
pub struct Sha256dReference<P> {
    settings: Vec<Setting>,
    /// Per-setting instance lists; empty until allocate
    instances: Vec<Vec<Instance>>,
    _provider: PhantomData<fn() -> P>,
}

impl<P> Sha256dReference<P> {
    pub fn new() -> Self {
        Self {
            settings: Vec::new(),
            instances: Vec::new(),
            _provider: PhantomData,
        }
    }

    fn instance_mut(&mut self, setting: usize, instance: usize) -> Result<&mut Instance> {
        self.instances
            .get_mut(setting)
            .and_then(|list| list.get_mut(instance))
            .with_context(|| format!("no allocated instance for slot ({setting}, {instance})"))
    }
}

impl<P> Default for Sha256dReference<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ComputeProvider> AlgoImplementation<P> for Sha256dReference<P> {
    fn name(&self) -> &str {
        "reference"
    }

    fn version(&self) -> &str {
        "1.1"
    }

    fn little_endian(&self) -> bool {
        // Bitcoin-family: the merkle root is byte-flipped into the header
        false
    }

    fn source_for(&self, step: usize) -> Option<KernelStep> {
        (step == 0).then_some(KernelStep {
            file: "sha256d.cl",
            source: KERNEL_SOURCE,
            entry: KERNEL_ENTRY,
        })
    }

    fn settings_count(&self) -> usize {
        self.settings.len()
    }

    fn add_settings(&mut self, config: &Value) -> Result<()> {
        let parsed: Sha256dConfig =
            serde_json::from_value(config.clone()).context("bad sha256d settings record")?;
        if parsed.intensity == 0 || parsed.intensity > 100 {
            bail!("intensity must be between 1 and 100, got {}", parsed.intensity);
        }
        debug!(target: LOG_TARGET,
            "Added setting {}: intensity={}%, batch={}, min_mem={}MB",
            self.settings.len(), parsed.intensity, parsed.batch_size, parsed.min_memory_mb
        );
        self.settings.push(Setting {
            config: parsed,
            devices: Vec::new(),
        });
        Ok(())
    }

    fn choose_settings(
        &self,
        _platform: &Platform<P::Device>,
        device: &P::Device,
        reject: &mut dyn FnMut(&str),
    ) -> usize {
        if self.settings.is_empty() {
            reject("no sha256d settings configured");
        }
        for (idx, setting) in self.settings.iter().enumerate() {
            if device.kind() != DeviceKind::Gpu {
                reject(&format!(
                    "setting [{}]: device \"{}\" is a {:?}, not a GPU",
                    idx,
                    device.name(),
                    device.kind()
                ));
                continue;
            }
            if device.max_work_group_size() < 64 {
                reject(&format!(
                    "setting [{}]: work group size {} below the required 64",
                    idx,
                    device.max_work_group_size()
                ));
                continue;
            }
            let needed = setting.config.min_memory_mb * 1024 * 1024;
            if device.global_mem_size() < needed {
                reject(&format!(
                    "setting [{}]: device memory {} MB below the required {} MB",
                    idx,
                    device.global_mem_size() / (1024 * 1024),
                    setting.config.min_memory_mb
                ));
                continue;
            }
            return idx;
        }
        self.settings.len()
    }

    fn select_settings(&mut self, provider: &P) {
        for setting in &mut self.settings {
            setting.devices.clear();
        }

        let mut bindings = Vec::new();
        for platform in provider.platforms() {
            for device in &platform.devices {
                let idx = self.choose_settings(platform, device, &mut |_reason: &str| {});
                if idx < self.settings.len() {
                    info!(target: LOG_TARGET,
                        "✅ {} bound to setting [{}]", device.info_string(), idx
                    );
                    bindings.push((idx, device.linear_index()));
                } else {
                    debug!(target: LOG_TARGET,
                        "Device {} not eligible for any setting", device.name()
                    );
                }
            }
        }
        for (idx, linear) in bindings {
            self.settings[idx].devices.push(linear);
        }
    }

    fn allocate(&mut self, provider: &P) -> Result<Vec<(usize, usize)>> {
        self.instances = self
            .settings
            .iter()
            .map(|setting| {
                setting
                    .devices
                    .iter()
                    .map(|&linear| Instance {
                        device_linear: linear,
                        state: SlotState::Idle,
                    })
                    .collect()
            })
            .collect();

        let mut active = Vec::new();
        for (idx, setting) in self.settings.iter().enumerate() {
            for &linear in &setting.devices {
                if provider.device_linear(linear).is_none() {
                    bail!("bound device [{linear}] disappeared from the provider");
                }
            }
            if !setting.devices.is_empty() {
                info!(target: LOG_TARGET,
                    "🧮 Setting [{}] running {} instance(s), {} nonces per pass",
                    idx,
                    setting.devices.len(),
                    setting.config.effective_batch()
                );
                active.push((idx, setting.devices.len()));
            }
        }
        Ok(active)
    }

    fn clear(&mut self, _provider: &P) {
        debug!(target: LOG_TARGET, "Releasing {} instance list(s)", self.instances.len());
        self.instances.clear();
    }

    fn can_accept_input(&self, setting: usize, instance: usize) -> bool {
        matches!(
            self.instances
                .get(setting)
                .and_then(|list| list.get(instance))
                .map(|inst| &inst.state),
            Some(SlotState::Idle)
        )
    }

    fn begin(&mut self, setting: usize, instance: usize, wu: &WorkUnit, prev_hashes: u32) -> u32 {
        let count = self.hashes_per_pass(setting);
        let target = wu.share_target();
        let start = IterationStart {
            job_id: wu.job.job_id.clone(),
            nonce2: wu.nonce2,
            header: wu.header,
        };
        if let Some(inst) = self
            .instances
            .get_mut(setting)
            .and_then(|list| list.get_mut(instance))
        {
            debug_assert!(
                matches!(inst.state, SlotState::Idle),
                "begin on a busy slot"
            );
            inst.state = SlotState::Fed(Pass {
                start,
                start_nonce: prev_hashes,
                count,
                target,
            });
        }
        prev_hashes
    }

    fn hashes_per_pass(&self, setting: usize) -> u32 {
        self.settings
            .get(setting)
            .map(|s| s.config.effective_batch())
            .unwrap_or(MIN_BATCH)
    }

    fn results_available(
        &mut self,
        setting: usize,
        instance: usize,
    ) -> Option<(IterationStart, Vec<u32>)> {
        let inst = self
            .instances
            .get_mut(setting)
            .and_then(|list| list.get_mut(instance))?;
        match std::mem::replace(&mut inst.state, SlotState::Idle) {
            SlotState::Done(pass, found) => Some((pass.start, found)),
            other => {
                inst.state = other;
                None
            }
        }
    }

    fn wait_events(&self, _setting: usize, _instance: usize, _list: &mut Vec<P::WaitEvent>) -> usize {
        // The host-side scan completes inside dispatch; there is never a
        // device event to sleep on.
        0
    }

    fn dispatch(&mut self, setting: usize, instance: usize) -> Result<bool> {
        let inst = self.instance_mut(setting, instance)?;
        match std::mem::replace(&mut inst.state, SlotState::Idle) {
            SlotState::Fed(pass) => {
                let mut found = Vec::new();
                let mut nonce = pass.start_nonce;
                let mut left = pass.count;

                while left >= 4 {
                    for (hash, hit) in dsha256_with_nonce_batch(&pass.start.header, nonce) {
                        if hash_meets_target(&hash, &pass.target) {
                            found.push(hit);
                        }
                    }
                    nonce = nonce.wrapping_add(4);
                    left -= 4;
                }
                while left > 0 {
                    if hash_meets_target(&dsha256_with_nonce(&pass.start.header, nonce), &pass.target)
                    {
                        found.push(nonce);
                    }
                    nonce = nonce.wrapping_add(1);
                    left -= 1;
                }

                if !found.is_empty() {
                    debug!(target: LOG_TARGET,
                        "💎 Pass at nonce {} produced {} candidate(s)",
                        pass.start_nonce,
                        found.len()
                    );
                }
                inst.state = SlotState::Done(pass, found);
                Ok(false)
            }
            other => {
                inst.state = other;
                Ok(false)
            }
        }
    }

    fn hash_header(&self, header: &[u8; HEADER_LEN], _setting: usize, _instance: usize) -> [u8; 32] {
        // sha256d has no setting-dependent parameters; every configuration
        // hashes the same way.
        dsha256(header)
    }

    fn clone_without_resources(&self) -> Box<dyn AlgoImplementation<P>> {
        Box::new(Self {
            settings: self
                .settings
                .iter()
                .map(|s| Setting {
                    config: s.config.clone(),
                    devices: s.devices.clone(),
                })
                .collect(),
            instances: Vec::new(),
            _provider: PhantomData,
        })
    }

    fn device_used_config(&self, device: &P::Device) -> usize {
        let wanted = device.linear_index();
        self.settings
            .iter()
            .position(|s| s.devices.contains(&wanted))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }

    fn device_index(&self, setting: usize, instance: usize) -> usize {
        self.instances
            .get(setting)
            .and_then(|list| list.get(instance))
            .map(|inst| inst.device_linear)
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_batch_applies_intensity_and_clamps() {
        let full = Sha256dConfig {
            intensity: 100,
            batch_size: 10_000,
            min_memory_mb: 512,
        };
        assert_eq!(full.effective_batch(), 10_000);

        let halved = Sha256dConfig {
            intensity: 50,
            ..full.clone()
        };
        assert_eq!(halved.effective_batch(), 5_000);

        let tiny = Sha256dConfig {
            intensity: 1,
            batch_size: 2_000,
            min_memory_mb: 512,
        };
        assert_eq!(tiny.effective_batch(), MIN_BATCH);

        let huge = Sha256dConfig {
            intensity: 100,
            batch_size: u32::MAX,
            min_memory_mb: 512,
        };
        assert_eq!(huge.effective_batch(), MAX_BATCH);
    }

    #[test]
    fn settings_parse_fills_defaults_and_ignores_unknown_keys() {
        let mut algo: Sha256dReference<crate::compute::CpuProvider> = Sha256dReference::new();
        let record = serde_json::json!({ "intensity": 75, "linear_work": 13 });
        algo.add_settings(&record).unwrap();
        assert_eq!(algo.settings_count(), 1);
        assert_eq!(algo.settings[0].config.intensity, 75);
        assert_eq!(algo.settings[0].config.batch_size, 65_536);
    }

    #[test]
    fn settings_reject_zero_intensity() {
        let mut algo: Sha256dReference<crate::compute::CpuProvider> = Sha256dReference::new();
        let record = serde_json::json!({ "intensity": 0 });
        assert!(algo.add_settings(&record).is_err());
    }
}

// Changelog:
// - v1.1.2 (2026-07-20): Batch-of-4 scan loop.
//   - Reuses the header buffer across four nonces, same as the device
//     kernel's per-item stride.
// - v1.1.0 (2026-07-02): Settings became a JSON record with defaults.
