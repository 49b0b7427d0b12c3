// HashForge Miner - Free and Open Source Software Statement
//
// File: tests/common/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Shared test scaffolding: a stub compute provider with configurable fake
// devices, a stub pool handle, a scripted algorithm implementation for
// driving the worker deterministically, and work-unit builders.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use serde_json::Value;

use hashforge::algo::{AlgoImplementation, IterationStart, KernelStep};
use hashforge::compute::{ComputeProvider, DeviceKind, DeviceProfile, Platform};
use hashforge::core::difficulty::U256;
use hashforge::core::sha256::{dsha256, HEADER_LEN};
use hashforge::core::work::{CoinbaseDesc, JobInfo, ShareDifficulty, WorkSource, WorkUnit};

#[derive(Debug, Clone)]
pub struct StubDevice {
    pub name: String,
    pub kind: DeviceKind,
    pub linear: usize,
    pub compute_units: u32,
    pub work_group: usize,
    pub mem: u64,
}

impl StubDevice {
    pub fn gpu(linear: usize, mem: u64) -> Self {
        Self {
            name: format!("StubForce 90{linear}0"),
            kind: DeviceKind::Gpu,
            linear,
            compute_units: 32,
            work_group: 256,
            mem,
        }
    }

    pub fn cpu(linear: usize) -> Self {
        Self {
            name: "Stub CPU".to_string(),
            kind: DeviceKind::Cpu,
            linear,
            compute_units: 16,
            work_group: 1,
            mem: 16 << 30,
        }
    }
}

impl DeviceProfile for StubDevice {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> DeviceKind {
        self.kind
    }
    fn linear_index(&self) -> usize {
        self.linear
    }
    fn max_compute_units(&self) -> u32 {
        self.compute_units
    }
    fn max_work_group_size(&self) -> usize {
        self.work_group
    }
    fn global_mem_size(&self) -> u64 {
        self.mem
    }
}

pub struct StubProvider {
    platforms: Vec<Platform<StubDevice>>,
}

impl StubProvider {
    pub fn from_devices(devices: Vec<StubDevice>) -> Self {
        Self {
            platforms: vec![Platform {
                name: "Stub Platform".to_string(),
                devices,
            }],
        }
    }

    pub fn single_gpu() -> Self {
        Self::from_devices(vec![StubDevice::gpu(0, 8 << 30)])
    }

    pub fn cpu_only() -> Self {
        Self::from_devices(vec![StubDevice::cpu(0)])
    }
}

impl ComputeProvider for StubProvider {
    type Device = StubDevice;
    type WaitEvent = ();

    fn platforms(&self) -> &[Platform<StubDevice>] {
        &self.platforms
    }

    fn wait(&self, events: &[()], timeout: Duration) -> usize {
        if events.is_empty() {
            std::thread::sleep(timeout.min(Duration::from_millis(10)));
            0
        } else {
            events.len()
        }
    }
}

pub struct StubPool(pub String);

impl WorkSource for StubPool {
    fn name(&self) -> &str {
        &self.0
    }
}

pub fn stub_pool(name: &str) -> Arc<dyn WorkSource> {
    Arc::new(StubPool(name.to_string()))
}

/// Work unit over a zeroed coinbase and an empty merkle branch.
pub fn build_work_unit(job_id: &str, target: U256, little_endian: bool) -> WorkUnit {
    WorkUnit::new(
        JobInfo {
            job_id: job_id.to_string(),
            nonce1: vec![0x01, 0x02, 0x03, 0x04],
        },
        0x66aa_bbcc,
        ShareDifficulty {
            share_diff: 1.0,
            share_target: target,
        },
        [0u8; HEADER_LEN],
        CoinbaseDesc {
            binary: vec![0u8; 64],
            nonce2_off: 0,
            merkles: Vec::new(),
            merkle_off: 36,
        },
        dsha256,
        little_endian,
    )
    .expect("test work unit must build")
}

/// Poll `probe` until it returns true or the deadline passes.
pub fn wait_for(deadline: Duration, mut probe: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if probe() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Algorithm that emits one scripted batch of candidates and then idles.
/// `verify_hash` is what hash_header reports, letting tests steer the CPU
/// verification outcome.
pub struct ScriptedAlgo {
    pub candidates: Vec<u32>,
    pub verify_hash: [u8; 32],
    pub fail_allocate: Option<String>,
    bound: Vec<usize>,
    pending: Option<IterationStart>,
    emitted: bool,
}

impl ScriptedAlgo {
    pub fn new(candidates: Vec<u32>, verify_hash: [u8; 32]) -> Self {
        Self {
            candidates,
            verify_hash,
            fail_allocate: None,
            bound: Vec::new(),
            pending: None,
            emitted: false,
        }
    }

    pub fn failing(message: &str) -> Self {
        let mut algo = Self::new(Vec::new(), [0u8; 32]);
        algo.fail_allocate = Some(message.to_string());
        algo
    }
}

impl AlgoImplementation<StubProvider> for ScriptedAlgo {
    fn name(&self) -> &str {
        "scripted"
    }

    fn version(&self) -> &str {
        "0.1"
    }

    fn little_endian(&self) -> bool {
        true
    }

    fn source_for(&self, step: usize) -> Option<KernelStep> {
        (step == 0).then_some(KernelStep {
            file: "scripted.cl",
            source: "__kernel void scripted() {}",
            entry: "scripted",
        })
    }

    fn settings_count(&self) -> usize {
        1
    }

    fn add_settings(&mut self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn choose_settings(
        &self,
        _platform: &Platform<StubDevice>,
        _device: &StubDevice,
        _reject: &mut dyn FnMut(&str),
    ) -> usize {
        0
    }

    fn select_settings(&mut self, provider: &StubProvider) {
        self.bound = (0..provider.device_count()).collect();
    }

    fn allocate(&mut self, _provider: &StubProvider) -> Result<Vec<(usize, usize)>> {
        if let Some(message) = &self.fail_allocate {
            bail!("{message}");
        }
        Ok(vec![(0, 1)])
    }

    fn clear(&mut self, _provider: &StubProvider) {
        self.pending = None;
    }

    fn can_accept_input(&self, _setting: usize, _instance: usize) -> bool {
        self.pending.is_none() && !self.emitted
    }

    fn begin(&mut self, _setting: usize, _instance: usize, wu: &WorkUnit, prev_hashes: u32) -> u32 {
        self.pending = Some(IterationStart {
            job_id: wu.job.job_id.clone(),
            nonce2: wu.nonce2,
            header: wu.header,
        });
        prev_hashes
    }

    fn hashes_per_pass(&self, _setting: usize) -> u32 {
        4_096
    }

    fn results_available(
        &mut self,
        _setting: usize,
        _instance: usize,
    ) -> Option<(IterationStart, Vec<u32>)> {
        let start = self.pending.take()?;
        self.emitted = true;
        Some((start, self.candidates.clone()))
    }

    fn wait_events(&self, _setting: usize, _instance: usize, _list: &mut Vec<()>) -> usize {
        0
    }

    fn dispatch(&mut self, _setting: usize, _instance: usize) -> Result<bool> {
        Ok(false)
    }

    fn hash_header(&self, _header: &[u8; HEADER_LEN], _setting: usize, _instance: usize) -> [u8; 32] {
        self.verify_hash
    }

    fn clone_without_resources(&self) -> Box<dyn AlgoImplementation<StubProvider>> {
        Box::new(Self {
            candidates: self.candidates.clone(),
            verify_hash: self.verify_hash,
            fail_allocate: self.fail_allocate.clone(),
            bound: self.bound.clone(),
            pending: None,
            emitted: false,
        })
    }

    fn device_used_config(&self, device: &StubDevice) -> usize {
        if self.bound.contains(&device.linear_index()) {
            1
        } else {
            0
        }
    }

    fn device_index(&self, _setting: usize, instance: usize) -> usize {
        instance
    }
}
