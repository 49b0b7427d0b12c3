// HashForge Miner - Free and Open Source Software Statement
//
// File: src/compute/mod.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Compute provider seam: the abstraction every backend (OpenCL, CUDA, host
// CPU) implements so the mining engine can enumerate devices and sleep on
// their completion events without knowing the API underneath. The hot path
// (kernel enqueue, buffer traffic) stays inside the backend-specific
// algorithm implementations; only enumeration and waiting cross this seam.

pub mod cpu;

pub use cpu::{CpuDevice, CpuProvider};

use std::time::Duration;

/// Broad device classification, used by settings eligibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Gpu,
    Cpu,
    Accelerator,
}

/// Attributes every compute device exposes, whatever the backend.
pub trait DeviceProfile {
    fn name(&self) -> &str;
    fn kind(&self) -> DeviceKind;
    /// Index of this device in the provider-wide linear enumeration
    fn linear_index(&self) -> usize;
    fn max_compute_units(&self) -> u32;
    fn max_work_group_size(&self) -> usize;
    fn global_mem_size(&self) -> u64;

    /// One-line summary for logs and diagnostics
    fn info_string(&self) -> String {
        format!(
            "{} (CU: {}, WG: {}, MEM: {:.1} GB)",
            self.name(),
            self.max_compute_units(),
            self.max_work_group_size(),
            self.global_mem_size() as f64 / (1024.0 * 1024.0 * 1024.0)
        )
    }
}

/// One platform of a provider: a named group of devices sharing a backend
/// runtime (an OpenCL platform, a CUDA context, the host).
#[derive(Debug, Clone)]
pub struct Platform<D> {
    pub name: String,
    pub devices: Vec<D>,
}

/// A tree of platforms and devices plus the one blocking primitive the
/// worker is allowed to sleep in.
///
/// Wait events are opaque handles produced by algorithm implementations at
/// the end of a dispatch pass; events passed to a single `wait` call must
/// all come from this provider.
pub trait ComputeProvider: Send + Sync + 'static {
    type Device: DeviceProfile + Send + Sync;
    type WaitEvent: Send;

    fn platforms(&self) -> &[Platform<Self::Device>];

    /// Block until at least one event signals or the timeout elapses,
    /// returning how many signalled. An empty event list is a plain bounded
    /// sleep. Spurious returns of 0 are acceptable.
    fn wait(&self, events: &[Self::WaitEvent], timeout: Duration) -> usize;

    fn device_count(&self) -> usize {
        self.platforms().iter().map(|p| p.devices.len()).sum()
    }

    /// Walk the platform tree by provider-linear device index.
    fn device_linear(&self, index: usize) -> Option<&Self::Device> {
        let mut remaining = index;
        for platform in self.platforms() {
            if remaining < platform.devices.len() {
                return Some(&platform.devices[remaining]);
            }
            remaining -= platform.devices.len();
        }
        None
    }

    /// Platform that owns the given device.
    fn platform_of(&self, device: &Self::Device) -> Option<&Platform<Self::Device>> {
        let wanted = device.linear_index();
        self.platforms()
            .iter()
            .find(|p| p.devices.iter().any(|d| d.linear_index() == wanted))
    }
}
