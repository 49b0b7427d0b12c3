// HashForge Miner - Free and Open Source Software Statement
//
// File: src/compute/cpu.rs
// Version: 1.0.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Host CPU provider - describes the host as a single platform with a single
// device so the engine runs (and configuration rejection paths are real) on
// machines without a GPU runtime.

use std::time::Duration;

use sysinfo::System;
use tracing::debug;

use super::{ComputeProvider, DeviceKind, DeviceProfile, Platform};

#[derive(Debug, Clone)]
pub struct CpuDevice {
    name: String,
    compute_units: u32,
    global_mem: u64,
}

impl DeviceProfile for CpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn linear_index(&self) -> usize {
        0
    }

    fn max_compute_units(&self) -> u32 {
        self.compute_units
    }

    fn max_work_group_size(&self) -> usize {
        // Host threads have no work-group notion; report a token size so
        // generic eligibility checks still produce a sensible reason.
        1
    }

    fn global_mem_size(&self) -> u64 {
        self.global_mem
    }
}

/// The host seen through the provider seam. Produces no wait events; waiting
/// on an empty event list is a bounded sleep, which is exactly what the
/// worker needs when idle.
pub struct CpuProvider {
    platforms: Vec<Platform<CpuDevice>>,
}

impl CpuProvider {
    pub fn detect() -> Self {
        let sys = System::new_all();

        let brand = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "Host CPU".to_string());

        let device = CpuDevice {
            name: format!("{} ({} threads)", brand, num_cpus::get()),
            compute_units: num_cpus::get() as u32,
            global_mem: sys.total_memory(),
        };
        debug!("Detected host device: {}", device.info_string());

        Self {
            platforms: vec![Platform {
                name: "Host".to_string(),
                devices: vec![device],
            }],
        }
    }
}

impl Default for CpuProvider {
    fn default() -> Self {
        Self::detect()
    }
}

impl ComputeProvider for CpuProvider {
    type Device = CpuDevice;
    type WaitEvent = ();

    fn platforms(&self) -> &[Platform<CpuDevice>] {
        &self.platforms
    }

    fn wait(&self, events: &[()], timeout: Duration) -> usize {
        if events.is_empty() {
            std::thread::sleep(timeout);
            0
        } else {
            events.len()
        }
    }
}
