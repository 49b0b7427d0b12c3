// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats.rs
// Version: 1.0.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Shared mining statistics. The worker updates the counters on every
// extracted pass; the owner thread reads them at any time for dashboards
// and logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct MinerStats {
    pub hashes_computed: AtomicU64,
    pub shares_found: AtomicU64,
    /// Candidates dropped by CPU verification (hash above target)
    pub shares_discarded: AtomicU64,
    start_time: Instant,
}

impl MinerStats {
    pub fn new() -> Self {
        Self {
            hashes_computed: AtomicU64::new(0),
            shares_found: AtomicU64::new(0),
            shares_discarded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Average hashrate since startup, in H/s
    pub fn hashrate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.hashes_computed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn format_number(num: u64) -> String {
        if num >= 1_000_000_000 {
            format!("{:.1}B", num as f64 / 1_000_000_000.0)
        } else if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    pub fn format_hashrate(rate: f64) -> String {
        if rate >= 1_000_000.0 {
            format!("{:.2} MH/s", rate / 1_000_000.0)
        } else if rate >= 1_000.0 {
            format!("{:.2} KH/s", rate / 1_000.0)
        } else {
            format!("{:.2} H/s", rate)
        }
    }
}

impl Default for MinerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_scales() {
        assert_eq!(MinerStats::format_number(950), "950");
        assert_eq!(MinerStats::format_number(1_500), "1.5K");
        assert_eq!(MinerStats::format_number(2_500_000), "2.5M");
        assert_eq!(MinerStats::format_number(3_100_000_000), "3.1B");
    }

    #[test]
    fn hashrate_formatting_scales() {
        assert_eq!(MinerStats::format_hashrate(12.0), "12.00 H/s");
        assert_eq!(MinerStats::format_hashrate(1_500.0), "1.50 KH/s");
        assert_eq!(MinerStats::format_hashrate(2_000_000.0), "2.00 MH/s");
    }
}
