// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/worker.rs
// Version: 1.2.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// The mining worker thread. Takes exclusive ownership of the algorithm
// implementation through the inbox handoff, allocates device resources,
// then pipelines passes across every (setting, instance) slot: feed free
// slots from the current work unit, advance dispatches, extract and verify
// candidates, and sleep on aggregated device events when nothing can make
// progress. The worker recovers from nothing; any error terminates it and
// is reported through the outbox.
//
// Tree Location:
// - src/miner/worker.rs (mining thread loop)
// - Depends on: anyhow, tracing, core, algo, compute

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::compute::ComputeProvider;
use crate::core::difficulty::{hash_meets_target, U256};
use crate::core::sha256::NONCE_RANGE;
use crate::core::work::{Nonces, WorkSource, WorkUnit};
use crate::miner::mailbox::{Inbox, Outbox};
use crate::miner::stats::MinerStats;

/// Sleep bound while blocked on device events
const EVENT_WAIT: Duration = Duration::from_millis(250);
/// Sleep bound while idle (no pool, no work, or no slots)
const IDLE_WAIT: Duration = Duration::from_millis(100);
/// Poll interval while waiting for the implementation handoff
const HANDOFF_WAIT: Duration = Duration::from_millis(50);

/// Share targets of recently fed jobs, so results extracted after a job
/// change verify against the target their pass was started under.
const REMEMBERED_JOBS: usize = 16;

pub(crate) fn mining_thread<P: ComputeProvider>(
    provider: Arc<P>,
    inbox: Arc<Mutex<Inbox<P>>>,
    outbox: Arc<Mutex<Outbox>>,
    stats: Arc<MinerStats>,
) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        run(provider.as_ref(), &inbox, &outbox, &stats)
    }));

    let mut out = outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match result {
        Ok(Ok(())) => info!("Mining worker exiting cleanly"),
        Ok(Err(err)) => {
            error!("Mining worker failed: {:#}", err);
            out.error = Some(format!("{err:#}"));
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Mining worker panicked: {}", message);
            out.error = Some(message);
        }
    }
    out.terminated = true;
}

fn run<P: ComputeProvider>(
    provider: &P,
    inbox: &Mutex<Inbox<P>>,
    outbox: &Mutex<Outbox>,
    stats: &MinerStats,
) -> Result<()> {
    // Init phase: the owner parks the implementation in the inbox before
    // spawning us, so this resolves on the first pass in practice.
    let mut algo = loop {
        {
            let mut mailbox = inbox.lock().unwrap();
            if mailbox.terminate {
                return Ok(());
            }
            if let Some(algo) = mailbox.handoff.take() {
                break algo;
            }
        }
        provider.wait(&[], HANDOFF_WAIT);
    };

    let slots = match algo.allocate(provider) {
        Ok(active) => flatten_slots(&active),
        Err(err) => {
            algo.clear(provider);
            return Err(err.context("resource allocation failed"));
        }
    };
    info!("Mining worker initialized with {} pipeline slot(s)", slots.len());
    outbox.lock().unwrap().initialized = true;

    let mut current: Option<WorkUnit> = None;
    let mut fed: u32 = 0;
    let mut targets: Vec<(String, U256)> = Vec::new();

    loop {
        // Brief inbox snapshot; never hold the lock into algorithm calls.
        let (terminate, check_nonces, pool, fresh): (
            bool,
            bool,
            Option<Arc<dyn WorkSource>>,
            Option<WorkUnit>,
        ) = {
            let mut mailbox = inbox.lock().unwrap();
            (
                mailbox.terminate,
                mailbox.check_nonces,
                mailbox.pool.clone(),
                mailbox.work.take(),
            )
        };
        if terminate {
            break;
        }

        if let Some(mut unit) = fresh {
            if unit.restart {
                fed = 0;
            } else if let Some(prev) = &current {
                // Continue the running nonce2 iteration under the new data
                unit.nonce2 = prev.nonce2;
                unit.rebuild_header();
            }
            debug!(
                job_id = %unit.job.job_id,
                restart = unit.restart,
                "Work unit accepted"
            );
            current = Some(unit);
        }

        let mut did_work = false;
        let active = pool.is_some() && current.is_some();

        if active {
            let unit = current.as_mut().expect("checked above");

            for &(setting, instance) in &slots {
                if !algo.can_accept_input(setting, instance) {
                    continue;
                }
                let stride = algo.hashes_per_pass(setting);
                if u32::MAX - fed < stride {
                    // 32-bit nonce space exhausted for this nonce2
                    unit.advance_nonce2();
                    fed = 0;
                }
                remember_target(&mut targets, &unit.job.job_id, unit.share_target());
                let started = algo.begin(setting, instance, unit, fed);
                fed = started.wrapping_add(stride);
                did_work = true;
            }

            for &(setting, instance) in &slots {
                match algo.dispatch(setting, instance) {
                    Ok(true) => did_work = true,
                    Ok(false) => {}
                    Err(err) => {
                        algo.clear(provider);
                        return Err(err.context("algorithm dispatch failed"));
                    }
                }

                let Some((start, candidates)) = algo.results_available(setting, instance) else {
                    continue;
                };
                did_work = true;
                stats
                    .hashes_computed
                    .fetch_add(algo.hashes_per_pass(setting) as u64, Ordering::Relaxed);
                if candidates.is_empty() {
                    continue;
                }

                let Some(target) = lookup_target(&targets, &start.job_id) else {
                    warn!(
                        job_id = %start.job_id,
                        "Dropping {} candidate(s) for a forgotten job",
                        candidates.len()
                    );
                    continue;
                };

                let mut good = Vec::with_capacity(candidates.len());
                for nonce in candidates {
                    if check_nonces {
                        let mut header = start.header;
                        header[NONCE_RANGE].copy_from_slice(&nonce.to_le_bytes());
                        let hash = algo.hash_header(&header, setting, instance);
                        if !hash_meets_target(&hash, &target) {
                            warn!(
                                "Nonce {:08x} fails CPU verification, discarded",
                                nonce
                            );
                            stats.shares_discarded.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                    }
                    good.push(nonce);
                }

                if !good.is_empty() {
                    stats
                        .shares_found
                        .fetch_add(good.len() as u64, Ordering::Relaxed);
                    info!(
                        "💎 {} share(s) for job {} at nonce2 {}",
                        good.len(),
                        start.job_id,
                        start.nonce2
                    );
                    outbox.lock().unwrap().found.push(Nonces {
                        job_id: start.job_id,
                        nonce2: start.nonce2,
                        header: start.header,
                        nonces: good,
                    });
                }
            }
        }

        if !did_work {
            let mut events = Vec::new();
            for &(setting, instance) in &slots {
                algo.wait_events(setting, instance, &mut events);
            }
            let timeout = if events.is_empty() { IDLE_WAIT } else { EVENT_WAIT };
            provider.wait(&events, timeout);
        }
    }

    algo.clear(provider);
    Ok(())
}

fn flatten_slots(active: &[(usize, usize)]) -> Vec<(usize, usize)> {
    active
        .iter()
        .flat_map(|&(setting, count)| (0..count).map(move |instance| (setting, instance)))
        .collect()
}

fn remember_target(targets: &mut Vec<(String, U256)>, job_id: &str, target: U256) {
    if let Some(entry) = targets.iter_mut().find(|(job, _)| job == job_id) {
        entry.1 = target;
        return;
    }
    targets.push((job_id.to_string(), target));
    if targets.len() > REMEMBERED_JOBS {
        targets.remove(0);
    }
}

fn lookup_target(targets: &[(String, U256)], job_id: &str) -> Option<U256> {
    targets
        .iter()
        .find(|(job, _)| job == job_id)
        .map(|(_, target)| *target)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "mining worker panicked".to_string()
    }
}


// Changelog:
// - v1.2.0 (2026-07-20): Continuous refeed of free pipeline slots.
//   - Slots are fed every pass, not only when a new unit arrives, and the
//     nonce space rolls into nonce2 when the 32-bit range would wrap.
// - v1.1.0 (2026-07-02): Per-job target memory for late results.
