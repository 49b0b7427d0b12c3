// HashForge Miner - Free and Open Source Software Statement
//
// This project, hashforge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/coordinator.rs
// Version: 1.2.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// The owner-side mining facade. Owns the algorithm families, the compute
// provider, the worker thread and the two mailboxes. The outer pool layer
// binds one implementation, feeds settings and work units through here, and
// drains verified shares back out. Binding is single-shot: algorithm
// switching after mining has started is not supported.
//
// Tree Location:
// - src/miner/coordinator.rs (miner coordinator facade)
// - Depends on: serde_json, thiserror, tracing, algo, compute, miner

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::algo::{AlgoFamily, AlgoImplementation};
use crate::compute::ComputeProvider;
use crate::core::work::{Nonces, WorkSource, WorkUnit};
use crate::miner::mailbox::{Inbox, Outbox};
use crate::miner::stats::MinerStats;
use crate::miner::worker::mining_thread;

/// How long teardown waits for the worker to acknowledge termination before
/// abandoning the join.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const TEARDOWN_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("miner already set up to run {0}.{1}, algorithm switching not supported")]
    AlreadyBound(String, String),
    #[error("unknown algorithm family \"{0}\"")]
    UnknownAlgo(String),
    #[error("unknown implementation \"{1}\" for algorithm \"{0}\"")]
    UnknownImplementation(String, String),
    #[error("mining already started, restarting is not supported")]
    AlreadyStarted,
    #[error("no algorithm implementation selected to mine")]
    NothingSelected,
}

/// Thread-safe mining coordinator, generic over the compute provider.
pub struct Miner<P: ComputeProvider> {
    provider: Arc<P>,
    families: Vec<AlgoFamily<P>>,
    current_algo: String,
    current_impl: String,
    inbox: Arc<Mutex<Inbox<P>>>,
    outbox: Arc<Mutex<Outbox>>,
    stats: Arc<MinerStats>,
    worker: Option<JoinHandle<()>>,
}

impl<P: ComputeProvider> Miner<P> {
    pub fn new(provider: P, families: Vec<AlgoFamily<P>>) -> Self {
        Self {
            provider: Arc::new(provider),
            families,
            current_algo: String::new(),
            current_impl: String::new(),
            inbox: Arc::new(Mutex::new(Inbox::new())),
            outbox: Arc::new(Mutex::new(Outbox::new())),
            stats: Arc::new(MinerStats::new()),
            worker: None,
        }
    }

    /// Comma-separated family names
    pub fn algos(&self) -> String {
        self.families
            .iter()
            .map(|family| family.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated implementation names of one family; empty when the
    /// family is unknown
    pub fn implementations(&self, algo: &str) -> String {
        self.families
            .iter()
            .find(|family| family.matches_name(algo))
            .map(|family| family.implementation_names())
            .unwrap_or_default()
    }

    /// Bind the implementation to mine. Single-shot: a second call fails
    /// without mutating the binding.
    pub fn set_current(&mut self, algo: &str, implementation: &str) -> Result<(), MinerError> {
        if !self.current_algo.is_empty() || !self.current_impl.is_empty() {
            return Err(MinerError::AlreadyBound(
                self.current_algo.clone(),
                self.current_impl.clone(),
            ));
        }
        let family = self
            .families
            .iter()
            .find(|family| family.matches_name(algo))
            .ok_or_else(|| MinerError::UnknownAlgo(algo.to_string()))?;
        let found = family
            .find(implementation)
            .ok_or_else(|| {
                MinerError::UnknownImplementation(algo.to_string(), implementation.to_string())
            })?;

        // Store canonical spellings so later lookups are exact
        self.current_algo = family.name.clone();
        self.current_impl = found.name().to_string();
        info!("Mining set up for {}.{}", self.current_algo, self.current_impl);
        Ok(())
    }

    /// Canonical name of the bound family, if any
    pub fn current_algo(&self) -> Option<&str> {
        (!self.current_algo.is_empty()).then_some(self.current_algo.as_str())
    }

    /// Name and versioning signature of the bound implementation
    pub fn current_impl_info(&self) -> Option<(String, u64)> {
        let imp = self.current_impl_ref()?;
        Some((imp.name().to_string(), imp.versioning_hash()))
    }

    /// Introspection access to one implementation
    pub fn implementation(&self, family: &str, name: &str) -> Option<&dyn AlgoImplementation<P>> {
        self.families
            .iter()
            .find(|f| f.matches_name(family))
            .and_then(|f| f.find(name))
    }

    /// Walk the nested settings tree `{ family: { impl: record | [record] } }`
    /// and forward each leaf to the matching implementation. Unknown keys
    /// are ignored.
    pub fn add_settings(&mut self, params: &Value) -> Result<()> {
        let Some(tree) = params.as_object() else {
            warn!("Settings root is not an object, nothing added");
            return Ok(());
        };
        for family in &mut self.families {
            let Some(branch) = tree.get(&family.name).and_then(|v| v.as_object()) else {
                continue;
            };
            for implementation in &mut family.implementations {
                let Some(leaf) = branch.get(implementation.name()) else {
                    continue;
                };
                if let Some(records) = leaf.as_array() {
                    for record in records {
                        implementation.add_settings(record)?;
                    }
                } else {
                    implementation.add_settings(leaf)?;
                }
            }
        }
        Ok(())
    }

    /// Select settings for the bound implementation, hand a resource-less
    /// clone to a fresh worker thread and start mining.
    pub fn start(&mut self) -> Result<(), MinerError> {
        if self.worker.is_some() {
            return Err(MinerError::AlreadyStarted);
        }
        let provider = Arc::clone(&self.provider);
        let Some(imp) = self.current_impl_mut() else {
            return Err(MinerError::NothingSelected);
        };
        imp.select_settings(provider.as_ref());
        let running = imp.clone_without_resources();

        self.inbox.lock().unwrap().handoff = Some(running);

        let inbox = Arc::clone(&self.inbox);
        let outbox = Arc::clone(&self.outbox);
        let stats = Arc::clone(&self.stats);
        let handle = std::thread::spawn(move || mining_thread(provider, inbox, outbox, stats));
        self.worker = Some(handle);
        info!("⛏️  Mining worker launched");
        Ok(())
    }

    /// Hand a new pool reference and work unit to the worker. Passing None
    /// for the pool sends the worker idle.
    pub fn submit_work(&self, pool: Option<Arc<dyn WorkSource>>, work: Option<WorkUnit>) {
        let mut inbox = self.inbox.lock().unwrap();
        inbox.pool = pool;
        inbox.work = work;
    }

    /// Pool reference the worker is currently mining for
    pub fn current_pool(&self) -> Option<Arc<dyn WorkSource>> {
        self.inbox.lock().unwrap().pool.clone()
    }

    /// Move every queued share into `out`; true when anything was moved
    pub fn drain_shares(&self, out: &mut Vec<Nonces>) -> bool {
        let mut outbox = self.outbox.lock().unwrap();
        if outbox.found.is_empty() {
            return false;
        }
        out.append(&mut outbox.found);
        true
    }

    /// Toggle CPU verification of candidate nonces
    pub fn check_nonces(&self, check: bool) {
        self.inbox.lock().unwrap().check_nonces = check;
    }

    /// Setting binding of a device by provider-linear index: None when the
    /// index is out of range, 0 when unused, else 1 + setting index.
    pub fn device_config(&self, device: usize) -> Option<usize> {
        let found = self.provider.device_linear(device)?;
        Some(match self.current_impl_ref() {
            None => 0,
            Some(imp) => imp.device_used_config(found),
        })
    }

    /// Why the device ended up unused, from a resource-less probe of the
    /// bound implementation.
    pub fn bad_config_reasons(&self, device: usize) -> Vec<String> {
        let Some(imp) = self.current_impl_ref() else {
            return vec!["no algorithm implementation selected to mine".to_string()];
        };
        let Some(found) = self.provider.device_linear(device) else {
            return vec![format!("device [{device}] does not exist")];
        };
        let Some(platform) = self.provider.platform_of(found) else {
            return vec![format!("device [{device}] not owned by any platform")];
        };
        imp.bad_config_reasons(platform, found)
    }

    /// True when the worker terminated without being asked to. Drains the
    /// worker's error description into `desc` when one was produced.
    pub fn unexpectedly_terminated(&self, desc: &mut String) -> bool {
        let inbox = self.inbox.lock().unwrap();
        let mut outbox = self.outbox.lock().unwrap();
        if !inbox.terminate && outbox.terminated {
            if let Some(message) = outbox.error.take() {
                *desc = message;
            }
            return true;
        }
        false
    }

    /// True once the worker allocated its resources and entered the loop
    pub fn working(&self) -> bool {
        self.outbox.lock().unwrap().initialized
    }

    pub fn stats(&self) -> Arc<MinerStats> {
        Arc::clone(&self.stats)
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn current_impl_ref(&self) -> Option<&dyn AlgoImplementation<P>> {
        if self.current_algo.is_empty() {
            return None;
        }
        self.families
            .iter()
            .find(|family| family.matches_name(&self.current_algo))?
            .find(&self.current_impl)
    }

    fn current_impl_mut(&mut self) -> Option<&mut Box<dyn AlgoImplementation<P>>> {
        if self.current_algo.is_empty() {
            return None;
        }
        let algo = self.current_algo.clone();
        let imp = self.current_impl.clone();
        self.families
            .iter_mut()
            .find(|family| family.matches_name(&algo))?
            .implementations
            .iter_mut()
            .find(|candidate| candidate.matches_name(&imp))
    }
}

impl<P: ComputeProvider> Drop for Miner<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.inbox.lock().unwrap().terminate = true;

            let deadline = Instant::now() + TEARDOWN_TIMEOUT;
            let mut acknowledged = false;
            while Instant::now() < deadline {
                if self.outbox.lock().unwrap().terminated {
                    acknowledged = true;
                    break;
                }
                std::thread::sleep(TEARDOWN_POLL);
            }

            if acknowledged {
                let _ = handle.join();
                debug!("Mining worker joined");
            } else {
                // Assumed hung; abandoning the join leaks the thread but
                // keeps teardown bounded.
                warn!("Mining worker missed the teardown deadline, abandoning join");
            }
        }

        let provider = Arc::clone(&self.provider);
        for family in &mut self.families {
            family.clear(provider.as_ref());
        }
    }
}
