// HashForge Miner - Free and Open Source Software Statement
//
// File: src/miner/mailbox.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// The two mailboxes shared between the owner thread and the mining worker.
// Each is a mutex-protected record; locks are held only for a single field
// read/write or ownership transfer, never across an algorithm call or a
// provider wait. Acquisition order when both are needed: inbox before
// outbox.

use std::sync::Arc;

use crate::algo::AlgoImplementation;
use crate::compute::ComputeProvider;
use crate::core::work::{Nonces, WorkSource, WorkUnit};

/// Owner-to-worker mailbox.
pub struct Inbox<P: ComputeProvider> {
    /// Asks the worker to finish as fast as possible, gracefully
    pub terminate: bool,
    /// When false, candidate nonces are assumed valid and skip CPU hashing
    pub check_nonces: bool,
    /// One-shot slot handing the worker its owned implementation instance
    pub handoff: Option<Box<dyn AlgoImplementation<P>>>,
    /// Pool the current work belongs to; None sends the worker idle
    pub pool: Option<Arc<dyn WorkSource>>,
    /// Freshly submitted work unit, taken by the worker on its next pass
    pub work: Option<WorkUnit>,
}

impl<P: ComputeProvider> Inbox<P> {
    pub fn new() -> Self {
        Self {
            terminate: false,
            check_nonces: true,
            handoff: None,
            pool: None,
            work: None,
        }
    }
}

impl<P: ComputeProvider> Default for Inbox<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker-to-owner mailbox.
#[derive(Default)]
pub struct Outbox {
    /// Verified shares awaiting drain, in discovery order per job
    pub found: Vec<Nonces>,
    /// Set exactly once, at worker exit. A worker that terminated without
    /// being asked to did so abnormally.
    pub terminated: bool,
    /// Set once resources are allocated and the steady-state loop runs
    pub initialized: bool,
    /// Written before `terminated` on abnormal exits
    pub error: Option<String>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }
}
