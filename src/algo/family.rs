// HashForge Miner - Free and Open Source Software Statement
//
// File: src/algo/family.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Algorithm family - a named group of alternative implementations of the
// same algorithm. Pure dispatch wrapper: name matching is case-insensitive
// and resource teardown runs over the members in declaration order.

use crate::algo::AlgoImplementation;
use crate::compute::ComputeProvider;

pub struct AlgoFamily<P: ComputeProvider> {
    pub name: String,
    pub implementations: Vec<Box<dyn AlgoImplementation<P>>>,
}

impl<P: ComputeProvider> AlgoFamily<P> {
    pub fn new(name: impl Into<String>, implementations: Vec<Box<dyn AlgoImplementation<P>>>) -> Self {
        Self {
            name: name.into(),
            implementations,
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Comma-separated implementation names, for enumeration
    pub fn implementation_names(&self) -> String {
        self.implementations
            .iter()
            .map(|imp| imp.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn find(&self, implementation: &str) -> Option<&dyn AlgoImplementation<P>> {
        self.implementations
            .iter()
            .find(|imp| imp.matches_name(implementation))
            .map(|boxed| boxed.as_ref())
    }

    pub fn clear(&mut self, provider: &P) {
        for implementation in &mut self.implementations {
            implementation.clear(provider);
        }
    }
}
