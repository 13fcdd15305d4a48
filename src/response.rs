//! Outcome of a fan-out to child lights.

use crate::errors::Error;
use crate::payload::{Service, ServiceCall};

/// Result of one service call.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub call: ServiceCall,
    pub result: Result<(), Error>,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn service(&self) -> Service {
        self.call.service
    }
}

/// Per-call outcomes of a group command.
///
/// Failures of individual children are collected here instead of being
/// returned as an error, so one unreachable child never fails the group
/// command.
#[derive(Debug, Default)]
pub struct DispatchReport {
    outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn new(outcomes: Vec<DispatchOutcome>) -> Self {
        DispatchReport { outcomes }
    }

    pub fn outcomes(&self) -> &[DispatchOutcome] {
        &self.outcomes
    }

    /// The calls that were dispatched, in issue order.
    pub fn calls(&self) -> impl Iterator<Item = &ServiceCall> {
        self.outcomes.iter().map(|o| &o.call)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(DispatchOutcome::is_ok)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
