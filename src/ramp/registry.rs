//! Per-address single-flight table for ramp executions.
//!
//! # Responsibilities
//! - Admit at most one active ramp per backend address
//! - Carry a cancellation signal to each in-flight ramp
//!
//! # Design Decisions
//! - `begin` is the checked-and-set gate: a second caller for the same
//!   address gets `None` and must treat its trigger as a no-op
//! - The ticket removes its table entry on drop, so every exit path of a
//!   ramp (complete, abort, cancel, panic) releases the address

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

type ActiveMap = DashMap<String, watch::Sender<bool>>;

/// Table of in-flight ramps keyed by backend address.
#[derive(Debug, Default)]
pub struct RampRegistry {
    active: Arc<ActiveMap>,
}

impl RampRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the address for a new ramp execution.
    ///
    /// Returns `None` when a ramp for this address is already in flight.
    pub fn begin(&self, address: &str) -> Option<RampTicket> {
        match self.active.entry(address.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(false);
                slot.insert(tx);
                Some(RampTicket {
                    active: Arc::clone(&self.active),
                    address: address.to_string(),
                    cancelled: rx,
                })
            }
        }
    }

    /// Signal the in-flight ramp for this address, if any, to stop.
    pub fn cancel(&self, address: &str) {
        if let Some(slot) = self.active.get(address) {
            let _ = slot.value().send(true);
        }
    }

    /// Signal every in-flight ramp to stop. Used at process shutdown.
    pub fn cancel_all(&self) {
        for slot in self.active.iter() {
            let _ = slot.value().send(true);
        }
    }

    /// Whether a ramp for this address is currently in flight.
    pub fn is_active(&self, address: &str) -> bool {
        self.active.contains_key(address)
    }
}

/// Exclusive claim on an address, held for the lifetime of one ramp.
#[derive(Debug)]
pub struct RampTicket {
    active: Arc<ActiveMap>,
    address: String,
    cancelled: watch::Receiver<bool>,
}

impl RampTicket {
    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolve once cancellation is signalled.
    pub async fn wait_cancelled(&mut self) {
        // Err means the registry is gone; treat that as cancellation too.
        let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
    }
}

impl Drop for RampTicket {
    fn drop(&mut self) {
        self.active.remove(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_for_same_address_is_refused() {
        let registry = RampRegistry::new();
        let ticket = registry.begin("podA").expect("first claim");
        assert!(registry.begin("podA").is_none());
        assert!(registry.begin("podB").is_some());
        drop(ticket);
    }

    #[test]
    fn drop_releases_the_address() {
        let registry = RampRegistry::new();
        drop(registry.begin("podA").unwrap());
        assert!(!registry.is_active("podA"));
        assert!(registry.begin("podA").is_some());
    }

    #[tokio::test]
    async fn cancel_reaches_the_ticket() {
        let registry = RampRegistry::new();
        let mut ticket = registry.begin("podA").unwrap();
        assert!(!ticket.is_cancelled());

        registry.cancel("podA");
        ticket.wait_cancelled().await;
        assert!(ticket.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_all_reaches_every_ticket() {
        let registry = RampRegistry::new();
        let mut a = registry.begin("podA").unwrap();
        let mut b = registry.begin("podB").unwrap();

        registry.cancel_all();
        a.wait_cancelled().await;
        b.wait_cancelled().await;
    }

    #[test]
    fn cancel_of_idle_address_is_a_noop() {
        let registry = RampRegistry::new();
        registry.cancel("ghost");
        assert!(!registry.is_active("ghost"));
    }
}
