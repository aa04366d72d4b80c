//! In-memory model of the load balancer configuration.
//!
//! # Responsibilities
//! - Represent virtual services and their weighted real servers
//! - Merge-by-identity backend updates across all virtual services
//! - Address-wide backend removal on member departure

use std::collections::BTreeMap;

/// One backend instance behind a virtual service.
///
/// Identity is `(address, port)`; only the weight is mutable once admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealServer {
    /// Pod name serving the traffic.
    pub address: String,
    /// Destination port the backend listens on.
    pub port: u16,
    /// Current traffic weight, 0..=100.
    pub weight: u32,
}

/// One externally addressable load-balanced endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualService {
    /// Service hostname or address.
    pub hostname: String,
    /// Service port.
    pub port: u16,
    /// Transport protocol (e.g. TCP, UDP); opaque to this controller.
    pub protocol: String,
    /// Scheduling algorithm name; opaque to this controller.
    pub scheduler: String,
    /// Weighted backends in first-seen order.
    pub backends: Vec<RealServer>,
}

impl VirtualService {
    /// Key under which this service is stored, `hostname:port`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Replace a backend with the same `(address, port)` identity in place,
    /// or append it as a new backend.
    pub fn upsert_backend(&mut self, server: RealServer) {
        for existing in &mut self.backends {
            if existing.address == server.address && existing.port == server.port {
                *existing = server;
                return;
            }
        }
        self.backends.push(server);
    }

    /// Remove every backend with the given address.
    ///
    /// Deletion matches on address alone, broader than the insert identity:
    /// a departed member must be fully evicted regardless of port drift.
    /// Returns true if anything was removed.
    pub fn remove_backend(&mut self, address: &str) -> bool {
        let before = self.backends.len();
        self.backends.retain(|b| b.address != address);
        self.backends.len() != before
    }
}

/// Authoritative mapping of all virtual services, keyed `hostname:port`.
///
/// Sorted key order makes serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTable {
    services: BTreeMap<String, VirtualService>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a whole virtual service under its own key.
    pub fn insert(&mut self, service: VirtualService) {
        self.services.insert(service.key(), service);
    }

    pub fn get(&self, key: &str) -> Option<&VirtualService> {
        self.services.get(key)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Iterate services in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VirtualService)> {
        self.services.iter()
    }

    /// Upsert one backend into the named service.
    pub fn upsert_backend(&mut self, service_key: &str, server: RealServer) {
        if let Some(service) = self.services.get_mut(service_key) {
            service.upsert_backend(server);
        }
    }

    /// Upsert one backend into every virtual service. The load balancer
    /// mirrors the same backend pool behind each configured endpoint.
    pub fn upsert_backend_all(&mut self, server: &RealServer) {
        for service in self.services.values_mut() {
            service.upsert_backend(server.clone());
        }
    }

    /// Remove every backend with the given address from the named service.
    pub fn remove_backend(&mut self, service_key: &str, address: &str) -> bool {
        match self.services.get_mut(service_key) {
            Some(service) => service.remove_backend(address),
            None => false,
        }
    }

    /// Remove every backend with the given address from every service.
    /// Returns true if any service changed.
    pub fn remove_backend_all(&mut self, address: &str) -> bool {
        let mut removed = false;
        for service in self.services.values_mut() {
            removed |= service.remove_backend(address);
        }
        removed
    }
}
