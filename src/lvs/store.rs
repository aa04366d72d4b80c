//! Synchronized owner of the service table and its on-disk mirror.
//!
//! # Responsibilities
//! - Serialize every read-modify-write on the table
//! - Persist after each mutation under the same lock, so concurrent ramp
//!   tasks cannot clobber each other's writes with stale serializations
//!
//! # Design Decisions
//! - The mutation is applied before persistence is attempted; a failed write
//!   leaves the in-memory table ahead of disk and the next mutation rewrites
//!   the full file
//! - The lock is a plain std mutex; nothing awaits while holding it

use std::path::PathBuf;
use std::sync::Mutex;

use crate::lvs::codec::{self, CodecError};
use crate::lvs::model::{RealServer, ServiceTable};

/// Shared, synchronized LVS configuration store.
#[derive(Debug)]
pub struct LvsStore {
    path: PathBuf,
    table: Mutex<ServiceTable>,
}

impl LvsStore {
    /// Wrap an already-parsed table bound to its config file path.
    pub fn new(path: PathBuf, table: ServiceTable) -> Self {
        Self {
            path,
            table: Mutex::new(table),
        }
    }

    /// Clone of the current table, for inspection and tests.
    pub fn snapshot(&self) -> ServiceTable {
        self.table.lock().expect("lvs table lock poisoned").clone()
    }

    /// Upsert one backend into every virtual service and persist.
    pub fn upsert_all(&self, server: RealServer) -> Result<(), CodecError> {
        let mut table = self.table.lock().expect("lvs table lock poisoned");
        table.upsert_backend_all(&server);
        self.persist(&table)
    }

    /// Upsert a batch of backends and persist once at the end.
    ///
    /// Used for startup reconciliation to avoid one write per member.
    pub fn upsert_all_batch<I>(&self, servers: I) -> Result<(), CodecError>
    where
        I: IntoIterator<Item = RealServer>,
    {
        let mut table = self.table.lock().expect("lvs table lock poisoned");
        for server in servers {
            table.upsert_backend_all(&server);
        }
        self.persist(&table)
    }

    /// Evict every backend with the given address from every service and
    /// persist. Skips the write when nothing matched.
    pub fn remove_all(&self, address: &str) -> Result<(), CodecError> {
        let mut table = self.table.lock().expect("lvs table lock poisoned");
        if !table.remove_backend_all(address) {
            return Ok(());
        }
        self.persist(&table)
    }

    fn persist(&self, table: &ServiceTable) -> Result<(), CodecError> {
        codec::write_atomic(&self.path, &codec::serialize(table))?;
        Ok(())
    }
}
