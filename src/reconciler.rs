//! Snapshot and event-driven reconciliation.
//!
//! # Data Flow
//! ```text
//! startup:  membership.list → one RealServer per member → batch upsert → one write
//! steady:   membership.watch → added/modified & Running & progress < 100 → spawn ramp
//!                            → deleted → cancel ramp, evict address, write
//! ```
//!
//! # Design Decisions
//! - Zero members at startup is fatal: the controller must not run against
//!   a pool it cannot see
//! - Ramps are fired and forgotten through the single-flight registry; the
//!   event loop never blocks on one
//! - A watch item that fails to decode is fatal; it signals a protocol
//!   mismatch with the control plane, not a transient hiccup

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;

use crate::config::Settings;
use crate::lifecycle::Shutdown;
use crate::lvs::codec::CodecError;
use crate::lvs::{LvsStore, RealServer};
use crate::membership::{
    EventKind, MemberEvent, MemberPhase, MembershipClient, MembershipError,
};
use crate::ramp::{RampController, RampRegistry, FULL_WEIGHT};

/// Errors that end reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The selector matched nothing at startup.
    #[error("no members found for selector {selector:?} in namespace {namespace:?}")]
    NoMembers { namespace: String, selector: String },

    /// Listing, watching, or decoding membership state failed.
    #[error(transparent)]
    Membership(#[from] MembershipError),

    /// Persisting the startup snapshot failed.
    #[error("startup snapshot persistence: {0}")]
    Persistence(#[from] CodecError),

    /// The collaborator closed the watch stream it was expected to hold open.
    #[error("membership watch stream ended unexpectedly")]
    WatchClosed,
}

/// Drives the service table from cluster membership.
pub struct Reconciler {
    membership: Arc<dyn MembershipClient>,
    store: Arc<LvsStore>,
    ramps: Arc<RampController>,
    registry: Arc<RampRegistry>,
    shutdown: Arc<Shutdown>,
    namespace: String,
    label: String,
    destination_port: u16,
}

impl Reconciler {
    pub fn new(
        membership: Arc<dyn MembershipClient>,
        store: Arc<LvsStore>,
        ramps: Arc<RampController>,
        registry: Arc<RampRegistry>,
        shutdown: Arc<Shutdown>,
        settings: &Settings,
    ) -> Self {
        Self {
            membership,
            store,
            ramps,
            registry,
            shutdown,
            namespace: settings.namespace.clone(),
            label: settings.label.clone(),
            destination_port: settings.destination_port,
        }
    }

    /// Reconcile the startup snapshot, then follow membership events until
    /// shutdown or a fatal error.
    pub async fn run(&self) -> Result<(), ReconcileError> {
        self.load_snapshot().await?;
        self.follow_events().await
    }

    /// Bring the table in line with the current membership list, then
    /// persist once for the whole batch.
    async fn load_snapshot(&self) -> Result<(), ReconcileError> {
        let members = self.membership.list(&self.namespace, &self.label).await?;
        tracing::info!(count = members.len(), selector = %self.label, "listed pool members");
        if members.is_empty() {
            return Err(ReconcileError::NoMembers {
                namespace: self.namespace.clone(),
                selector: self.label.clone(),
            });
        }

        let servers = members.iter().map(|member| RealServer {
            address: member.name.clone(),
            port: self.destination_port,
            weight: member.progress(),
        });
        self.store.upsert_all_batch(servers.collect::<Vec<_>>())?;
        Ok(())
    }

    async fn follow_events(&self) -> Result<(), ReconcileError> {
        let mut events = self.membership.watch(&self.namespace, &self.label).await?;
        let mut shutdown = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("leaving the membership event loop");
                    return Ok(());
                }
                event = events.next() => match event {
                    Some(Ok(event)) => self.apply(event),
                    Some(Err(error)) => return Err(error.into()),
                    None => return Err(ReconcileError::WatchClosed),
                },
            }
        }
    }

    fn apply(&self, event: MemberEvent) {
        match event.kind {
            EventKind::Added | EventKind::Modified => {
                let member = event.member;
                if member.phase == MemberPhase::Running && member.progress() != FULL_WEIGHT {
                    tracing::info!(
                        member = %member.name,
                        progress = member.progress(),
                        "member joining, starting ramp"
                    );
                    self.ramps.spawn(member, self.shutdown.subscribe());
                }
            }
            EventKind::Deleted => {
                let address = event.member.name;
                self.registry.cancel(&address);
                // No drain preceded this; clients of the departed backend
                // lose their connections.
                tracing::warn!(member = %address, "member deleted, evicting from every virtual service");
                if let Err(error) = self.store.remove_all(&address) {
                    tracing::error!(member = %address, %error, "config persistence after eviction failed");
                }
            }
        }
    }
}
