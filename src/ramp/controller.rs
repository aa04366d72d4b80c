//! Per-backend weight ramp state machine.
//!
//! # States
//! - Ramping: weight climbs 20 at a time toward 100
//! - Done: weight reached 100, address released
//! - Aborted: the member disappeared mid-ramp, address released
//! - Cancelled: departure event or shutdown stopped the ramp
//!
//! # State Transitions
//! ```text
//! start(progress p) → Ramping(p+20) → Ramping(p+40) → … → Done(100)
//! Ramping → Aborted: existence re-check finds the member gone
//! Ramping → Cancelled: registry cancel or shutdown during a pause
//! ```
//!
//! # Design Decisions
//! - The first step continues from the member's last recorded progress, so
//!   a controller restart resumes a half-finished ramp instead of starting
//!   over
//! - A failed existence check or progress patch skips the step and retries
//!   after the normal interval; only the member's disappearance ends the
//!   ramp early
//! - Progress is patched onto the member before the config write, so the
//!   recorded progress never trails the weight already serving traffic

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::Settings;
use crate::lvs::{LvsStore, RealServer};
use crate::membership::{Member, MembershipClient};
use crate::ramp::registry::{RampRegistry, RampTicket};

/// Weight added per ramp step.
pub const WEIGHT_STEP: u32 = 20;

/// Weight at which a backend is fully admitted.
pub const FULL_WEIGHT: u32 = 100;

/// Terminal state of one ramp execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampOutcome {
    /// The backend reached full weight.
    Done,
    /// The member disappeared mid-ramp.
    Aborted,
    /// A departure event or process shutdown stopped the ramp.
    Cancelled,
}

/// Drives joining backends from their last recorded progress to full weight.
pub struct RampController {
    membership: Arc<dyn MembershipClient>,
    store: Arc<LvsStore>,
    registry: Arc<RampRegistry>,
    namespace: String,
    destination_port: u16,
    step_interval: Duration,
}

impl RampController {
    pub fn new(
        membership: Arc<dyn MembershipClient>,
        store: Arc<LvsStore>,
        registry: Arc<RampRegistry>,
        settings: &Settings,
    ) -> Self {
        Self {
            membership,
            store,
            registry,
            namespace: settings.namespace.clone(),
            destination_port: settings.destination_port,
            step_interval: settings.step_interval(),
        }
    }

    /// Start a ramp for the member on its own task.
    ///
    /// A duplicate trigger while a ramp for the same address is in flight is
    /// a no-op; the event stream delivers one modify event per label patch,
    /// so duplicates are the common case, not an anomaly.
    pub fn spawn(self: &Arc<Self>, member: Member, shutdown: broadcast::Receiver<()>) {
        let Some(ticket) = self.registry.begin(&member.name) else {
            tracing::debug!(member = %member.name, "ramp already in flight, ignoring trigger");
            return;
        };
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run(member, ticket, shutdown).await;
        });
    }

    /// Execute one ramp to completion.
    pub async fn run(
        &self,
        member: Member,
        mut ticket: RampTicket,
        mut shutdown: broadcast::Receiver<()>,
    ) -> RampOutcome {
        let mut weight = member.progress();
        tracing::info!(member = %member.name, progress = weight, "ramp starting");

        loop {
            if ticket.is_cancelled() {
                tracing::info!(member = %member.name, "ramp cancelled");
                return RampOutcome::Cancelled;
            }

            let next = (weight + WEIGHT_STEP).min(FULL_WEIGHT);

            match self.membership.get(&self.namespace, &member.name).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::info!(member = %member.name, "member gone mid-ramp, aborting");
                    return RampOutcome::Aborted;
                }
                Err(error) => {
                    tracing::warn!(member = %member.name, %error, "existence check failed, retrying after interval");
                    if self.pause(&mut ticket, &mut shutdown).await {
                        return RampOutcome::Cancelled;
                    }
                    continue;
                }
            }

            if let Err(error) = self
                .membership
                .patch_progress(&self.namespace, &member.name, next)
                .await
            {
                tracing::warn!(member = %member.name, %error, "progress patch failed, retrying after interval");
                if self.pause(&mut ticket, &mut shutdown).await {
                    return RampOutcome::Cancelled;
                }
                continue;
            }

            let server = RealServer {
                address: member.name.clone(),
                port: self.destination_port,
                weight: next,
            };
            if let Err(error) = self.store.upsert_all(server) {
                // The table holds the new weight; the next mutation rewrites
                // the whole file and carries this step with it.
                tracing::error!(member = %member.name, %error, "config persistence failed");
            }

            if next == FULL_WEIGHT {
                tracing::info!(member = %member.name, "ramp complete");
                return RampOutcome::Done;
            }
            weight = next;

            if self.pause(&mut ticket, &mut shutdown).await {
                tracing::info!(member = %member.name, "ramp cancelled");
                return RampOutcome::Cancelled;
            }
        }
    }

    /// Sleep one step interval. Returns true when the ramp was cancelled or
    /// the process began shutting down during the pause.
    async fn pause(
        &self,
        ticket: &mut RampTicket,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        tokio::select! {
            _ = time::sleep(self.step_interval) => false,
            _ = ticket.wait_cancelled() => true,
            _ = shutdown.recv() => true,
        }
    }
}
