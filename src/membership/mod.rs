//! Cluster membership collaborator interface.
//!
//! # Responsibilities
//! - Model members of the monitored pool and their lifecycle events
//! - Define the four operations the controller consumes: list, watch,
//!   existence get, progress label patch
//!
//! # Design Decisions
//! - The trait is the seam for tests; the Kubernetes client lives behind it
//! - A negative existence answer is authoritative at query time; callers
//!   re-check on every ramp step, so races with departure are tolerated
//! - Ramp progress rides on the member as a label so it survives controller
//!   restarts and stays visible to operators

pub mod kube;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use self::kube::KubeMembership;

/// Label carrying a backend's last persisted ramp progress.
pub const PROGRESS_LABEL: &str = "progress";

/// Errors from the membership collaborator.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// The API call itself failed (transport, auth, server error).
    #[error("membership API call failed: {0}")]
    Api(#[from] ::kube::Error),

    /// The kubeconfig file could not be read or interpreted.
    #[error("kubeconfig: {0}")]
    Kubeconfig(#[from] ::kube::config::KubeconfigError),

    /// A watch payload did not decode to a known member shape.
    ///
    /// Indicates a protocol mismatch with the collaborator; callers treat
    /// this as fatal.
    #[error("malformed membership event: {0}")]
    Malformed(String),
}

/// Lifecycle phase of a member, as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for MemberPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => MemberPhase::Pending,
            "Running" => MemberPhase::Running,
            "Succeeded" => MemberPhase::Succeeded,
            "Failed" => MemberPhase::Failed,
            _ => MemberPhase::Unknown,
        }
    }
}

/// One member of the monitored pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Member name; doubles as the backend address in the LVS config.
    pub name: String,
    /// Namespace the member lives in.
    pub namespace: String,
    /// Current lifecycle phase.
    pub phase: MemberPhase,
    /// Member IP, when assigned.
    pub ip_address: Option<String>,
    /// Labels, including the ramp progress label.
    pub labels: BTreeMap<String, String>,
}

impl Member {
    /// Last persisted ramp progress; absent or unparseable counts as 0.
    pub fn progress(&self) -> u32 {
        self.labels
            .get(PROGRESS_LABEL)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Kind of a membership change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

/// One membership change notification.
#[derive(Debug, Clone)]
pub struct MemberEvent {
    pub kind: EventKind,
    pub member: Member,
}

/// Stream of membership change notifications.
pub type MemberStream = BoxStream<'static, Result<MemberEvent, MembershipError>>;

/// The membership collaborator, scoped per call by namespace and selector.
#[async_trait]
pub trait MembershipClient: Send + Sync {
    /// List current members matching the selector.
    async fn list(&self, namespace: &str, selector: &str)
        -> Result<Vec<Member>, MembershipError>;

    /// Open a long-lived subscription to membership changes.
    async fn watch(&self, namespace: &str, selector: &str)
        -> Result<MemberStream, MembershipError>;

    /// Fetch one member, or `None` if it does not exist. This is the
    /// existence gate; it performs a single query with no internal retries.
    async fn get(&self, namespace: &str, name: &str)
        -> Result<Option<Member>, MembershipError>;

    /// Persist a member's ramp progress as a label.
    async fn patch_progress(
        &self,
        namespace: &str,
        name: &str,
        progress: u32,
    ) -> Result<(), MembershipError>;
}
