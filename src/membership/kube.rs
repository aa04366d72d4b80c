//! Kubernetes-backed membership client.
//!
//! # Responsibilities
//! - Implement the four collaborator operations against the pod API:
//!   list, watch, existence get, progress label patch
//! - Translate pods and raw watch events into [`Member`] values
//!
//! # Design Decisions
//! - One `Api<Pod>` handle is built per call from the namespace argument;
//!   the client itself stays namespace-agnostic
//! - Progress is written with a strategic merge patch, the narrowest write
//!   that touches only the one label
//! - A watch payload without a pod name cannot be keyed and surfaces as a
//!   malformed-event error

use std::path::Path;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::membership::{
    EventKind, Member, MemberEvent, MemberPhase, MemberStream, MembershipClient, MembershipError,
    PROGRESS_LABEL,
};

/// Membership collaborator backed by the Kubernetes pod API.
pub struct KubeMembership {
    client: Client,
}

impl KubeMembership {
    /// Connect using an explicit kubeconfig file, or the ambient environment
    /// (in-cluster service account, `KUBECONFIG`, `~/.kube/config`) when none
    /// is given.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, MembershipError> {
        let client = match kubeconfig {
            Some(path) => {
                let config = Config::from_custom_kubeconfig(
                    Kubeconfig::read_from(path)?,
                    &KubeConfigOptions::default(),
                )
                .await?;
                Client::try_from(config)?
            }
            None => Client::try_default().await?,
        };
        Ok(Self { client })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl MembershipClient for KubeMembership {
    async fn list(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<Member>, MembershipError> {
        let params = ListParams::default().labels(selector);
        let pods = self.pods(namespace).list(&params).await?;
        pods.items.into_iter().map(member_from_pod).collect()
    }

    async fn watch(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<MemberStream, MembershipError> {
        let params = WatchParams::default().labels(selector);
        let events = self.pods(namespace).watch(&params, "0").await?;
        Ok(events
            .filter_map(|event| async move {
                let (kind, pod) = match event {
                    Ok(WatchEvent::Added(pod)) => (EventKind::Added, pod),
                    Ok(WatchEvent::Modified(pod)) => (EventKind::Modified, pod),
                    Ok(WatchEvent::Deleted(pod)) => (EventKind::Deleted, pod),
                    Ok(WatchEvent::Bookmark(_)) => return None,
                    Ok(WatchEvent::Error(response)) => {
                        return Some(Err(MembershipError::Malformed(response.message)))
                    }
                    Err(error) => return Some(Err(MembershipError::Api(error))),
                };
                Some(member_from_pod(pod).map(|member| MemberEvent { kind, member }))
            })
            .boxed())
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Member>, MembershipError> {
        self.pods(namespace)
            .get_opt(name)
            .await?
            .map(member_from_pod)
            .transpose()
    }

    async fn patch_progress(
        &self,
        namespace: &str,
        name: &str,
        progress: u32,
    ) -> Result<(), MembershipError> {
        let body = serde_json::json!({
            "metadata": { "labels": { (PROGRESS_LABEL): progress.to_string() } }
        });
        self.pods(namespace)
            .patch(name, &PatchParams::default(), &Patch::Strategic(body))
            .await?;
        Ok(())
    }
}

fn member_from_pod(pod: Pod) -> Result<Member, MembershipError> {
    let name = pod
        .metadata
        .name
        .ok_or_else(|| MembershipError::Malformed("pod without a name".to_string()))?;
    let status = pod.status.unwrap_or_default();
    Ok(Member {
        name,
        namespace: pod.metadata.namespace.unwrap_or_default(),
        phase: status
            .phase
            .as_deref()
            .map(MemberPhase::from)
            .unwrap_or(MemberPhase::Unknown),
        ip_address: status.pod_ip,
        labels: pod.metadata.labels.unwrap_or_default(),
    })
}
