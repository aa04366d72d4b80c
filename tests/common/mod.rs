//! Shared in-memory membership double for integration tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use lvs_ramp::lvs::{LvsStore, ServiceTable, VirtualService};
use lvs_ramp::membership::{
    EventKind, Member, MemberEvent, MemberPhase, MemberStream, MembershipClient, MembershipError,
    PROGRESS_LABEL,
};

type EventResult = Result<MemberEvent, MembershipError>;

/// Programmable membership collaborator.
///
/// Holds a mutable member set, records every progress patch, and feeds the
/// watch stream from a channel the test writes to.
pub struct MockMembership {
    inner: Mutex<Inner>,
}

struct Inner {
    members: BTreeMap<String, Member>,
    patches: Vec<(String, u32)>,
    watch_tx: Option<mpsc::UnboundedSender<EventResult>>,
    watch_rx: Option<mpsc::UnboundedReceiver<EventResult>>,
}

impl MockMembership {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            inner: Mutex::new(Inner {
                members: BTreeMap::new(),
                patches: Vec::new(),
                watch_tx: Some(tx),
                watch_rx: Some(rx),
            }),
        })
    }

    pub fn add_member(&self, name: &str, progress: u32) {
        let member = running_member(name, progress);
        self.inner
            .lock()
            .unwrap()
            .members
            .insert(name.to_string(), member);
    }

    pub fn remove_member(&self, name: &str) {
        self.inner.lock().unwrap().members.remove(name);
    }

    /// Deliver one event on the watch stream.
    pub fn send(&self, kind: EventKind, member: Member) {
        self.send_raw(Ok(MemberEvent { kind, member }));
    }

    /// Deliver a decode failure on the watch stream.
    pub fn send_malformed(&self, message: &str) {
        self.send_raw(Err(MembershipError::Malformed(message.to_string())));
    }

    /// End the watch stream, as a collaborator never should.
    pub fn close_watch(&self) {
        self.inner.lock().unwrap().watch_tx = None;
    }

    /// Progress patches in the order they were applied.
    pub fn patches(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().patches.clone()
    }

    fn send_raw(&self, event: EventResult) {
        self.inner
            .lock()
            .unwrap()
            .watch_tx
            .as_ref()
            .expect("watch stream already closed")
            .send(event)
            .expect("watch stream receiver gone");
    }
}

#[async_trait]
impl MembershipClient for MockMembership {
    async fn list(&self, _ns: &str, _sel: &str) -> Result<Vec<Member>, MembershipError> {
        Ok(self.inner.lock().unwrap().members.values().cloned().collect())
    }

    async fn watch(&self, _ns: &str, _sel: &str) -> Result<MemberStream, MembershipError> {
        let rx = self
            .inner
            .lock()
            .unwrap()
            .watch_rx
            .take()
            .expect("watch opened twice");
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    async fn get(&self, _ns: &str, name: &str) -> Result<Option<Member>, MembershipError> {
        Ok(self.inner.lock().unwrap().members.get(name).cloned())
    }

    async fn patch_progress(
        &self,
        _ns: &str,
        name: &str,
        progress: u32,
    ) -> Result<(), MembershipError> {
        let mut inner = self.inner.lock().unwrap();
        inner.patches.push((name.to_string(), progress));
        if let Some(member) = inner.members.get_mut(name) {
            member
                .labels
                .insert(PROGRESS_LABEL.to_string(), progress.to_string());
        }
        Ok(())
    }
}

/// A member in the Running phase with the given recorded progress.
pub fn running_member(name: &str, progress: u32) -> Member {
    let mut labels = BTreeMap::new();
    labels.insert(PROGRESS_LABEL.to_string(), progress.to_string());
    Member {
        name: name.to_string(),
        namespace: "default".to_string(),
        phase: MemberPhase::Running,
        ip_address: None,
        labels,
    }
}

/// Store over a fresh config file with the given virtual services.
pub fn store_with_services(path: &Path, services: &[(&str, u16)]) -> Arc<LvsStore> {
    let mut table = ServiceTable::new();
    for (hostname, port) in services {
        table.insert(VirtualService {
            hostname: hostname.to_string(),
            port: *port,
            protocol: "TCP".to_string(),
            scheduler: "wrr".to_string(),
            backends: Vec::new(),
        });
    }
    Arc::new(LvsStore::new(path.to_path_buf(), table))
}

/// Poll until the condition holds, panicking after five seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
