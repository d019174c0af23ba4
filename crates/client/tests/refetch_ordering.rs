//! Overlapping refetches on one capability store, with responses released
//! out of order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use ledgerly_auth::{BearerToken, Capabilities, Capability, Feature, Principal, Role, Session};
use ledgerly_client::{
    CapabilityOrigin, CapabilitySource, CapabilityStore, FetchError, FetchedCapabilities,
    RecordingNotifier, RefetchOrdering,
};

type Reply = Result<FetchedCapabilities, FetchError>;

/// Each fetch parks on the next scripted channel until the test releases it.
struct ScriptedSource {
    pending: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(count: usize) -> (Arc<Self>, Vec<oneshot::Sender<Reply>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..count).map(|_| oneshot::channel()).unzip();
        let source = Arc::new(Self {
            pending: Mutex::new(receivers),
            calls: AtomicUsize::new(0),
        });
        (source, senders)
    }

    async fn wait_for_calls(&self, n: usize) {
        for _ in 0..200 {
            if self.calls.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} fetches to start");
    }
}

#[async_trait]
impl CapabilitySource for ScriptedSource {
    async fn fetch(&self, _token: &BearerToken) -> Reply {
        let rx = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted fetch");
        self.calls.fetch_add(1, Ordering::SeqCst);
        rx.await.expect("reply dropped")
    }
}

fn session_as(role: Role) -> Session {
    Session {
        token: BearerToken::new("tok").unwrap(),
        principal: Principal::new(role),
    }
}

fn customer() -> Session {
    session_as(Role::Customer)
}

fn reply(capability: Capability) -> Reply {
    Ok(FetchedCapabilities::new(
        Capabilities::default().with(capability),
        CapabilityOrigin::Override,
    ))
}

/// Issue two refetches (first, then second), release the second reply before
/// the first, and return the store once both settled.
async fn race(ordering: RefetchOrdering) -> Arc<CapabilityStore> {
    let (source, mut senders) = ScriptedSource::new(2);
    let store = Arc::new(CapabilityStore::new(
        source.clone(),
        Arc::new(RecordingNotifier::new()),
        ordering,
    ));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.refetch(&customer()).await }
    });
    source.wait_for_calls(1).await;

    let second = tokio::spawn({
        let store = store.clone();
        async move { store.refetch(&customer()).await }
    });
    source.wait_for_calls(2).await;

    assert!(store.snapshot().is_loading);
    assert!(!store.can_show(Some(Role::Customer), Feature::Users));

    let second_tx = senders.pop().unwrap();
    let first_tx = senders.pop().unwrap();

    second_tx.send(reply(Capability::CreateInventory)).unwrap();
    second.await.unwrap().unwrap();
    // The first fetch is still outstanding, so the store keeps denying.
    assert!(store.snapshot().is_loading);

    first_tx.send(reply(Capability::CreateUsers)).unwrap();
    first.await.unwrap().unwrap();
    assert!(!store.snapshot().is_loading);

    store
}

#[tokio::test]
async fn fenced_store_keeps_the_newest_request() {
    let store = race(RefetchOrdering::Fenced).await;

    let caps = store.snapshot().capabilities.unwrap();
    assert!(caps.granted(Capability::CreateInventory));
    assert!(!caps.granted(Capability::CreateUsers));
    assert_eq!(store.snapshot().generation, 1);
    assert!(store.can_show(Some(Role::Customer), Feature::Inventory));
}

#[tokio::test]
async fn unfenced_store_keeps_the_last_response_to_land() {
    // Regression record of the unfenced behaviour: the stale first response
    // overwrites the newer one.
    let store = race(RefetchOrdering::LastResponseWins).await;

    let caps = store.snapshot().capabilities.unwrap();
    assert!(caps.granted(Capability::CreateUsers));
    assert!(!caps.granted(Capability::CreateInventory));
    assert_eq!(store.snapshot().generation, 2);
}

#[tokio::test]
async fn response_after_unmount_is_dropped() {
    let (source, mut senders) = ScriptedSource::new(1);
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(CapabilityStore::new(
        source.clone(),
        notifier.clone(),
        RefetchOrdering::Fenced,
    ));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.load(Some(&customer())).await }
    });
    source.wait_for_calls(1).await;

    store.unmount();
    assert!(!store.snapshot().is_loading);

    senders
        .pop()
        .unwrap()
        .send(Err(FetchError::Api(500, "late".to_string())))
        .unwrap();
    pending.await.unwrap().unwrap();

    assert_eq!(store.snapshot().capabilities, None);
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn reload_without_capabilities_fences_off_pending_fetch() {
    let (source, mut senders) = ScriptedSource::new(1);
    let store = Arc::new(CapabilityStore::new(
        source.clone(),
        Arc::new(RecordingNotifier::new()),
        RefetchOrdering::Fenced,
    ));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.refetch(&customer()).await }
    });
    source.wait_for_calls(1).await;

    // Re-resolved as a role that carries no capability set.
    store.load(Some(&session_as(Role::Admin))).await.unwrap();

    senders
        .pop()
        .unwrap()
        .send(reply(Capability::CreateUsers))
        .unwrap();
    pending.await.unwrap().unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.capabilities, None);
    assert_eq!(snapshot.generation, 0);
    assert!(!store.can_show(Some(Role::Customer), Feature::Users));
}
