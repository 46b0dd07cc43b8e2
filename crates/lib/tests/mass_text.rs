//! Integration test: mass text through an in-memory store and a recording router.
//! Checks permission gating, recipient preconditions, fan-out and the dispatch record.

use async_trait::async_trait;
use contact::actions::{Action, ActionStatus, MassTextAction};
use contact::auth::{Capability, StaticPermissions};
use contact::model::{Connection, Contact, User};
use contact::router::{DeliveryError, Router};
use contact::selection::{RecipientResolver, Selection};
use contact::store::{DispatchLog, MemoryStore, PersistedDispatchLog};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records every send; fails sends to identities listed in `fail`.
struct RecordingRouter {
    store: Arc<MemoryStore>,
    fail: Vec<String>,
    sent: Mutex<Vec<(String, String)>>,
    records_at_first_send: Mutex<Option<usize>>,
    batches: Mutex<Vec<&'static str>>,
}

impl RecordingRouter {
    fn new(store: Arc<MemoryStore>, fail: &[&str]) -> Self {
        Self {
            store,
            fail: fail.iter().map(|s| s.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
            records_at_first_send: Mutex::new(None),
            batches: Mutex::new(Vec::new()),
        }
    }

    async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Router for RecordingRouter {
    async fn send(&self, connection: &Connection, text: &str) -> Result<(), DeliveryError> {
        {
            let mut first = self.records_at_first_send.lock().await;
            if first.is_none() {
                *first = Some(self.store.records().await.len());
            }
        }
        self.sent
            .lock()
            .await
            .push((connection.identity.clone(), text.to_string()));
        if self.fail.contains(&connection.identity) {
            return Err(DeliveryError::Rejected {
                identity: connection.identity.clone(),
                reason: "test failure".to_string(),
            });
        }
        Ok(())
    }

    async fn start_batch(&self) {
        self.batches.lock().await.push("start");
    }

    async fn stop_batch(&self) {
        self.batches.lock().await.push("stop");
    }
}

fn contact(id: u64, name: &str) -> Contact {
    Contact {
        id,
        name: name.to_string(),
        gender: None,
        birthdate: None,
        reporting_location: None,
        groups: vec![],
    }
}

fn connection(id: u64, identity: &str, contact: u64) -> Connection {
    Connection {
        id,
        identity: identity.to_string(),
        backend: "default".to_string(),
        contact: Some(contact),
    }
}

fn operator() -> User {
    User {
        id: 7,
        username: "operator".to_string(),
        authenticated: true,
        groups: vec![],
    }
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_contact(contact(1, "Akello")).await;
    store.insert_contact(contact(2, "Mugisha")).await;
    store.insert_contact(contact(3, "Nakato")).await;
    store.insert_contact(contact(4, "No Phone")).await;
    store.insert_connection(connection(10, "256770000001", 1)).await;
    store.insert_connection(connection(11, "256770000002", 2)).await;
    store.insert_connection(connection(12, "256770000003", 3)).await;
    store
}

fn permissions() -> Arc<StaticPermissions> {
    let mut p = StaticPermissions::new();
    p.grant("operator", Capability::SendMessages);
    Arc::new(p)
}

fn mass_text(store: &Arc<MemoryStore>, router: &Arc<RecordingRouter>, text: &str) -> MassTextAction {
    MassTextAction::new(
        text,
        permissions(),
        RecipientResolver::new(store.clone(), store.clone()),
        store.clone(),
        router.clone(),
    )
    .with_site(Some(3))
}

#[tokio::test]
async fn sends_once_per_channel_even_when_one_fails() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &["256770000002"]));
    let action = mass_text(&store, &router, "Clinic open \u{2014} 100% free");

    let outcome = action
        .perform(&operator(), &Selection::Contacts(vec![1, 2, 3]))
        .await;

    assert_eq!(outcome.status, ActionStatus::Success);
    assert_eq!(outcome.message, "Message successfully sent to 3 numbers");
    let sent = router.sent().await;
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(_, t)| t == "Clinic open - 100%% free"));
    assert_eq!(*router.batches.lock().await, vec!["start", "stop"]);
}

#[tokio::test]
async fn dispatch_record_written_before_first_send() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, "50% off \u{201C}nets\u{201D}");

    action
        .perform(&operator(), &Selection::Contacts(vec![1, 3]))
        .await;

    assert_eq!(*router.records_at_first_send.lock().await, Some(1));
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.text, "50%% off \"nets\"");
    assert_eq!(r.user, 7);
    assert_eq!(r.contacts, vec![1, 3]);
    assert_eq!(r.recipient_count, 2);
    assert_eq!(r.site, Some(3));
}

#[tokio::test]
async fn permission_denied_sends_nothing() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, "hello");
    let stranger = User {
        username: "stranger".to_string(),
        ..operator()
    };

    let outcome = action
        .perform(&stranger, &Selection::Contacts(vec![1, 2, 3]))
        .await;

    assert_eq!(outcome.status, ActionStatus::Error);
    assert_eq!(outcome.message, "You don't have permission to send messages!");
    assert!(router.sent().await.is_empty());
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn permission_checked_before_recipients() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, "hello");
    let stranger = User {
        username: "stranger".to_string(),
        ..operator()
    };

    for selection in [Selection::Contacts(vec![]), Selection::Contacts(vec![4])] {
        let outcome = action.perform(&stranger, &selection).await;
        assert_eq!(outcome.status, ActionStatus::Error);
        assert_eq!(outcome.message, "You don't have permission to send messages!");
    }
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn no_recipients_writes_and_sends_nothing() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, "hello");

    for selection in [Selection::Contacts(vec![]), Selection::Contacts(vec![4])] {
        let outcome = action.perform(&operator(), &selection).await;
        assert_eq!(outcome.status, ActionStatus::Error);
        assert_eq!(outcome.message, "A message must have one or more recipients!");
    }
    assert!(router.sent().await.is_empty());
    assert!(store.records().await.is_empty());
    assert!(router.batches.lock().await.is_empty());
}

#[tokio::test]
async fn over_long_text_is_rejected_before_any_write() {
    let store = seeded_store().await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, &"x".repeat(161));

    let outcome = action
        .perform(&operator(), &Selection::Contacts(vec![1]))
        .await;

    assert_eq!(outcome.status, ActionStatus::Error);
    assert!(store.records().await.is_empty());
    assert!(router.sent().await.is_empty());
}

#[tokio::test]
async fn shared_number_receives_one_message() {
    let store = seeded_store().await;
    // Akello's number also registered under Mugisha on the same backend
    store.insert_connection(connection(13, "256770000001", 2)).await;
    let router = Arc::new(RecordingRouter::new(store.clone(), &[]));
    let action = mass_text(&store, &router, "hello");

    let outcome = action
        .perform(&operator(), &Selection::Contacts(vec![1, 2]))
        .await;

    assert_eq!(outcome.message, "Message successfully sent to 2 numbers");
    let mut numbers: Vec<String> = router.sent().await.into_iter().map(|(n, _)| n).collect();
    numbers.sort();
    assert_eq!(numbers, vec!["256770000001", "256770000002"]);
}

/// Reads the snapshot file back on the first send.
struct DiskCheckRouter {
    path: PathBuf,
    records_on_disk: Mutex<Option<usize>>,
}

#[async_trait]
impl Router for DiskCheckRouter {
    async fn send(&self, _connection: &Connection, _text: &str) -> Result<(), DeliveryError> {
        let mut seen = self.records_on_disk.lock().await;
        if seen.is_none() {
            let on_disk = MemoryStore::load(&self.path).await.unwrap();
            *seen = Some(on_disk.records().await.len());
        }
        Ok(())
    }
}

#[tokio::test]
async fn persisted_record_on_disk_before_first_send() {
    let dir = std::env::temp_dir().join(format!("contact-mass-text-{}", uuid::Uuid::new_v4()));
    let path = dir.join("store.json");
    let store = seeded_store().await;
    let router = Arc::new(DiskCheckRouter {
        path: path.clone(),
        records_on_disk: Mutex::new(None),
    });
    let action = MassTextAction::new(
        "hello",
        permissions(),
        RecipientResolver::new(store.clone(), store.clone()),
        Arc::new(PersistedDispatchLog::new(store.clone(), &path)),
        router.clone(),
    );

    let outcome = action
        .perform(&operator(), &Selection::Contacts(vec![1, 2]))
        .await;

    assert!(outcome.is_success());
    assert_eq!(*router.records_on_disk.lock().await, Some(1));
    let _ = std::fs::remove_dir_all(dir);
}
