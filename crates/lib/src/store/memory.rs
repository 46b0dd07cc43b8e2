//! In-memory store backed by a JSON snapshot file.

use super::{
    ConnectionRepository, ContactRepository, DispatchLog, FlagRepository, GroupRepository,
    LocationRepository, MessageRepository, StoreError,
};
use crate::model::{
    Connection, ConnectionId, Contact, ContactId, ContactRow, DispatchRecord, FlagMarker, Group,
    GroupId, Location, LocationId, LocationKind, Message, MessageId, MessageRow,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything the store holds; also the on-disk JSON shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub flags: Vec<FlagMarker>,
    #[serde(default)]
    pub dispatches: Vec<DispatchRecord>,
}

pub struct MemoryStore {
    inner: Arc<RwLock<Snapshot>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Load from a JSON snapshot. A missing file yields an empty store.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("store snapshot not found, starting empty: {}", path.display());
            return Ok(Self::new());
        }
        let s = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading store snapshot from {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&s)
            .with_context(|| format!("parsing store snapshot from {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = {
            let g = self.inner.read().await;
            serde_json::to_string_pretty(&*g)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing store snapshot to {}", path.display()))
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn insert_contact(&self, contact: Contact) {
        let mut g = self.inner.write().await;
        g.contacts.retain(|c| c.id != contact.id);
        g.contacts.push(contact);
    }

    pub async fn insert_connection(&self, connection: Connection) {
        let mut g = self.inner.write().await;
        g.connections.retain(|c| c.id != connection.id);
        g.connections.push(connection);
    }

    pub async fn insert_group(&self, group: Group) {
        let mut g = self.inner.write().await;
        g.groups.retain(|x| x.id != group.id);
        g.groups.push(group);
    }

    pub async fn insert_location(&self, location: Location) {
        let mut g = self.inner.write().await;
        g.locations.retain(|l| l.id != location.id);
        g.locations.push(location);
    }

    pub async fn insert_message(&self, message: Message) {
        let mut g = self.inner.write().await;
        g.messages.retain(|m| m.id != message.id);
        g.messages.push(message);
    }
}

fn contact_row(s: &Snapshot, contact: &Contact) -> ContactRow {
    let location = contact
        .reporting_location
        .and_then(|id| s.locations.iter().find(|l| l.id == id).cloned());
    let identities = s
        .connections
        .iter()
        .filter(|c| c.contact == Some(contact.id))
        .map(|c| c.identity.clone())
        .collect();
    let group_names = contact
        .groups
        .iter()
        .filter_map(|id| s.groups.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .collect();
    ContactRow {
        contact: contact.clone(),
        location,
        identities,
        group_names,
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn get_contact(&self, id: ContactId) -> Option<Contact> {
        let g = self.inner.read().await;
        g.contacts.iter().find(|c| c.id == id).cloned()
    }

    async fn contacts(&self, ids: &[ContactId]) -> Vec<Contact> {
        let g = self.inner.read().await;
        g.contacts
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect()
    }

    async fn add_to_group(&self, contact: ContactId, group: GroupId) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        let c = g
            .contacts
            .iter_mut()
            .find(|c| c.id == contact)
            .ok_or(StoreError::ContactNotFound(contact))?;
        if !c.groups.contains(&group) {
            c.groups.push(group);
        }
        Ok(())
    }

    async fn remove_from_group(&self, contact: ContactId, group: GroupId) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        let c = g
            .contacts
            .iter_mut()
            .find(|c| c.id == contact)
            .ok_or(StoreError::ContactNotFound(contact))?;
        c.groups.retain(|id| *id != group);
        Ok(())
    }

    async fn contact_rows(&self) -> Vec<ContactRow> {
        let g = self.inner.read().await;
        let mut rows: Vec<ContactRow> = g.contacts.iter().map(|c| contact_row(&g, c)).collect();
        rows.sort_by_key(|r| r.contact.id);
        rows
    }
}

#[async_trait]
impl ConnectionRepository for MemoryStore {
    async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let g = self.inner.read().await;
        g.connections.iter().find(|c| c.id == id).cloned()
    }

    async fn connections_for_contacts(&self, contacts: &[ContactId]) -> Vec<Connection> {
        let g = self.inner.read().await;
        g.connections
            .iter()
            .filter(|c| c.contact.map(|id| contacts.contains(&id)).unwrap_or(false))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn get_group(&self, id: GroupId) -> Option<Group> {
        let g = self.inner.read().await;
        g.groups.iter().find(|x| x.id == id).cloned()
    }

    async fn groups(&self) -> Vec<Group> {
        let g = self.inner.read().await;
        let mut groups = g.groups.clone();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn get_location(&self, id: LocationId) -> Option<Location> {
        let g = self.inner.read().await;
        g.locations.iter().find(|l| l.id == id).cloned()
    }

    async fn descendants(&self, id: LocationId) -> Vec<LocationId> {
        let g = self.inner.read().await;
        if !g.locations.iter().any(|l| l.id == id) {
            return Vec::new();
        }
        let mut seen: HashSet<LocationId> = HashSet::new();
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            pending.extend(
                g.locations
                    .iter()
                    .filter(|l| l.parent == Some(current))
                    .map(|l| l.id),
            );
        }
        out
    }

    async fn districts(&self) -> Vec<Location> {
        let g = self.inner.read().await;
        let mut districts: Vec<Location> = g
            .locations
            .iter()
            .filter(|l| l.kind == LocationKind::District)
            .cloned()
            .collect();
        districts.sort_by(|a, b| a.name.cmp(&b.name));
        districts
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn messages(&self, ids: &[MessageId]) -> Vec<Message> {
        let g = self.inner.read().await;
        g.messages
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect()
    }

    async fn message_rows(&self) -> Vec<MessageRow> {
        let g = self.inner.read().await;
        let mut rows: Vec<MessageRow> = g
            .messages
            .iter()
            .map(|m| {
                let connection = g.connections.iter().find(|c| c.id == m.connection).cloned();
                let contact = connection
                    .as_ref()
                    .and_then(|c| c.contact)
                    .and_then(|id| g.contacts.iter().find(|c| c.id == id).cloned());
                MessageRow {
                    message: m.clone(),
                    connection,
                    contact,
                    flagged: g.flags.iter().any(|f| f.message == m.id),
                }
            })
            .collect();
        rows.sort_by_key(|r| r.message.id);
        rows
    }
}

#[async_trait]
impl FlagRepository for MemoryStore {
    async fn flag_count(&self, message: MessageId) -> usize {
        let g = self.inner.read().await;
        g.flags.iter().filter(|f| f.message == message).count()
    }

    async fn add_flag(&self, message: MessageId) -> Result<(), StoreError> {
        let mut g = self.inner.write().await;
        if !g.messages.iter().any(|m| m.id == message) {
            return Err(StoreError::MessageNotFound(message));
        }
        let id = g.flags.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        g.flags.push(FlagMarker { id, message });
        Ok(())
    }

    async fn clear_flags(&self, message: MessageId) -> Result<usize, StoreError> {
        let mut g = self.inner.write().await;
        let before = g.flags.len();
        g.flags.retain(|f| f.message != message);
        Ok(before - g.flags.len())
    }
}

#[async_trait]
impl DispatchLog for MemoryStore {
    async fn record(&self, record: DispatchRecord) -> Result<(), StoreError> {
        self.inner.write().await.dispatches.push(record);
        Ok(())
    }

    async fn records(&self) -> Vec<DispatchRecord> {
        self.inner.read().await.dispatches.clone()
    }
}

/// Dispatch log that writes the whole snapshot to disk after each record,
/// so a record survives a crash during the sends that follow it.
pub struct PersistedDispatchLog {
    store: Arc<MemoryStore>,
    path: PathBuf,
}

impl PersistedDispatchLog {
    pub fn new(store: Arc<MemoryStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }
}

#[async_trait]
impl DispatchLog for PersistedDispatchLog {
    async fn record(&self, record: DispatchRecord) -> Result<(), StoreError> {
        self.store.record(record).await?;
        self.store
            .save(&self.path)
            .await
            .map_err(|e| StoreError::Backend(format!("{:#}", e)))
    }

    async fn records(&self) -> Vec<DispatchRecord> {
        self.store.records().await
    }
}
