//! Repository interfaces over the contact database.
//!
//! Actions and filters are handed the repositories they need at construction.
//! `MemoryStore` implements all of them and can be loaded from a JSON snapshot.

mod memory;

pub use memory::{MemoryStore, PersistedDispatchLog, Snapshot};

use crate::model::{
    Connection, ConnectionId, Contact, ContactId, ContactRow, DispatchRecord, Group, GroupId,
    Location, LocationId, Message, MessageId, MessageRow,
};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),
    #[error("message {0} not found")]
    MessageNotFound(MessageId),
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn get_contact(&self, id: ContactId) -> Option<Contact>;
    async fn contacts(&self, ids: &[ContactId]) -> Vec<Contact>;
    async fn add_to_group(&self, contact: ContactId, group: GroupId) -> Result<(), StoreError>;
    async fn remove_from_group(&self, contact: ContactId, group: GroupId) -> Result<(), StoreError>;
    /// All contacts joined with location, identities and group names.
    async fn contact_rows(&self) -> Vec<ContactRow>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn get_connection(&self, id: ConnectionId) -> Option<Connection>;
    /// Connections owned by any of the given contacts.
    async fn connections_for_contacts(&self, contacts: &[ContactId]) -> Vec<Connection>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn get_group(&self, id: GroupId) -> Option<Group>;
    /// All groups, ordered by name.
    async fn groups(&self) -> Vec<Group>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn get_location(&self, id: LocationId) -> Option<Location>;
    /// The location and every location below it.
    async fn descendants(&self, id: LocationId) -> Vec<LocationId>;
    /// Districts ordered by name.
    async fn districts(&self) -> Vec<Location>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn messages(&self, ids: &[MessageId]) -> Vec<Message>;
    async fn message_rows(&self) -> Vec<MessageRow>;
}

#[async_trait]
pub trait FlagRepository: Send + Sync {
    async fn flag_count(&self, message: MessageId) -> usize;
    async fn add_flag(&self, message: MessageId) -> Result<(), StoreError>;
    /// Remove every flag on the message; returns how many were removed.
    async fn clear_flags(&self, message: MessageId) -> Result<usize, StoreError>;
}

/// Append-only log of mass texts.
#[async_trait]
pub trait DispatchLog: Send + Sync {
    async fn record(&self, record: DispatchRecord) -> Result<(), StoreError>;
    async fn records(&self) -> Vec<DispatchRecord>;
}
