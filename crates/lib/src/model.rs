//! Records the actions and filters work on: contacts, their connections
//! (addressable SMS endpoints), groups, locations, messages and the mass-text log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type ContactId = u64;
pub type ConnectionId = u64;
pub type GroupId = u64;
pub type LocationId = u64;
pub type MessageId = u64;
pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub reporting_location: Option<LocationId>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

/// One addressable channel (phone number on a backend), optionally bound to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: String,
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub contact: Option<ContactId>,
}

fn default_backend() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Country,
    Region,
    District,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub parent: Option<LocationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub connection: ConnectionId,
    pub text: String,
    pub direction: Direction,
    /// App that handled an incoming message (e.g. "poll"); None when unhandled.
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub in_response_to: Option<MessageId>,
    pub date: DateTime<Utc>,
}

/// Marks a message for review. At most one exists per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagMarker {
    pub id: u64,
    pub message: MessageId,
}

/// Reporter view record: `default_connection` is a composite "label,connection_id" string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    pub id: ContactId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_connection: String,
}

impl Reporter {
    /// Connection id from the second comma-separated field, if present and numeric.
    pub fn default_connection_id(&self) -> Option<ConnectionId> {
        self.default_connection
            .split(',')
            .nth(1)
            .and_then(|s| s.trim().parse().ok())
    }
}

/// The operator performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default = "default_true")]
    pub authenticated: bool,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn anonymous() -> Self {
        Self {
            id: 0,
            username: String::new(),
            authenticated: false,
            groups: Vec::new(),
        }
    }
}

/// Log entry for one mass text. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub id: String,
    /// Text exactly as handed to the router (percent-escaped).
    pub text: String,
    pub user: UserId,
    pub date: DateTime<Utc>,
    pub contacts: Vec<ContactId>,
    pub recipient_count: usize,
    #[serde(default)]
    pub site: Option<u32>,
}

/// Contact joined with what the contact filters match on.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    pub contact: Contact,
    pub location: Option<Location>,
    pub identities: Vec<String>,
    pub group_names: Vec<String>,
}

/// Message joined with its connection, owning contact and flag state.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub message: Message,
    pub connection: Option<Connection>,
    pub contact: Option<Contact>,
    pub flagged: bool,
}
