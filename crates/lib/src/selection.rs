//! What an action was invoked on, and how that turns into distinct connections to message.

use crate::actions::ActionError;
use crate::model::{Connection, ConnectionId, ContactId, MessageId, Reporter};
use crate::store::{ConnectionRepository, MessageRepository};
use std::collections::HashSet;
use std::sync::Arc;

/// Records selected in the list view. Each kind carries its own resolution rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Contacts(Vec<ContactId>),
    Messages(Vec<MessageId>),
    /// Reporter view rows; the channel is the second field of `default_connection`.
    Reporters(Vec<Reporter>),
}

impl Selection {
    pub fn kind(&self) -> &'static str {
        match self {
            Selection::Contacts(_) => "contacts",
            Selection::Messages(_) => "messages",
            Selection::Reporters(_) => "reporters",
        }
    }
}

/// Channels are distinct by backend and identity, not by contact or row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChannelKey {
    backend: String,
    identity: String,
}

impl ChannelKey {
    fn of(connection: &Connection) -> Self {
        Self {
            backend: connection.backend.clone(),
            identity: connection.identity.clone(),
        }
    }
}

/// Distinct connections to message plus the contacts they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub connections: Vec<Connection>,
    pub contacts: Vec<ContactId>,
}

impl Recipients {
    fn push_connection(&mut self, seen: &mut HashSet<ChannelKey>, connection: Connection) {
        if seen.insert(ChannelKey::of(&connection)) {
            if let Some(c) = connection.contact {
                self.push_contact(c);
            }
            self.connections.push(connection);
        }
    }

    fn push_contact(&mut self, id: ContactId) {
        if !self.contacts.contains(&id) {
            self.contacts.push(id);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[derive(Clone)]
pub struct RecipientResolver {
    connections: Arc<dyn ConnectionRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl RecipientResolver {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            connections,
            messages,
        }
    }

    /// Resolve the selection to distinct connections, keeping first-seen order.
    /// Fails with `NoRecipients` when nothing addressable remains.
    pub async fn resolve(&self, selection: &Selection) -> Result<Recipients, ActionError> {
        let mut out = Recipients::default();
        let mut seen = HashSet::new();
        match selection {
            Selection::Contacts(ids) => {
                let mut connections = self.connections.connections_for_contacts(ids).await;
                // selection order first, then connection id
                connections.sort_by_key(|c| {
                    let pos = c
                        .contact
                        .and_then(|id| ids.iter().position(|x| *x == id))
                        .unwrap_or(usize::MAX);
                    (pos, c.id)
                });
                for id in ids {
                    out.push_contact(*id);
                }
                for c in connections {
                    out.push_connection(&mut seen, c);
                }
            }
            Selection::Messages(ids) => {
                let messages = self.messages.messages(ids).await;
                for id in ids {
                    let Some(m) = messages.iter().find(|m| m.id == *id) else {
                        continue;
                    };
                    if let Some(c) = self.connections.get_connection(m.connection).await {
                        out.push_connection(&mut seen, c);
                    }
                }
            }
            Selection::Reporters(reporters) => {
                for r in reporters {
                    let Some(conn_id) = r.default_connection_id() else {
                        log::debug!("reporter {} has no default connection", r.id);
                        continue;
                    };
                    if let Some(c) = self.connections.get_connection(conn_id).await {
                        if seen.insert(ChannelKey::of(&c)) {
                            out.connections.push(c);
                        }
                    }
                }
                for r in reporters {
                    out.push_contact(r.id);
                }
            }
        }
        if out.is_empty() {
            return Err(ActionError::NoRecipients);
        }
        Ok(out)
    }
}
