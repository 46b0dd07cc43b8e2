//! Permission checks run before any action touches recipients or the store.

use crate::actions::ActionError;
use crate::model::User;
use std::collections::{HashMap, HashSet};

/// Capabilities an action can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Send mass texts and replies.
    SendMessages,
}

impl Capability {
    pub fn code(&self) -> &'static str {
        match self {
            Capability::SendMessages => "contact.can_message",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "contact.can_message" => Some(Capability::SendMessages),
            _ => None,
        }
    }
}

pub trait PermissionService: Send + Sync {
    fn has_permission(&self, user: &User, capability: Capability) -> bool;
}

/// Proof that `authorize` passed for one capability.
#[derive(Debug, Clone, Copy)]
pub struct Authorized {
    capability: Capability,
}

impl Authorized {
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

/// Guard invoked at the top of an action. Unauthenticated users are always denied.
pub fn authorize(
    permissions: &dyn PermissionService,
    user: &User,
    capability: Capability,
) -> Result<Authorized, ActionError> {
    if user.authenticated && permissions.has_permission(user, capability) {
        Ok(Authorized { capability })
    } else {
        log::info!(
            "permission {} denied for user {:?}",
            capability.code(),
            user.username
        );
        Err(ActionError::PermissionDenied)
    }
}

/// Username -> granted capabilities, usually built from config.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    grants: HashMap<String, HashSet<Capability>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, username: impl Into<String>, capability: Capability) {
        self.grants
            .entry(username.into())
            .or_default()
            .insert(capability);
    }

    /// Build from `permissions` config; unknown capability codes are skipped with a warning.
    pub fn from_codes(map: &HashMap<String, Vec<String>>) -> Self {
        let mut p = Self::new();
        for (username, codes) in map {
            for code in codes {
                match Capability::from_code(code) {
                    Some(c) => p.grant(username.clone(), c),
                    None => log::warn!("unknown capability {:?} for user {}", code, username),
                }
            }
        }
        p
    }
}

impl PermissionService for StaticPermissions {
    fn has_permission(&self, user: &User, capability: Capability) -> bool {
        self.grants
            .get(&user.username)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: 1,
            username: name.to_string(),
            authenticated: true,
            groups: vec![],
        }
    }

    #[test]
    fn authorize_granted_user() {
        let mut p = StaticPermissions::new();
        p.grant("alice", Capability::SendMessages);
        let ok = authorize(&p, &user("alice"), Capability::SendMessages).unwrap();
        assert_eq!(ok.capability(), Capability::SendMessages);
    }

    #[test]
    fn authorize_denies_missing_grant_and_anonymous() {
        let mut p = StaticPermissions::new();
        p.grant("", Capability::SendMessages);
        assert!(matches!(
            authorize(&p, &user("bob"), Capability::SendMessages),
            Err(ActionError::PermissionDenied)
        ));
        assert!(matches!(
            authorize(&p, &User::anonymous(), Capability::SendMessages),
            Err(ActionError::PermissionDenied)
        ));
    }

    #[test]
    fn from_codes_skips_unknown() {
        let mut map = HashMap::new();
        map.insert(
            "alice".to_string(),
            vec!["contact.can_message".to_string(), "contact.bogus".to_string()],
        );
        let p = StaticPermissions::from_codes(&map);
        assert!(p.has_permission(&user("alice"), Capability::SendMessages));
    }
}
