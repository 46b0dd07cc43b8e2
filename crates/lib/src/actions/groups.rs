//! Add selected contacts to, or remove them from, groups.

use super::{malformed, Action, ActionError, ActionOutcome};
use crate::model::{Group, GroupId, User};
use crate::selection::Selection;
use crate::store::{ContactRepository, GroupRepository};
use async_trait::async_trait;
use std::sync::Arc;

/// Groups a user may pick from: their own groups when signed in, otherwise every group.
pub async fn allowed_groups(groups: &dyn GroupRepository, user: &User) -> Vec<Group> {
    let all = groups.groups().await;
    if user.authenticated {
        all.into_iter()
            .filter(|g| user.groups.contains(&g.id))
            .collect()
    } else {
        all
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Assign,
    Remove,
}

struct GroupChange {
    groups: Vec<GroupId>,
    contacts: Arc<dyn ContactRepository>,
    group_repo: Arc<dyn GroupRepository>,
}

impl GroupChange {
    async fn run(
        &self,
        op: Membership,
        user: &User,
        selection: &Selection,
    ) -> Result<ActionOutcome, ActionError> {
        let Selection::Contacts(ids) = selection else {
            return Err(malformed("contacts", selection));
        };
        let allowed = allowed_groups(self.group_repo.as_ref(), user).await;
        if let Some(bad) = self
            .groups
            .iter()
            .find(|id| !allowed.iter().any(|g| g.id == **id))
        {
            return Err(ActionError::InvalidChoice(bad.to_string()));
        }

        for contact in self.contacts.contacts(ids).await {
            for group in &self.groups {
                match op {
                    Membership::Assign => self.contacts.add_to_group(contact.id, *group).await?,
                    Membership::Remove => {
                        self.contacts.remove_from_group(contact.id, *group).await?
                    }
                }
            }
        }

        log::info!(
            "{} {:?} {} contacts, {} groups",
            user.username,
            op,
            ids.len(),
            self.groups.len()
        );
        let verb = match op {
            Membership::Assign => "assigned to",
            Membership::Remove => "removed from",
        };
        Ok(ActionOutcome::success(format!(
            "{} Contacts {} {} groups.",
            ids.len(),
            verb,
            self.groups.len()
        )))
    }
}

pub struct AssignGroupAction {
    inner: GroupChange,
}

impl AssignGroupAction {
    pub fn new(
        groups: Vec<GroupId>,
        contacts: Arc<dyn ContactRepository>,
        group_repo: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            inner: GroupChange {
                groups,
                contacts,
                group_repo,
            },
        }
    }
}

#[async_trait]
impl Action for AssignGroupAction {
    fn label(&self) -> &'static str {
        "Assign to group(s)"
    }

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome {
        self.inner.run(Membership::Assign, user, selection).await.into()
    }
}

pub struct RemoveGroupAction {
    inner: GroupChange,
}

impl RemoveGroupAction {
    pub fn new(
        groups: Vec<GroupId>,
        contacts: Arc<dyn ContactRepository>,
        group_repo: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            inner: GroupChange {
                groups,
                contacts,
                group_repo,
            },
        }
    }
}

#[async_trait]
impl Action for RemoveGroupAction {
    fn label(&self) -> &'static str {
        "Remove group(s)"
    }

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome {
        self.inner.run(Membership::Remove, user, selection).await.into()
    }
}
