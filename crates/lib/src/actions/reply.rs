//! Reply to selected inbound messages, one reply per message.

use super::{malformed, Action, ActionError, ActionOutcome};
use crate::auth::{authorize, Capability, PermissionService};
use crate::model::User;
use crate::router::Router;
use crate::selection::Selection;
use crate::store::{ConnectionRepository, MessageRepository};
use crate::text::{escape_percent, prepare_sms_text};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ReplyAction {
    text: String,
    permissions: Arc<dyn PermissionService>,
    messages: Arc<dyn MessageRepository>,
    connections: Arc<dyn ConnectionRepository>,
    router: Arc<dyn Router>,
}

impl ReplyAction {
    pub fn new(
        text: impl Into<String>,
        permissions: Arc<dyn PermissionService>,
        messages: Arc<dyn MessageRepository>,
        connections: Arc<dyn ConnectionRepository>,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            text: text.into(),
            permissions,
            messages,
            connections,
            router,
        }
    }

    async fn run(&self, user: &User, selection: &Selection) -> Result<ActionOutcome, ActionError> {
        authorize(self.permissions.as_ref(), user, Capability::SendMessages)?;
        let Selection::Messages(ids) = selection else {
            return Err(malformed("messages", selection));
        };
        let messages = self.messages.messages(ids).await;
        if messages.is_empty() {
            return Err(ActionError::NoRecipients);
        }
        let text = escape_percent(&prepare_sms_text(&self.text)?);

        self.router.start_batch().await;
        let mut attempted = 0usize;
        for m in &messages {
            let Some(connection) = self.connections.get_connection(m.connection).await else {
                log::warn!("reply to message {}: connection {} missing", m.id, m.connection);
                continue;
            };
            attempted += 1;
            if let Err(e) = self.router.reply(&connection, &text, m.id).await {
                log::warn!("reply to message {} failed: {}", m.id, e);
            }
        }
        self.router.stop_batch().await;

        log::info!("{} replied to {} messages", user.username, attempted);
        Ok(ActionOutcome::success(format!(
            "{} messages sent successfully",
            attempted
        )))
    }
}

#[async_trait]
impl Action for ReplyAction {
    fn label(&self) -> &'static str {
        "Reply to selected"
    }

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome {
        self.run(user, selection).await.into()
    }
}
