//! Mass text: one operator message to every channel of the selected records.
//!
//! Order of work: permission, recipients, text preparation, dispatch record, sends.
//! The record is written before the first send, so a record exists even if every
//! send fails. Percent escaping happens once, and the escaped text is both stored
//! and sent.

use super::{Action, ActionError, ActionOutcome};
use crate::auth::{authorize, Capability, PermissionService};
use crate::model::{DispatchRecord, User};
use crate::router::Router;
use crate::selection::{RecipientResolver, Selection};
use crate::store::DispatchLog;
use crate::text::{escape_percent, prepare_sms_text};
use async_trait::async_trait;
use std::sync::Arc;

pub struct MassTextAction {
    text: String,
    site: Option<u32>,
    permissions: Arc<dyn PermissionService>,
    resolver: RecipientResolver,
    log: Arc<dyn DispatchLog>,
    router: Arc<dyn Router>,
}

impl MassTextAction {
    pub fn new(
        text: impl Into<String>,
        permissions: Arc<dyn PermissionService>,
        resolver: RecipientResolver,
        log: Arc<dyn DispatchLog>,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            text: text.into(),
            site: None,
            permissions,
            resolver,
            log,
            router,
        }
    }

    /// Site the dispatch record is associated with.
    pub fn with_site(mut self, site: Option<u32>) -> Self {
        self.site = site;
        self
    }

    async fn run(&self, user: &User, selection: &Selection) -> Result<ActionOutcome, ActionError> {
        authorize(self.permissions.as_ref(), user, Capability::SendMessages)?;
        let recipients = self.resolver.resolve(selection).await?;
        let text = escape_percent(&prepare_sms_text(&self.text)?);

        let record = DispatchRecord {
            id: format!("mass-{}", uuid::Uuid::new_v4()),
            text: text.clone(),
            user: user.id,
            date: chrono::Utc::now(),
            contacts: recipients.contacts.clone(),
            recipient_count: recipients.len(),
            site: self.site,
        };
        let record_id = record.id.clone();
        self.log.record(record).await?;
        log::info!(
            "mass text {} by {}: {} connections",
            record_id,
            user.username,
            recipients.len()
        );

        self.router.start_batch().await;
        let mut failed = 0usize;
        for connection in &recipients.connections {
            if let Err(e) = self.router.send(connection, &text).await {
                failed += 1;
                log::warn!("mass text {}: send to {} failed: {}", record_id, connection.identity, e);
            }
        }
        self.router.stop_batch().await;
        if failed > 0 {
            log::warn!(
                "mass text {}: {} of {} sends failed",
                record_id,
                failed,
                recipients.len()
            );
        }

        Ok(ActionOutcome::success(format!(
            "Message successfully sent to {} numbers",
            recipients.len()
        )))
    }
}

#[async_trait]
impl Action for MassTextAction {
    fn label(&self) -> &'static str {
        "Send Message"
    }

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome {
        self.run(user, selection).await.into()
    }
}
