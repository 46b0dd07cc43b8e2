//! Bulk actions over a selection: mass text, reply, group membership, flagging.
//!
//! Every action returns an `ActionOutcome` (message + status) so callers can render
//! success and failure the same way; errors never escape `perform`.

mod flag;
mod groups;
mod mass_text;
mod reply;

pub use flag::{FlagMessageAction, FlagOperation};
pub use groups::{allowed_groups, AssignGroupAction, RemoveGroupAction};
pub use mass_text::MassTextAction;
pub use reply::ReplyAction;

use crate::model::User;
use crate::selection::Selection;
use crate::store::StoreError;
use crate::text::TextError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("You don't have permission to send messages!")]
    PermissionDenied,
    #[error("A message must have one or more recipients!")]
    NoRecipients,
    #[error("You must select one or more messages to Flag or Unflag them!")]
    NoMessagesSelected,
    #[error("this action applies to {expected}, not {got}")]
    MalformedSelection {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Select a valid choice. {0} is not one of the available choices.")]
    InvalidChoice(String),
    #[error("{0}")]
    Text(#[from] TextError),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// `(message, status)` pair handed back to the list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub message: String,
    pub status: ActionStatus,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ActionStatus::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ActionStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

impl From<ActionError> for ActionOutcome {
    fn from(e: ActionError) -> Self {
        ActionOutcome::error(e.to_string())
    }
}

impl From<Result<ActionOutcome, ActionError>> for ActionOutcome {
    fn from(r: Result<ActionOutcome, ActionError>) -> Self {
        r.unwrap_or_else(ActionOutcome::from)
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    /// Button label in the list view.
    fn label(&self) -> &'static str;

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome;
}

pub(crate) fn malformed(expected: &'static str, selection: &Selection) -> ActionError {
    ActionError::MalformedSelection {
        expected,
        got: selection.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_as_error_outcomes() {
        let o: ActionOutcome = ActionError::NoRecipients.into();
        assert_eq!(o.status, ActionStatus::Error);
        assert_eq!(o.message, "A message must have one or more recipients!");

        let o: ActionOutcome = ActionError::Text(TextError::Empty).into();
        assert_eq!(o.message, "message text is empty");
    }

    #[test]
    fn outcome_serializes_status_lowercase() {
        let v = serde_json::to_value(ActionOutcome::success("ok")).unwrap();
        assert_eq!(v["status"], "success");
    }
}
