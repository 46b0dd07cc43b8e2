//! Flag or unflag selected messages. A flagged message carries exactly one marker.

use super::{malformed, Action, ActionError, ActionOutcome};
use crate::model::User;
use crate::selection::Selection;
use crate::store::{FlagRepository, MessageRepository};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOperation {
    Flag,
    Unflag,
}

impl FlagOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagOperation::Flag => "flag",
            FlagOperation::Unflag => "unflag",
        }
    }
}

impl FromStr for FlagOperation {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "flag" => Ok(FlagOperation::Flag),
            "unflag" => Ok(FlagOperation::Unflag),
            other => Err(ActionError::InvalidChoice(other.to_string())),
        }
    }
}

pub struct FlagMessageAction {
    op: FlagOperation,
    messages: Arc<dyn MessageRepository>,
    flags: Arc<dyn FlagRepository>,
}

impl FlagMessageAction {
    pub fn new(
        op: FlagOperation,
        messages: Arc<dyn MessageRepository>,
        flags: Arc<dyn FlagRepository>,
    ) -> Self {
        Self {
            op,
            messages,
            flags,
        }
    }

    async fn run(&self, user: &User, selection: &Selection) -> Result<ActionOutcome, ActionError> {
        let Selection::Messages(ids) = selection else {
            return Err(malformed("messages", selection));
        };
        let messages = self.messages.messages(ids).await;
        if messages.is_empty() {
            return Err(ActionError::NoMessagesSelected);
        }
        for m in &messages {
            match self.op {
                FlagOperation::Flag => {
                    if self.flags.flag_count(m.id).await == 0 {
                        self.flags.add_flag(m.id).await?;
                    }
                }
                FlagOperation::Unflag => {
                    self.flags.clear_flags(m.id).await?;
                }
            }
        }
        log::info!(
            "{} {}ged {} messages",
            user.username,
            self.op.as_str(),
            messages.len()
        );
        Ok(ActionOutcome::success(format!(
            "{} message(s) have been {}ged",
            messages.len(),
            self.op.as_str()
        )))
    }
}

#[async_trait]
impl Action for FlagMessageAction {
    fn label(&self) -> &'static str {
        "Flag/Unflag selected"
    }

    async fn perform(&self, user: &User, selection: &Selection) -> ActionOutcome {
        self.run(user, selection).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_operation() {
        assert_eq!("flag".parse::<FlagOperation>().unwrap(), FlagOperation::Flag);
        assert_eq!(" unflag ".parse::<FlagOperation>().unwrap(), FlagOperation::Unflag);
        assert!("".parse::<FlagOperation>().is_err());
    }
}
