//! Message list filters.

use super::{DistrictChoice, FlaggedChoice, HandledBy, MessageFilter};
use crate::model::MessageRow;
use crate::store::LocationRepository;
use async_trait::async_trait;
use std::sync::Arc;

/// Case-insensitive substring match on message text.
pub struct MessageTextFilter {
    term: String,
}

impl MessageTextFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }
}

#[async_trait]
impl MessageFilter for MessageTextFilter {
    async fn filter(&self, rows: Vec<MessageRow>) -> Vec<MessageRow> {
        if self.term.is_empty() {
            return rows;
        }
        let needle = self.term.to_lowercase();
        rows.into_iter()
            .filter(|r| r.message.text.to_lowercase().contains(&needle))
            .collect()
    }
}

pub struct HandledByFilter {
    handled_by: HandledBy,
}

impl HandledByFilter {
    pub fn new(handled_by: HandledBy) -> Self {
        Self { handled_by }
    }
}

#[async_trait]
impl MessageFilter for HandledByFilter {
    async fn filter(&self, rows: Vec<MessageRow>) -> Vec<MessageRow> {
        match &self.handled_by {
            HandledBy::Any => rows,
            HandledBy::Unhandled => rows
                .into_iter()
                .filter(|r| r.message.application.is_none())
                .collect(),
            HandledBy::App(app) => rows
                .into_iter()
                .filter(|r| r.message.application.as_deref() == Some(app.as_str()))
                .collect(),
        }
    }
}

/// Messages whose sender reports from a district or below it. `NoDistrict`
/// keeps messages from unknown senders or senders without a location.
pub struct MessageDistrictFilter {
    choice: DistrictChoice,
    locations: Arc<dyn LocationRepository>,
}

impl MessageDistrictFilter {
    pub fn new(choice: DistrictChoice, locations: Arc<dyn LocationRepository>) -> Self {
        Self { choice, locations }
    }
}

#[async_trait]
impl MessageFilter for MessageDistrictFilter {
    async fn filter(&self, rows: Vec<MessageRow>) -> Vec<MessageRow> {
        match self.choice {
            DistrictChoice::Any => rows,
            DistrictChoice::NoDistrict => rows
                .into_iter()
                .filter(|r| {
                    r.contact
                        .as_ref()
                        .map(|c| c.reporting_location.is_none())
                        .unwrap_or(true)
                })
                .collect(),
            DistrictChoice::District(id) => {
                let within = self.locations.descendants(id).await;
                if within.is_empty() {
                    log::debug!("message district filter: location {} not found", id);
                    return rows;
                }
                rows.into_iter()
                    .filter(|r| {
                        r.contact
                            .as_ref()
                            .and_then(|c| c.reporting_location)
                            .map(|l| within.contains(&l))
                            .unwrap_or(false)
                    })
                    .collect()
            }
        }
    }
}

pub struct FlaggedFilter {
    choice: FlaggedChoice,
}

impl FlaggedFilter {
    pub fn new(choice: FlaggedChoice) -> Self {
        Self { choice }
    }
}

#[async_trait]
impl MessageFilter for FlaggedFilter {
    async fn filter(&self, rows: Vec<MessageRow>) -> Vec<MessageRow> {
        let want = match self.choice {
            FlaggedChoice::Any => return rows,
            FlaggedChoice::Flagged => true,
            FlaggedChoice::NotFlagged => false,
        };
        rows.into_iter().filter(|r| r.flagged == want).collect()
    }
}
