//! Outbound SMS routing.
//!
//! `Router` is what actions send through. `HttpRouter` posts to an SMS gateway,
//! `LogRouter` only logs, and `BackendRegistry` picks a router per connection backend.

mod http;
mod log_router;
mod registry;

pub use http::HttpRouter;
pub use log_router::LogRouter;
pub use registry::BackendRegistry;

use crate::model::{Connection, MessageId};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("sms gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("sms gateway rejected message to {identity}: {reason}")]
    Rejected { identity: String, reason: String },
    #[error("no route for backend {0}")]
    NoRoute(String),
}

#[async_trait]
pub trait Router: Send + Sync {
    /// Send one message to one connection.
    async fn send(&self, connection: &Connection, text: &str) -> Result<(), DeliveryError>;

    /// Send a reply to an inbound message. Defaults to a plain send.
    async fn reply(
        &self,
        connection: &Connection,
        text: &str,
        in_response_to: MessageId,
    ) -> Result<(), DeliveryError> {
        let _ = in_response_to;
        self.send(connection, text).await
    }

    /// Called before a burst of sends.
    async fn start_batch(&self) {}

    /// Called after a burst of sends, even when some failed.
    async fn stop_batch(&self) {}
}
