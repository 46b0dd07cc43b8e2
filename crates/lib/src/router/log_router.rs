//! Router that only logs; used for dry runs.

use super::{DeliveryError, Router};
use crate::model::Connection;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct LogRouter {
    sent: AtomicUsize,
}

impl LogRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Router for LogRouter {
    async fn send(&self, connection: &Connection, text: &str) -> Result<(), DeliveryError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        log::info!(
            "dry run: {} via {}: {}",
            connection.identity,
            connection.backend,
            text
        );
        Ok(())
    }

    async fn start_batch(&self) {
        log::info!("dry run: batch start");
    }

    async fn stop_batch(&self) {
        log::info!("dry run: batch stop, {} sent", self.sent());
    }
}
