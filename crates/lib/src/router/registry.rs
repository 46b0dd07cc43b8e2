//! Backend registry: route each connection through the router registered for its backend.

use super::{DeliveryError, Router};
use crate::model::{Connection, MessageId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Backend name -> router. Connections whose backend is not registered use the fallback, if any.
pub struct BackendRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Router>>>>,
    fallback: Option<Arc<dyn Router>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BackendRegistry {
    pub fn new(fallback: Option<Arc<dyn Router>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            fallback,
        }
    }

    pub async fn register(&self, backend: impl Into<String>, router: Arc<dyn Router>) {
        self.inner.write().await.insert(backend.into(), router);
    }

    pub async fn backends(&self) -> Vec<String> {
        let g = self.inner.read().await;
        let mut names: Vec<String> = g.keys().cloned().collect();
        names.sort();
        names
    }

    async fn route(&self, backend: &str) -> Result<Arc<dyn Router>, DeliveryError> {
        let g = self.inner.read().await;
        g.get(backend)
            .cloned()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| DeliveryError::NoRoute(backend.to_string()))
    }

    /// Every distinct router, each once even when registered under several names.
    async fn all(&self) -> Vec<Arc<dyn Router>> {
        let g = self.inner.read().await;
        let mut out: Vec<Arc<dyn Router>> = Vec::new();
        for r in g.values().cloned().chain(self.fallback.clone()) {
            if !out.iter().any(|seen| Arc::ptr_eq(seen, &r)) {
                out.push(r);
            }
        }
        out
    }
}

#[async_trait]
impl Router for BackendRegistry {
    async fn send(&self, connection: &Connection, text: &str) -> Result<(), DeliveryError> {
        self.route(&connection.backend)
            .await?
            .send(connection, text)
            .await
    }

    async fn reply(
        &self,
        connection: &Connection,
        text: &str,
        in_response_to: MessageId,
    ) -> Result<(), DeliveryError> {
        self.route(&connection.backend)
            .await?
            .reply(connection, text, in_response_to)
            .await
    }

    async fn start_batch(&self) {
        for r in self.all().await {
            r.start_batch().await;
        }
    }

    async fn stop_batch(&self) {
        for r in self.all().await {
            r.stop_batch().await;
        }
    }
}
