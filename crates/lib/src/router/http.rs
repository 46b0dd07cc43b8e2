//! HTTP SMS gateway router: one POST per outgoing message.

use super::{DeliveryError, Router};
use crate::model::{Connection, MessageId};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingBody<'a> {
    backend: &'a str,
    to: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_response_to: Option<MessageId>,
}

/// Posts `{ backend, to, text, inResponseTo? }` to the configured gateway URL.
pub struct HttpRouter {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpRouter {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(
        &self,
        connection: &Connection,
        text: &str,
        in_response_to: Option<MessageId>,
    ) -> Result<(), DeliveryError> {
        let body = OutgoingBody {
            backend: &connection.backend,
            to: &connection.identity,
            text,
            in_response_to,
        };
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(ref t) = self.token {
            req = req.bearer_auth(t);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                identity: connection.identity.clone(),
                reason: format!("{} {}", status, body),
            });
        }
        log::debug!("http router: sent to {}", connection.identity);
        Ok(())
    }
}

#[async_trait]
impl Router for HttpRouter {
    async fn send(&self, connection: &Connection, text: &str) -> Result<(), DeliveryError> {
        self.post(connection, text, None).await
    }

    async fn reply(
        &self,
        connection: &Connection,
        text: &str,
        in_response_to: MessageId,
    ) -> Result<(), DeliveryError> {
        self.post(connection, text, Some(in_response_to)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_body_wire_shape() {
        let body = OutgoingBody {
            backend: "mtn",
            to: "256770000001",
            text: "hi",
            in_response_to: Some(9),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["to"], "256770000001");
        assert_eq!(v["inResponseTo"], 9);

        let plain = OutgoingBody {
            in_response_to: None,
            ..body
        };
        let v = serde_json::to_value(&plain).unwrap();
        assert!(v.get("inResponseTo").is_none());
    }

    #[test]
    fn url_trailing_slash_trimmed() {
        let r = HttpRouter::new("http://127.0.0.1:13013/send/", None);
        assert_eq!(r.url(), "http://127.0.0.1:13013/send");
    }
}
