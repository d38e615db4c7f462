//! WAHA HTTP gateway adapter

use async_trait::async_trait;
use herald_common::config::GatewayConfig;
use herald_common::{Error, Result};
use herald_storage::models::SendingIdentity;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{ChannelAdapter, SendOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTextRequest<'a> {
    session: &'a str,
    chat_id: &'a str,
    text: &'a str,
}

/// Sends text messages through a WAHA-style gateway
pub struct WahaChannel {
    http_client: Client,
    default_url: String,
    api_key: Option<String>,
}

impl WahaChannel {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Channel(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            default_url: config.url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Gateway base URL for an identity, without a trailing slash
    fn base_url<'a>(&'a self, identity: &'a SendingIdentity) -> &'a str {
        identity
            .api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.default_url)
            .trim_end_matches('/')
    }
}

#[async_trait]
impl ChannelAdapter for WahaChannel {
    async fn send(
        &self,
        identity: &SendingIdentity,
        destination: &str,
        text: &str,
    ) -> SendOutcome {
        let url = format!("{}/api/sendText", self.base_url(identity));
        let body = SendTextRequest {
            session: &identity.session_name,
            chat_id: destination,
            text,
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return SendOutcome::failure(e.to_string()),
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(session = %identity.session_name, %status, "Gateway responded");

        match status {
            StatusCode::OK | StatusCode::CREATED => SendOutcome::success(text),
            _ => SendOutcome::failure(format!("HTTP {}: {}", status.as_u16(), text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity(api_url: Option<String>) -> SendingIdentity {
        SendingIdentity {
            id: Uuid::new_v4(),
            name: "Primary".to_string(),
            session_name: "default".to_string(),
            api_url,
            is_primary: true,
            status: "CONNECTED".to_string(),
            total_sent: 0,
            sent_today: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn channel(url: &str, api_key: Option<&str>) -> WahaChannel {
        WahaChannel::new(&GatewayConfig {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_session_chat_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .and(header("X-Api-Key", "secret"))
            .and(body_json(serde_json::json!({
                "session": "default",
                "chatId": "919800000001@c.us",
                "text": "Plots available",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"msg-1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = channel(&server.uri(), Some("secret"))
            .send(&identity(None), "919800000001@c.us", "Plots available")
            .await;

        assert_eq!(outcome, SendOutcome::success(r#"{"id":"msg-1"}"#));
    }

    #[tokio::test]
    async fn test_identity_url_overrides_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = channel("http://127.0.0.1:9", None)
            .send(&identity(Some(format!("{}/", server.uri()))), "1@g.us", "hi")
            .await;

        assert!(outcome.ok);
    }

    #[tokio::test]
    async fn test_error_status_is_failure_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("session not started"))
            .mount(&server)
            .await;

        let outcome = channel(&server.uri(), None)
            .send(&identity(None), "1@c.us", "hi")
            .await;

        assert!(!outcome.ok);
        assert_eq!(outcome.detail, "HTTP 422: session not started");
    }

    #[tokio::test]
    async fn test_transport_error_is_failure() {
        let outcome = channel("http://127.0.0.1:9", None)
            .send(&identity(None), "1@c.us", "hi")
            .await;

        assert!(!outcome.ok);
        assert!(!outcome.detail.is_empty());
    }
}
