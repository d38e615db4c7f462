//! Facebook page and Instagram posting through the Graph API

use async_trait::async_trait;
use herald_common::config::MetaConfig;
use herald_common::{Error, Result};
use herald_storage::models::Platform;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{SendOutcome, SideChannelPoster};

#[derive(Debug, Deserialize)]
struct GraphObject {
    id: Option<String>,
}

fn graph_client(config: &MetaConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Channel(format!("Failed to create HTTP client: {}", e)))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// POST a form to the Graph API and return the created object id
async fn post_form(
    client: &Client,
    url: &str,
    form: &[(&str, &str)],
) -> std::result::Result<String, String> {
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(format!("HTTP {}: {}", status.as_u16(), body));
    }

    match serde_json::from_str::<GraphObject>(&body) {
        Ok(GraphObject { id: Some(id) }) => Ok(id),
        _ => Ok(body),
    }
}

/// Publishes text posts on a Facebook page feed
pub struct FacebookPagePoster {
    http_client: Client,
    base_url: String,
    page_id: Option<String>,
    access_token: Option<String>,
}

impl FacebookPagePoster {
    pub fn new(config: &MetaConfig) -> Result<Self> {
        Ok(Self {
            http_client: graph_client(config)?,
            base_url: format!(
                "{}/{}",
                config.graph_url.trim_end_matches('/'),
                config.api_version
            ),
            page_id: non_empty(&config.facebook_page_id),
            access_token: non_empty(&config.access_token),
        })
    }
}

#[async_trait]
impl SideChannelPoster for FacebookPagePoster {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn post_text(&self, content: &str) -> SendOutcome {
        let (Some(page_id), Some(token)) = (&self.page_id, &self.access_token) else {
            return SendOutcome::failure("Facebook page id or access token is not configured");
        };

        let url = format!("{}/{}/feed", self.base_url, page_id);
        match post_form(
            &self.http_client,
            &url,
            &[("message", content), ("access_token", token.as_str())],
        )
        .await
        {
            Ok(post_id) => {
                info!(%post_id, "Facebook post created");
                SendOutcome::success(post_id)
            }
            Err(e) => {
                warn!("Facebook post failed: {}", e);
                SendOutcome::failure(e)
            }
        }
    }
}

/// Publishes captioned image posts on an Instagram business account
///
/// Instagram has no text-only media type, so the payload travels as the
/// caption of a configured image.
pub struct InstagramPoster {
    http_client: Client,
    base_url: String,
    account_id: Option<String>,
    access_token: Option<String>,
    image_url: Option<String>,
}

impl InstagramPoster {
    pub fn new(config: &MetaConfig) -> Result<Self> {
        Ok(Self {
            http_client: graph_client(config)?,
            base_url: format!(
                "{}/{}",
                config.graph_url.trim_end_matches('/'),
                config.api_version
            ),
            account_id: non_empty(&config.instagram_account_id),
            access_token: non_empty(&config.access_token),
            image_url: non_empty(&config.instagram_image_url),
        })
    }
}

#[async_trait]
impl SideChannelPoster for InstagramPoster {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn post_text(&self, content: &str) -> SendOutcome {
        let (Some(account_id), Some(token), Some(image_url)) =
            (&self.account_id, &self.access_token, &self.image_url)
        else {
            return SendOutcome::failure(
                "Instagram account id, access token or image url is not configured",
            );
        };

        let container_url = format!("{}/{}/media", self.base_url, account_id);
        let container_id = match post_form(
            &self.http_client,
            &container_url,
            &[
                ("image_url", image_url.as_str()),
                ("caption", content),
                ("access_token", token.as_str()),
            ],
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Instagram container creation failed: {}", e);
                return SendOutcome::failure(format!("Container creation failed: {}", e));
            }
        };

        let publish_url = format!("{}/{}/media_publish", self.base_url, account_id);
        match post_form(
            &self.http_client,
            &publish_url,
            &[
                ("creation_id", container_id.as_str()),
                ("access_token", token.as_str()),
            ],
        )
        .await
        {
            Ok(post_id) => {
                info!(%post_id, "Instagram post created");
                SendOutcome::success(post_id)
            }
            Err(e) => {
                warn!("Instagram publish failed: {}", e);
                SendOutcome::failure(format!("Publish failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(graph_url: &str) -> MetaConfig {
        MetaConfig {
            graph_url: graph_url.to_string(),
            access_token: Some("token".to_string()),
            facebook_page_id: Some("page-1".to_string()),
            instagram_account_id: Some("ig-1".to_string()),
            instagram_image_url: Some("https://cdn.example.com/card.jpg".to_string()),
            ..MetaConfig::default()
        }
    }

    #[tokio::test]
    async fn test_facebook_post_returns_post_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/page-1/feed"))
            .and(body_string_contains("access_token=token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"page-1_99"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let poster = FacebookPagePoster::new(&config(&server.uri())).unwrap();
        assert_eq!(poster.post_text("New launch").await, SendOutcome::success("page-1_99"));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let bare = MetaConfig {
            graph_url: server.uri(),
            ..MetaConfig::default()
        };

        assert!(!FacebookPagePoster::new(&bare).unwrap().post_text("x").await.ok);
        assert!(!InstagramPoster::new(&bare).unwrap().post_text("x").await.ok);
    }

    #[tokio::test]
    async fn test_instagram_creates_then_publishes_container() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/ig-1/media"))
            .and(body_string_contains("caption=Sea+view"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"container-7"}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v19.0/ig-1/media_publish"))
            .and(body_string_contains("creation_id=container-7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"media-3"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let poster = InstagramPoster::new(&config(&server.uri())).unwrap();
        assert_eq!(poster.post_text("Sea view").await, SendOutcome::success("media-3"));
    }

    #[tokio::test]
    async fn test_instagram_container_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/ig-1/media"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
            .mount(&server)
            .await;

        let outcome = InstagramPoster::new(&config(&server.uri()))
            .unwrap()
            .post_text("Sea view")
            .await;

        assert!(!outcome.ok);
        assert_eq!(outcome.detail, "Container creation failed: HTTP 400: bad image");
    }
}
