//! HTTP implementation of [`ChatBackend`].

use futures::StreamExt;
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

use shop_chat_core::{
    ChatRequest, ConversationId, HistoryResponse, StoredMessage, TokenStatus, TokenStatusResponse,
};

use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::ports::{ByteStream, ChatBackend};

/// Header carrying the storefront's shop ID.
pub const SHOP_ID_HEADER: &str = "X-Shopify-Shop-Id";

/// Talks to the chat server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    shop_id: String,
}

impl HttpBackend {
    /// Create a backend for the configured server.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Http` if the HTTP client cannot be built.
    pub fn new(config: &WidgetConfig) -> Result<Self, WidgetError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(config.app_url.clone()),
            shop_id: config.shop_id.clone(),
        })
    }

    /// Server base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, WidgetError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, WidgetError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl ChatBackend for HttpBackend {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, WidgetError> {
        let mut builder = self
            .client
            .post(self.endpoint("chat")?)
            .header(ACCEPT, "text/event-stream")
            .json(request);
        if !self.shop_id.is_empty() {
            builder = builder.header(SHOP_ID_HEADER, &self.shop_id);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(WidgetError::from))
            .boxed())
    }

    async fn token_status(&self, conversation_id: &ConversationId) -> Result<TokenStatus, WidgetError> {
        let mut url = self.endpoint("auth/token-status")?;
        url.query_pairs_mut()
            .append_pair("conversation_id", conversation_id.as_str());
        let body: TokenStatusResponse = self.get_json(url).await?;
        Ok(body.status)
    }

    async fn history(&self, conversation_id: &ConversationId) -> Result<Vec<StoredMessage>, WidgetError> {
        let mut url = self.endpoint("chat")?;
        url.query_pairs_mut()
            .append_pair("history", "true")
            .append_pair("conversation_id", conversation_id.as_str());
        let body: HistoryResponse = self.get_json(url).await?;
        Ok(body.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let config = WidgetConfig::new(Url::parse("https://chat.example.com/apps/shop-chat").expect("url"));
        let backend = HttpBackend::new(&config).expect("backend");
        assert_eq!(
            backend.endpoint("chat").expect("url").as_str(),
            "https://chat.example.com/apps/shop-chat/chat"
        );
        assert_eq!(
            backend.endpoint("auth/token-status").expect("url").as_str(),
            "https://chat.example.com/apps/shop-chat/auth/token-status"
        );
    }
}
