//! JSON-RPC client for the storefront tool endpoint.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use shop_chat_core::ToolUseId;

use crate::claude::Tool;
use crate::config::McpConfig;
use crate::services::tool::ToolInvocationOutcome;

use super::{AUTH_REQUIRED_MESSAGE, CallToolResult, McpError, ToolList};

const TOOL_CACHE_TTL: Duration = Duration::from_secs(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can list and invoke tools on behalf of the model.
pub trait ToolInvoker: Send + Sync {
    /// Tools offered to the model.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<Tool>, McpError>> + Send;

    /// Invoke one tool. Failures are reported in the outcome, never raised.
    fn invoke(
        &self,
        tool_use_id: &ToolUseId,
        name: &str,
        arguments: &Value,
    ) -> impl Future<Output = ToolInvocationOutcome> + Send;
}

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct CallToolParams<'a> {
    name: &'a str,
    arguments: &'a Value,
}

/// Client for the storefront MCP endpoint.
///
/// Cheap to clone; clones share the HTTP client, request counter and tool
/// cache.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<McpClientInner>,
    customer_token: Option<SecretString>,
}

struct McpClientInner {
    client: reqwest::Client,
    endpoint: Url,
    request_id: AtomicU64,
    tools: Cache<&'static str, Arc<Vec<Tool>>>,
}

impl McpClient {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `McpError::Http` if the HTTP client cannot be built.
    pub fn new(config: &McpConfig) -> Result<Self, McpError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let tools = Cache::builder()
            .max_capacity(8)
            .time_to_live(TOOL_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(McpClientInner {
                client,
                endpoint: config.endpoint.clone(),
                request_id: AtomicU64::new(1),
                tools,
            }),
            customer_token: None,
        })
    }

    /// A client that authenticates customer-scoped calls with `token`.
    #[must_use]
    pub fn with_customer_token(&self, token: Option<SecretString>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            customer_token: token,
        }
    }

    /// The endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    const fn cache_key(&self) -> &'static str {
        if self.customer_token.is_some() {
            "customer"
        } else {
            "anonymous"
        }
    }

    /// Fetch the tool list, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the result is malformed.
    #[instrument(skip(self), fields(endpoint = %self.inner.endpoint))]
    pub async fn fetch_tools(&self) -> Result<Vec<Tool>, McpError> {
        let list: ToolList = self.rpc_call::<(), _>("tools/list", None).await?;
        debug!(count = list.tools.len(), "Fetched tool list");
        Ok(list.tools.into_iter().map(Into::into).collect())
    }

    /// Call a tool and return its raw result.
    ///
    /// # Errors
    ///
    /// Returns `McpError::AuthRequired` on HTTP 401 and other variants for
    /// transport, RPC or parse failures.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<CallToolResult, McpError> {
        self.rpc_call("tools/call", Some(CallToolParams { name, arguments }))
            .await
    }

    /// Make a JSON-RPC call to the endpoint.
    async fn rpc_call<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, McpError> {
        let id = self.inner.request_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!(method, id, "RPC call");

        let mut builder = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .json(&request);
        if let Some(token) = &self.customer_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(McpError::AuthRequired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;
        let rpc_response: RpcResponse<R> = serde_json::from_str(&body)
            .map_err(|e| McpError::Parse(format!("Failed to parse RPC response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| McpError::Parse("No result in response".to_string()))
    }
}

impl ToolInvoker for McpClient {
    async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        let key = self.cache_key();
        if let Some(cached) = self.inner.tools.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let tools = self.fetch_tools().await?;
        self.inner.tools.insert(key, Arc::new(tools.clone())).await;
        Ok(tools)
    }

    async fn invoke(
        &self,
        tool_use_id: &ToolUseId,
        name: &str,
        arguments: &Value,
    ) -> ToolInvocationOutcome {
        match self.call_tool(name, arguments).await {
            Ok(result) if result.is_error => {
                warn!(tool = name, "Tool reported an error result");
                ToolInvocationOutcome::failure(name, tool_use_id.clone(), "tool_error", result.content)
            }
            Ok(result) => ToolInvocationOutcome::success(name, tool_use_id.clone(), result.content),
            Err(McpError::AuthRequired) => ToolInvocationOutcome::failure(
                name,
                tool_use_id.clone(),
                McpError::AuthRequired.error_type(),
                Value::String(AUTH_REQUIRED_MESSAGE.to_string()),
            ),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolInvocationOutcome::failure(
                    name,
                    tool_use_id.clone(),
                    e.error_type(),
                    Value::String(format!("Error calling tool {name}: {e}")),
                )
            }
        }
    }
}
