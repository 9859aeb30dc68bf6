//! Storefront tool endpoint (Model Context Protocol over JSON-RPC 2.0).
//!
//! # Architecture
//!
//! - `tools/list` is cached via `moka` (5 minute TTL) and converted into
//!   Claude tool definitions
//! - `tools/call` results are passed through verbatim as the tool result
//! - Customer-scoped tools receive the conversation's customer token as a
//!   bearer token; HTTP 401 turns into an `auth_required` outcome

mod client;

pub use client::{McpClient, ToolInvoker};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type reported when a tool needs the customer to sign in.
pub const AUTH_REQUIRED_ERROR: &str = "auth_required";

/// Message handed to the model when a tool needs customer authorization.
pub const AUTH_REQUIRED_MESSAGE: &str =
    "You must authorize the app to access your customer data before this tool can run.";

/// Errors that can occur when talking to the tool endpoint.
#[derive(Debug, Error)]
pub enum McpError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The customer must authorize before this call can succeed.
    #[error("customer authorization required")]
    AuthRequired,

    /// JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// Response did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl McpError {
    /// Error type string recorded in a failed tool outcome.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::AuthRequired => AUTH_REQUIRED_ERROR,
            Self::Http(_) | Self::Status { .. } => "http_error",
            Self::Rpc { .. } => "rpc_error",
            Self::Parse(_) => "parse_error",
        }
    }
}

/// Tool definition as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the arguments.
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl From<McpTool> for crate::claude::Tool {
    fn from(tool: McpTool) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }
}

/// `tools/list` result.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ToolList {
    #[serde(default)]
    pub tools: Vec<McpTool>,
}

/// `tools/call` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content items returned by the tool.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Whether the tool reported a failure.
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp_tool_converts_schema() {
        let tool: McpTool = serde_json::from_str(
            r#"{"name":"search_shop_catalog","description":"Search","inputSchema":{"type":"object","properties":{"query":{"type":"string"}}}}"#,
        )
        .expect("deserialize");
        let claude_tool: crate::claude::Tool = tool.into();
        assert_eq!(claude_tool.name, "search_shop_catalog");
        assert_eq!(claude_tool.input_schema["properties"]["query"]["type"], "string");
    }

    #[test]
    fn test_mcp_tool_without_schema_gets_empty_object() {
        let tool: McpTool =
            serde_json::from_str(r#"{"name":"get_cart"}"#).expect("deserialize");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(McpError::AuthRequired.error_type(), AUTH_REQUIRED_ERROR);
        assert_eq!(
            McpError::Rpc {
                code: -32601,
                message: "Method not found".to_string()
            }
            .error_type(),
            "rpc_error"
        );
    }
}
