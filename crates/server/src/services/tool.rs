//! Routing of tool results into conversation history.

use serde_json::Value;
use tracing::{info, instrument, warn};

use shop_chat_core::{DisplayProduct, Message, ToolUseId};

use crate::config::McpConfig;
use crate::db::MessageStore;
use crate::mcp::AUTH_REQUIRED_ERROR;

use super::history::ConversationHistory;
use super::products::{extract_variant_filters, normalize};

/// A failed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    /// Error classification, e.g. `auth_required`.
    pub error_type: String,
    /// Payload handed back to the model.
    pub data: Value,
}

/// Result of invoking one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationOutcome {
    /// Name of the tool that was called.
    pub tool_name: String,
    /// The tool use this outcome answers.
    pub tool_use_id: ToolUseId,
    /// Tool content on success.
    pub result: Result<Value, ToolFailure>,
}

impl ToolInvocationOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn success(tool_name: impl Into<String>, tool_use_id: ToolUseId, content: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_use_id,
            result: Ok(content),
        }
    }

    /// Failed outcome.
    #[must_use]
    pub fn failure(
        tool_name: impl Into<String>,
        tool_use_id: ToolUseId,
        error_type: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_use_id,
            result: Err(ToolFailure {
                error_type: error_type.into(),
                data,
            }),
        }
    }

    /// Whether the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What the caller should do after routing an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSignal {
    /// Keep going.
    Continue,
    /// Tell the widget the customer has to authorize.
    AuthRequired,
}

/// Appends tool results to history and extracts product cards.
#[derive(Debug, Clone)]
pub struct ToolResultRouter {
    product_search_tool: String,
    max_products: usize,
}

impl ToolResultRouter {
    /// Create a router.
    #[must_use]
    pub fn new(product_search_tool: impl Into<String>, max_products: usize) -> Self {
        Self {
            product_search_tool: product_search_tool.into(),
            max_products,
        }
    }

    /// Router configured from the tool endpoint settings.
    #[must_use]
    pub fn from_config(config: &McpConfig) -> Self {
        Self::new(config.product_search_tool.clone(), config.max_products)
    }

    /// Name of the catalog search tool.
    #[must_use]
    pub fn product_search_tool(&self) -> &str {
        &self.product_search_tool
    }

    /// Route one outcome.
    ///
    /// Appends exactly one `tool_result` message to `history` (persisted
    /// best-effort). Successful catalog searches push their product cards
    /// into `products`.
    #[instrument(skip_all, fields(tool = %outcome.tool_name, tool_use_id = %outcome.tool_use_id))]
    pub async fn route<S, P>(
        &self,
        outcome: ToolInvocationOutcome,
        tool_args: &Value,
        history: &mut ConversationHistory,
        products: &mut P,
        store: &S,
    ) -> RouteSignal
    where
        S: MessageStore,
        P: Extend<DisplayProduct> + Send,
    {
        let ToolInvocationOutcome {
            tool_name,
            tool_use_id,
            result,
        } = outcome;

        let (content, signal) = match result {
            Ok(content) => {
                if tool_name == self.product_search_tool {
                    let filters = extract_variant_filters(tool_args);
                    let cards = normalize(&content, &filters, self.max_products);
                    info!(count = cards.len(), "Product search results ready");
                    products.extend(cards);
                }
                (content, RouteSignal::Continue)
            }
            Err(failure) if failure.error_type == AUTH_REQUIRED_ERROR => {
                info!("Tool requires customer authorization");
                (failure.data, RouteSignal::AuthRequired)
            }
            Err(failure) => {
                warn!(error_type = %failure.error_type, "Tool call failed");
                (failure.data, RouteSignal::Continue)
            }
        };

        history
            .record(store, Message::tool_result(tool_use_id, content))
            .await;

        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;
    use shop_chat_core::{ContentBlock, ConversationId, MessageContent};

    fn search_content() -> Value {
        let payload = json!({"products": [
            {"product_id": "p1", "title": "Band", "price_range": {"currency": "USD", "min": 12}}
        ]});
        json!([{ "type": "text", "text": payload.to_string() }])
    }

    #[tokio::test]
    async fn test_search_success_appends_and_emits_products() {
        let store = MemoryStore::new();
        let router = ToolResultRouter::new("search_shop_catalog", 3);
        let mut history = ConversationHistory::new(ConversationId::new("c1"));
        let mut products = Vec::new();

        let outcome = ToolInvocationOutcome::success(
            "search_shop_catalog",
            ToolUseId::new("toolu_1"),
            search_content(),
        );
        let signal = router
            .route(outcome, &json!({"query": "band"}), &mut history, &mut products, &store)
            .await;

        assert_eq!(signal, RouteSignal::Continue);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, "USD 12");
        assert_eq!(history.len(), 1);
        match &history.messages()[0].content {
            MessageContent::Blocks(blocks) => assert!(matches!(
                &blocks[..],
                [ContentBlock::ToolResult { tool_use_id, content }]
                    if tool_use_id.as_str() == "toolu_1" && *content == search_content()
            )),
            MessageContent::Text(_) => panic!("expected blocks"),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_signals_and_records_data() {
        let store = MemoryStore::new();
        let router = ToolResultRouter::new("search_shop_catalog", 3);
        let mut history = ConversationHistory::new(ConversationId::new("c1"));
        let mut products: Vec<DisplayProduct> = Vec::new();

        let outcome = ToolInvocationOutcome::failure(
            "get_most_recent_order_status",
            ToolUseId::new("toolu_9"),
            AUTH_REQUIRED_ERROR,
            json!("Please sign in"),
        );
        let signal = router
            .route(outcome, &json!({}), &mut history, &mut products, &store)
            .await;

        assert_eq!(signal, RouteSignal::AuthRequired);
        assert!(products.is_empty());
        assert_eq!(history.len(), 1);
        let stored = store
            .get_history(&ConversationId::new("c1"))
            .await
            .expect("history");
        assert!(stored[0].content.contains("Please sign in"));
    }

    #[tokio::test]
    async fn test_other_tool_success_has_no_products() {
        let store = MemoryStore::new();
        let router = ToolResultRouter::new("search_shop_catalog", 3);
        let mut history = ConversationHistory::new(ConversationId::new("c1"));
        let mut products = Vec::new();

        let outcome = ToolInvocationOutcome::success(
            "search_shop_policies_and_faqs",
            ToolUseId::new("toolu_2"),
            search_content(),
        );
        router
            .route(outcome, &json!({}), &mut history, &mut products, &store)
            .await;
        assert!(products.is_empty());
        assert_eq!(history.len(), 1);
    }
}
