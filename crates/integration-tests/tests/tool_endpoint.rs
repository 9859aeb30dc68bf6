//! The storefront tool client against a local JSON-RPC endpoint.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use shop_chat_core::ToolUseId;
use shop_chat_integration_tests::{MAX_PRODUCTS, SEARCH_TOOL};
use shop_chat_server::config::McpConfig;
use shop_chat_server::mcp::{AUTH_REQUIRED_ERROR, AUTH_REQUIRED_MESSAGE, McpClient, ToolInvoker};

const CUSTOMER_TOKEN: &str = "shcat_customer";

#[derive(Default)]
struct Endpoint {
    list_requests: AtomicUsize,
}

async fn rpc(
    State(endpoint): State<Arc<Endpoint>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let id = request["id"].clone();
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {CUSTOMER_TOKEN}"));

    let result = match request["method"].as_str() {
        Some("tools/list") => {
            endpoint.list_requests.fetch_add(1, Ordering::SeqCst);
            let mut tools = vec![json!({
                "name": SEARCH_TOOL,
                "description": "Search the catalog",
                "inputSchema": {"type": "object", "properties": {"query": {"type": "string"}}}
            })];
            if authorized {
                tools.push(json!({"name": "get_order_status"}));
            }
            json!({"tools": tools})
        }
        Some("tools/call") => match request["params"]["name"].as_str() {
            Some("get_order_status") if !authorized => {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            Some("get_order_status") => {
                json!({"content": [{"type": "text", "text": "Order 1001 shipped"}]})
            }
            Some("get_cart") => {
                json!({"content": [{"type": "text", "text": "Cart unavailable"}], "isError": true})
            }
            Some(SEARCH_TOOL) => json!({
                "content": [{"type": "text", "text": "{\"products\":[]}"}]
            }),
            _ => {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32602, "message": "Unknown tool"}
                }))
                .into_response();
            }
        },
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response()
}

async fn spawn_endpoint() -> (McpClient, Arc<Endpoint>) {
    let endpoint = Arc::new(Endpoint::default());
    let app = Router::new()
        .route("/api/mcp", post(rpc))
        .with_state(Arc::clone(&endpoint));

    let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let config = McpConfig {
        endpoint: Url::parse(&format!("http://{addr}/api/mcp")).expect("url"),
        product_search_tool: SEARCH_TOOL.to_string(),
        max_products: MAX_PRODUCTS,
    };
    (McpClient::new(&config).expect("mcp client"), endpoint)
}

#[tokio::test]
async fn test_tool_list_is_converted_and_cached() {
    let (client, endpoint) = spawn_endpoint().await;

    let tools = client.list_tools().await.expect("tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, SEARCH_TOOL);
    assert_eq!(tools[0].input_schema["properties"]["query"]["type"], "string");

    client.list_tools().await.expect("cached tools");
    assert_eq!(endpoint.list_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_customer_scope_lists_tools_separately() {
    let (client, endpoint) = spawn_endpoint().await;
    client.list_tools().await.expect("anonymous tools");

    let customer = client.with_customer_token(Some(SecretString::from(CUSTOMER_TOKEN)));
    let tools = customer.list_tools().await.expect("customer tools");

    assert_eq!(tools.len(), 2);
    assert_eq!(endpoint.list_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unauthorized_call_becomes_auth_required() {
    let (client, _endpoint) = spawn_endpoint().await;

    let outcome = client
        .invoke(&ToolUseId::new("toolu_1"), "get_order_status", &json!({}))
        .await;

    let failure = outcome.result.expect_err("call should fail");
    assert_eq!(failure.error_type, AUTH_REQUIRED_ERROR);
    assert_eq!(failure.data, Value::String(AUTH_REQUIRED_MESSAGE.to_string()));
}

#[tokio::test]
async fn test_customer_token_is_sent_as_bearer() {
    let (client, _endpoint) = spawn_endpoint().await;
    let customer = client.with_customer_token(Some(SecretString::from(CUSTOMER_TOKEN)));

    let outcome = customer
        .invoke(&ToolUseId::new("toolu_1"), "get_order_status", &json!({}))
        .await;

    assert!(outcome.is_success());
    assert_eq!(
        outcome.result.expect("content"),
        json!([{"type": "text", "text": "Order 1001 shipped"}])
    );
}

#[tokio::test]
async fn test_tool_and_rpc_errors_are_classified() {
    let (client, _endpoint) = spawn_endpoint().await;

    let tool_error = client
        .invoke(&ToolUseId::new("toolu_1"), "get_cart", &json!({}))
        .await;
    assert_eq!(
        tool_error.result.expect_err("tool error").error_type,
        "tool_error"
    );

    let rpc_error = client
        .invoke(&ToolUseId::new("toolu_2"), "no_such_tool", &json!({}))
        .await;
    let failure = rpc_error.result.expect_err("rpc error");
    assert_eq!(failure.error_type, "rpc_error");
    assert!(
        failure
            .data
            .as_str()
            .is_some_and(|s| s.contains("Unknown tool"))
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_http_error() {
    let config = McpConfig {
        endpoint: Url::parse("http://127.0.0.1:9/api/mcp").expect("url"),
        product_search_tool: SEARCH_TOOL.to_string(),
        max_products: MAX_PRODUCTS,
    };
    let client = McpClient::new(&config).expect("mcp client");

    assert!(client.list_tools().await.is_err());
    let outcome = client
        .invoke(&ToolUseId::new("toolu_1"), SEARCH_TOOL, &json!({"query": "ring"}))
        .await;
    assert_eq!(outcome.result.expect_err("http error").error_type, "http_error");
}
