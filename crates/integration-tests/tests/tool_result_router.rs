//! Tool results flowing back through the server turn loop.
//!
//! These drive `stream_chat_turn` directly and inspect both the protocol
//! events and what the model was sent next.

use futures::StreamExt;
use serde_json::{Value, json};

use shop_chat_core::{ContentBlock, ConversationId, MessageContent, StreamEvent};
use shop_chat_integration_tests::{
    MAX_PRODUCTS, SEARCH_TOOL, ScriptedModel, ScriptedTools, ToolAnswer, search_result,
    text_message, tool_use_message,
};
use shop_chat_server::db::{MemoryStore, MessageStore};
use shop_chat_server::mcp::AUTH_REQUIRED_MESSAGE;
use shop_chat_server::services::{
    ChatTurnRequest, MAX_TOOL_ITERATIONS, ToolResultRouter, stream_chat_turn,
};

const ORDER_TOOL: &str = "get_order_status";

async fn run_turn(
    model: &ScriptedModel,
    tools: &ScriptedTools,
    store: &MemoryStore,
    message: &str,
) -> Vec<StreamEvent> {
    let mut request = ChatTurnRequest::new(message, "Integration Shop");
    request.conversation_id = Some(ConversationId::new("conv-tools"));
    stream_chat_turn(
        model.clone(),
        tools.clone(),
        store.clone(),
        ToolResultRouter::new(SEARCH_TOOL, MAX_PRODUCTS),
        request,
    )
    .collect()
    .await
}

fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::kind).collect()
}

/// Content of the last tool result the model was sent.
fn last_tool_result(model: &ScriptedModel) -> Value {
    let call = model.calls().pop().expect("model called");
    let message = call.messages.last().expect("messages sent").clone();
    match message.content {
        MessageContent::Blocks(blocks) => match blocks.into_iter().next() {
            Some(ContentBlock::ToolResult { content, .. }) => content,
            other => panic!("expected a tool result, got {other:?}"),
        },
        MessageContent::Text(text) => panic!("expected blocks, got text {text:?}"),
    }
}

#[tokio::test]
async fn test_event_order_of_a_tool_turn() {
    let model = ScriptedModel::new();
    model.push_message(tool_use_message(
        None,
        "toolu_1",
        SEARCH_TOOL,
        &json!({"query": "opal"}),
    ));
    model.push_message(text_message(&["No opals right now."]));
    let tools = ScriptedTools::new(&[SEARCH_TOOL], &[]);
    tools.answer(SEARCH_TOOL, ToolAnswer::Content(search_result(&json!([]))));
    let store = MemoryStore::new();

    let events = run_turn(&model, &tools, &store, "Any opal rings?").await;

    assert_eq!(
        kinds(&events),
        [
            "id",
            "message_complete",
            "tool_use",
            "new_message",
            "chunk",
            "content_block_complete",
            "message_complete",
            "end_turn",
        ]
    );
    assert!(matches!(
        &events[2],
        StreamEvent::ToolUse { tool_use_message }
            if tool_use_message.starts_with("Calling tool: search_shop_catalog")
    ));
}

#[tokio::test]
async fn test_tool_result_is_passed_to_the_model_verbatim() {
    let content = search_result(&json!([{"product_id": "p1", "title": "Moonstone"}]));
    let model = ScriptedModel::new();
    model.push_message(tool_use_message(
        None,
        "toolu_1",
        SEARCH_TOOL,
        &json!({"query": "moonstone"}),
    ));
    model.push_message(text_message(&["We have a moonstone ring."]));
    let tools = ScriptedTools::new(&[SEARCH_TOOL], &[]);
    tools.answer(SEARCH_TOOL, ToolAnswer::Content(content.clone()));
    let store = MemoryStore::new();

    run_turn(&model, &tools, &store, "moonstone?").await;

    assert_eq!(last_tool_result(&model), content);
    assert_eq!(
        tools.calls()[0].arguments,
        json!({"query": "moonstone"})
    );
}

#[tokio::test]
async fn test_failed_tool_is_reported_to_the_model_and_turn_continues() {
    let model = ScriptedModel::new();
    model.push_message(tool_use_message(
        Some("Checking the cart."),
        "toolu_1",
        "get_cart",
        &json!({}),
    ));
    model.push_message(text_message(&["I couldn't reach your cart."]));
    let tools = ScriptedTools::new(&[SEARCH_TOOL, "get_cart"], &[]);
    tools.answer("get_cart", ToolAnswer::Failed("Error calling tool get_cart: timeout".to_string()));
    let store = MemoryStore::new();

    let events = run_turn(&model, &tools, &store, "What's in my cart?").await;

    assert_eq!(kinds(&events).last(), Some(&"end_turn"));
    assert!(!kinds(&events).contains(&"auth_required"));
    assert_eq!(
        last_tool_result(&model),
        Value::String("Error calling tool get_cart: timeout".to_string())
    );
}

#[tokio::test]
async fn test_customer_tool_without_token_signals_auth_required() {
    let model = ScriptedModel::new();
    model.push_message(tool_use_message(
        None,
        "toolu_1",
        ORDER_TOOL,
        &json!({"order": "1001"}),
    ));
    model.push_message(text_message(&["Please sign in so I can check."]));
    let tools = ScriptedTools::new(&[SEARCH_TOOL, ORDER_TOOL], &[ORDER_TOOL]);
    let store = MemoryStore::new();

    let events = run_turn(&model, &tools, &store, "Where is order 1001?").await;
    let kinds = kinds(&events);

    let tool_use_at = kinds.iter().position(|k| *k == "tool_use").expect("tool_use");
    assert_eq!(kinds[tool_use_at + 1], "auth_required");
    assert_eq!(kinds[tool_use_at + 2], "new_message");
    assert_eq!(kinds.last(), Some(&"end_turn"));
    assert_eq!(
        last_tool_result(&model),
        Value::String(AUTH_REQUIRED_MESSAGE.to_string())
    );
}

#[tokio::test]
async fn test_every_tool_result_is_persisted() {
    let model = ScriptedModel::new();
    model.push_message(tool_use_message(
        None,
        "toolu_1",
        SEARCH_TOOL,
        &json!({"query": "gold"}),
    ));
    model.push_message(tool_use_message(
        None,
        "toolu_2",
        SEARCH_TOOL,
        &json!({"query": "rose gold"}),
    ));
    model.push_message(text_message(&["Here you go."]));
    let tools = ScriptedTools::new(&[SEARCH_TOOL], &[]);
    tools.answer(SEARCH_TOOL, ToolAnswer::Content(search_result(&json!([]))));
    tools.answer(SEARCH_TOOL, ToolAnswer::Content(search_result(&json!([]))));
    let store = MemoryStore::new();

    run_turn(&model, &tools, &store, "gold rings").await;

    let stored = store
        .get_history(&ConversationId::new("conv-tools"))
        .await
        .expect("history");
    // user, (tool call, tool result) x 2, answer
    assert_eq!(stored.len(), 6);
    let tool_results = stored
        .iter()
        .filter(|m| {
            matches!(
                MessageContent::from_stored(&m.content),
                MessageContent::Blocks(blocks)
                    if matches!(blocks.first(), Some(ContentBlock::ToolResult { .. }))
            )
        })
        .count();
    assert_eq!(tool_results, 2);
}

#[tokio::test]
async fn test_runaway_tool_loop_ends_with_error() {
    let model = ScriptedModel::new();
    for i in 0..MAX_TOOL_ITERATIONS {
        model.push_message(tool_use_message(
            None,
            &format!("toolu_{i}"),
            SEARCH_TOOL,
            &json!({"query": "again"}),
        ));
    }
    let tools = ScriptedTools::new(&[SEARCH_TOOL], &[]);
    let store = MemoryStore::new();

    let events = run_turn(&model, &tools, &store, "loop forever").await;

    assert_eq!(kinds(&events).last(), Some(&"error"));
    assert!(!kinds(&events).contains(&"end_turn"));
    assert_eq!(model.calls().len(), MAX_TOOL_ITERATIONS);
}
