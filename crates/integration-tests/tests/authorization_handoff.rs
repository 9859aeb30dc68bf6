//! Customer authorization from the tool's 401 to the replayed request.
//!
//! Polling uses the default policy on paused time, so the full poll schedule
//! runs instantly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;

use shop_chat_core::ConversationId;

use shop_chat_integration_tests::{
    InProcessBackend, SEARCH_TOOL, ScriptedModel, ScriptedTools, ToolAnswer, text_message,
    tool_use_message,
};
use shop_chat_widget::auth::{AUTH_IN_PROGRESS_MESSAGE, AUTH_SUCCESS_MESSAGE, AUTH_TIMEOUT_MESSAGE};
use shop_chat_widget::config::PollPolicy;
use shop_chat_widget::testing::{RecordingPresenter, Rendered};
use shop_chat_widget::{ChatWidget, Session, WidgetConfig, WidgetOptions};

const ORDER_TOOL: &str = "get_order_status";
const QUESTION: &str = "Where is my order #1001?";

struct Harness {
    widget: ChatWidget<InProcessBackend, RecordingPresenter>,
    backend: Arc<InProcessBackend>,
    presenter: Arc<RecordingPresenter>,
    model: ScriptedModel,
}

fn harness() -> Harness {
    let model = ScriptedModel::new();
    let tools = ScriptedTools::new(&[SEARCH_TOOL, ORDER_TOOL], &[ORDER_TOOL]);
    let backend = Arc::new(InProcessBackend::new(model.clone(), tools));
    let presenter = Arc::new(RecordingPresenter::default());
    let config = WidgetConfig::new(Url::parse("http://127.0.0.1:3000").expect("url"));
    let widget = ChatWidget::new(config, Arc::clone(&backend), Arc::clone(&presenter));
    Harness {
        widget,
        backend,
        presenter,
        model,
    }
}

/// Script the unauthorized first turn: the tool is refused and the model
/// asks the customer to sign in.
fn script_refused_turn(model: &ScriptedModel) {
    model.push_message(tool_use_message(
        None,
        "toolu_1",
        ORDER_TOOL,
        &json!({"order": "1001"}),
    ));
    model.push_message(text_message(&["Please sign in so I can look up your order."]));
}

async fn wait_for_polling_to_stop(widget: &ChatWidget<InProcessBackend, RecordingPresenter>) {
    while widget.session().is_polling() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_authorized_customer_gets_the_request_replayed() {
    let h = harness();
    script_refused_turn(&h.model);
    h.model.push_message(tool_use_message(
        None,
        "toolu_2",
        ORDER_TOOL,
        &json!({"order": "1001"}),
    ));
    h.model.push_message(text_message(&["Your order #1001 shipped yesterday."]));
    h.backend.tools.answer(
        ORDER_TOOL,
        ToolAnswer::Content(json!([{"type": "text", "text": "{\"status\":\"shipped\"}"}])),
    );

    h.widget.send_text(QUESTION).await;

    assert_eq!(h.presenter.count(&Rendered::AuthorizationOpened), 1);
    assert!(
        h.presenter
            .assistant_messages()
            .contains(&AUTH_IN_PROGRESS_MESSAGE.to_string())
    );
    assert_eq!(h.widget.session().pending_message().as_deref(), Some(QUESTION));
    assert!(h.widget.session().is_polling());

    // The authorization callback stores the customer token
    let conversation_id = h.widget.session().conversation_id().expect("conversation");
    h.backend.authorize(&conversation_id).await;
    wait_for_polling_to_stop(&h.widget).await;

    let assistant = h.presenter.assistant_messages();
    let success_at = assistant
        .iter()
        .position(|m| m == AUTH_SUCCESS_MESSAGE)
        .expect("success message");
    assert_eq!(
        assistant.last(),
        Some(&"Your order #1001 shipped yesterday.".to_string())
    );
    assert!(success_at < assistant.len() - 1);

    // The question is replayed, not shown again
    assert_eq!(h.presenter.user_messages(), vec![QUESTION.to_string()]);
    assert_eq!(h.widget.session().pending_message(), None);

    let calls = h.backend.tools.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].authorized);
    assert!(calls[1].authorized);
    assert_eq!(h.model.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_polling_gives_up_and_keeps_the_question() {
    let h = harness();
    script_refused_turn(&h.model);

    h.widget.send_text(QUESTION).await;
    wait_for_polling_to_stop(&h.widget).await;

    assert_eq!(
        h.presenter.assistant_messages().last(),
        Some(&AUTH_TIMEOUT_MESSAGE.to_string())
    );
    assert_eq!(h.widget.session().pending_message().as_deref(), Some(QUESTION));
    assert!(!h.presenter.assistant_messages().contains(&AUTH_SUCCESS_MESSAGE.to_string()));
    assert_eq!(h.model.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_refusal_replaces_the_first_poller() {
    let h = harness();
    script_refused_turn(&h.model);
    script_refused_turn(&h.model);

    h.widget.send_text(QUESTION).await;
    h.widget.send_text("Actually, where is order #1002?").await;

    assert_eq!(h.presenter.count(&Rendered::AuthorizationOpened), 2);
    assert_eq!(
        h.widget.session().pending_message().as_deref(),
        Some("Actually, where is order #1002?")
    );

    wait_for_polling_to_stop(&h.widget).await;
    let timeouts = h
        .presenter
        .assistant_messages()
        .iter()
        .filter(|m| *m == AUTH_TIMEOUT_MESSAGE)
        .count();
    assert_eq!(timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_forgets_the_pending_request() {
    let h = harness();
    script_refused_turn(&h.model);

    h.widget.send_text(QUESTION).await;
    h.widget.reset();

    assert!(!h.widget.session().is_polling());
    assert!(h.widget.session().conversation_id().is_none());
    assert_eq!(h.widget.session().pending_message(), None);

    tokio::time::sleep(PollPolicy::default().initial_delay * 2).await;
    assert!(!h.presenter.assistant_messages().contains(&AUTH_TIMEOUT_MESSAGE.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_resumed_session_can_authorize() {
    let model = ScriptedModel::new();
    let tools = ScriptedTools::new(&[ORDER_TOOL], &[ORDER_TOOL]);
    let backend = Arc::new(InProcessBackend::new(model.clone(), tools));
    let presenter = Arc::new(RecordingPresenter::default());
    let config = WidgetConfig::new(Url::parse("http://127.0.0.1:3000").expect("url"));
    let widget = ChatWidget::with_options(
        config,
        Arc::clone(&backend),
        Arc::clone(&presenter),
        WidgetOptions {
            session: Session::with_conversation(ConversationId::new("conv-auth")),
            ..WidgetOptions::default()
        },
    );
    script_refused_turn(&model);
    model.push_message(text_message(&["Thanks for signing in!"]));

    widget.send_text(QUESTION).await;
    backend.authorize(&ConversationId::new("conv-auth")).await;
    wait_for_polling_to_stop(&widget).await;

    assert_eq!(
        presenter.assistant_messages().last(),
        Some(&"Thanks for signing in!".to_string())
    );
}
