//! Interactive terminal chat.
//!
//! Typed lines go to the assistant. While the FAQ flow is showing options,
//! a number picks the matching option instead. `/reset` starts a new
//! conversation and `/quit` exits.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use shop_chat_core::{ChatRole, ConversationId, DisplayProduct};
use shop_chat_widget::flow::{FlowGraph, FlowGraphError, QuickReply, faq_graph};
use shop_chat_widget::{
    ChatWidget, HttpBackend, Presenter, Session, WidgetConfig, WidgetError, WidgetOptions,
};

/// Terminal chat failures.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to read flow file: {0}")]
    FlowFile(#[source] std::io::Error),

    #[error("Invalid flow: {0}")]
    Flow(#[from] FlowGraphError),

    #[error(transparent)]
    Widget(#[from] WidgetError),

    #[error("Terminal error: {0}")]
    Io(#[from] std::io::Error),
}

/// Presenter writing bubbles and options to stdout.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    busy: Mutex<bool>,
}

#[allow(clippy::print_stdout)]
impl TerminalPresenter {
    fn print_options(replies: &[QuickReply]) {
        for (index, reply) in replies.iter().enumerate() {
            println!("  [{}] {}", index + 1, reply.label);
        }
    }

    fn set_busy(&self, busy: bool) -> bool {
        let mut current = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, busy)
    }
}

#[allow(clippy::print_stdout)]
impl Presenter for TerminalPresenter {
    fn render_message(&self, role: ChatRole, text: &str) {
        let speaker = match role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        println!("{speaker}> {text}");
    }

    fn show_busy(&self) {
        if !self.set_busy(true) {
            print!("...");
            let _ = std::io::stdout().flush();
        }
    }

    fn hide_busy(&self) {
        if self.set_busy(false) {
            println!();
        }
    }

    fn show_products(&self, products: &[DisplayProduct]) {
        for product in products {
            println!("  * {} ({})", product.title, product.price);
            if !product.url.is_empty() {
                println!("    {}", product.url);
            }
        }
    }

    fn open_authorization(&self) {
        println!("Sign in to your store account in the browser to continue.");
    }

    fn show_starters(&self, starters: &[QuickReply]) {
        Self::print_options(starters);
    }

    fn hide_starters(&self) {}

    fn show_quick_replies(&self, replies: &[QuickReply]) {
        Self::print_options(replies);
    }

    fn clear_quick_replies(&self) {}
}

/// Run the chat loop until `/quit` or end of input.
pub async fn run(
    config: WidgetConfig,
    conversation_id: Option<String>,
    flow: Option<PathBuf>,
) -> Result<(), ChatError> {
    let flow = match flow {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(ChatError::FlowFile)?;
            FlowGraph::from_json(&raw)?
        }
        None => faq_graph(),
    };
    let session = conversation_id.map_or_else(Session::new, |id| {
        Session::with_conversation(ConversationId::new(id))
    });

    let backend = Arc::new(HttpBackend::new(&config)?);
    let presenter = Arc::new(TerminalPresenter::default());
    let options = WidgetOptions {
        session,
        flow,
        ..WidgetOptions::default()
    };
    let widget = ChatWidget::with_options(config, backend, presenter, options);

    tracing::info!(app_url = %widget.config().app_url, "Opening chat");
    widget.open().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line, widget.flow().is_active()) {
            Input::Quit => break,
            Input::Reset => {
                widget.reset();
                widget.open().await;
            }
            Input::Select(index) => {
                if !widget.select(index).await {
                    tracing::debug!(index, "Selection ignored");
                }
            }
            Input::Text(text) => {
                if let Some(outcome) = widget.send_text(&text).await {
                    tracing::debug!(?outcome, "Turn finished");
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Reset,
    Select(usize),
    Text(String),
}

fn parse_input(line: &str, flow_active: bool) -> Input {
    let line = line.trim();
    match line {
        "/quit" | "/exit" => return Input::Quit,
        "/reset" => return Input::Reset,
        _ => {}
    }
    match line.parse::<usize>() {
        Ok(choice) if flow_active && choice > 0 => Input::Select(choice - 1),
        _ => Input::Text(line.to_string()),
    }
}
