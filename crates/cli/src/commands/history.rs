//! Print a stored conversation.

use shop_chat_core::{ConversationId, MessageContent};
use shop_chat_widget::{ChatBackend, HttpBackend, WidgetConfig, WidgetError};

/// Print the visible messages of `conversation_id`, one per line.
#[allow(clippy::print_stdout)]
pub async fn print(config: &WidgetConfig, conversation_id: String) -> Result<(), WidgetError> {
    let backend = HttpBackend::new(config)?;
    let conversation_id = ConversationId::new(conversation_id);
    let messages = backend.history(&conversation_id).await?;

    if messages.is_empty() {
        println!("No messages in conversation {conversation_id}");
        return Ok(());
    }

    for message in &messages {
        let content = MessageContent::from_stored(&message.content);
        for text in content.visible_text() {
            println!("[{}] {}: {text}", message.created_at.format("%Y-%m-%d %H:%M"), message.role);
        }
    }
    Ok(())
}
