//! System prompt selection.

use askama::Template;

use shop_chat_core::DEFAULT_PROMPT_TYPE;

/// Prompt type for the upbeat variant.
pub const ENTHUSIASTIC_PROMPT_TYPE: &str = "enthusiasticAssistant";

const FALLBACK_PROMPT: &str = "You are a helpful shopping assistant.";

/// Default, concise assistant persona.
#[derive(Template)]
#[template(path = "prompts/standard_assistant.txt")]
struct StandardAssistantPrompt<'a> {
    shop_name: &'a str,
}

/// Upbeat assistant persona.
#[derive(Template)]
#[template(path = "prompts/enthusiastic_assistant.txt")]
struct EnthusiasticAssistantPrompt<'a> {
    shop_name: &'a str,
}

/// Render the system prompt for a `prompt_type`.
///
/// Unknown prompt types use the standard assistant.
#[must_use]
pub fn system_prompt(prompt_type: &str, shop_name: &str) -> String {
    let rendered = match prompt_type {
        ENTHUSIASTIC_PROMPT_TYPE => EnthusiasticAssistantPrompt { shop_name }.render(),
        DEFAULT_PROMPT_TYPE => StandardAssistantPrompt { shop_name }.render(),
        other => {
            tracing::debug!(prompt_type = other, "Unknown prompt type, using standard");
            StandardAssistantPrompt { shop_name }.render()
        }
    };

    rendered.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to render system prompt");
        String::from(FALLBACK_PROMPT)
    })
}
