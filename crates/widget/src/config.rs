//! Widget configuration.
//!
//! # Environment Variables
//!
//! - `SHOP_CHAT_APP_URL` - Chat server base URL (default: http://127.0.0.1:3000)
//! - `SHOP_CHAT_SHOP_ID` - Shop ID sent as `X-Shopify-Shop-Id`
//! - `SHOP_CHAT_PROMPT_TYPE` - System prompt variant (default: standardAssistant)
//! - `SHOP_CHAT_WELCOME_MESSAGE` - First assistant message of a new conversation

use std::time::Duration;

use thiserror::Error;
use url::Url;

use shop_chat_core::DEFAULT_PROMPT_TYPE;

const DEFAULT_APP_URL: &str = "http://127.0.0.1:3000";

/// Greeting shown when no conversation exists yet.
pub const DEFAULT_WELCOME_MESSAGE: &str = "👋 Hi there! How can I help you today?";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Widget configuration.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Chat server base URL
    pub app_url: Url,
    /// Shop ID forwarded to the server (empty to omit the header)
    pub shop_id: String,
    /// System prompt variant
    pub prompt_type: String,
    /// Greeting for new conversations
    pub welcome_message: String,
}

impl WidgetConfig {
    /// Configuration pointing at `app_url` with defaults for everything else.
    #[must_use]
    pub fn new(app_url: Url) -> Self {
        Self {
            app_url,
            shop_id: String::new(),
            prompt_type: DEFAULT_PROMPT_TYPE.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SHOP_CHAT_APP_URL` is not a valid URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_url = get_env_or_default("SHOP_CHAT_APP_URL", DEFAULT_APP_URL);
        let app_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOP_CHAT_APP_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            app_url,
            shop_id: get_env_or_default("SHOP_CHAT_SHOP_ID", ""),
            prompt_type: get_env_or_default("SHOP_CHAT_PROMPT_TYPE", DEFAULT_PROMPT_TYPE),
            welcome_message: get_env_or_default(
                "SHOP_CHAT_WELCOME_MESSAGE",
                DEFAULT_WELCOME_MESSAGE,
            ),
        })
    }
}

/// Timing of the authorization status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the first poll
    pub initial_delay: Duration,
    /// Delay between polls
    pub interval: Duration,
    /// Polls before giving up
    pub max_attempts: u32,
    /// Delay between a successful poll and replaying the pending message
    pub replay_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(10),
            max_attempts: 30,
            replay_delay: Duration::from_millis(500),
        }
    }
}

/// Timing of the scripted FAQ flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTiming {
    /// Delay between the visitor's selection and the next node
    pub reply_delay: Duration,
}

impl Default for FlowTiming {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(400),
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
