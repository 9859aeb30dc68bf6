//! Application state shared across handlers.

use std::sync::Arc;

use crate::claude::ClaudeClient;
use crate::config::ServerConfig;
use crate::db::Store;
use crate::mcp::McpClient;
use crate::services::ToolResultRouter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Store,
    claude: ClaudeClient,
    mcp: McpClient,
    router: ToolResultRouter,
}

impl AppState {
    /// Build state from its parts.
    #[must_use]
    pub fn new(config: ServerConfig, store: Store, claude: ClaudeClient, mcp: McpClient) -> Self {
        let router = ToolResultRouter::from_config(config.mcp());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                claude,
                mcp,
                router,
            }),
        }
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Conversation store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Claude API client.
    #[must_use]
    pub fn claude(&self) -> &ClaudeClient {
        &self.inner.claude
    }

    /// Storefront tool client (anonymous scope).
    #[must_use]
    pub fn mcp(&self) -> &McpClient {
        &self.inner.mcp
    }

    /// Tool result router.
    #[must_use]
    pub fn router(&self) -> &ToolResultRouter {
        &self.inner.router
    }
}
