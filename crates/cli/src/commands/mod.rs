//! CLI subcommands.

pub mod chat;
pub mod history;
pub mod migrate;

use url::Url;

use shop_chat_widget::WidgetConfig;
use shop_chat_widget::config::ConfigError;

/// Widget configuration from the environment, overridden by flags.
pub fn widget_config(
    app_url: Option<Url>,
    shop_id: Option<String>,
) -> Result<WidgetConfig, ConfigError> {
    let mut config = WidgetConfig::from_env()?;
    if let Some(app_url) = app_url {
        config.app_url = app_url;
    }
    if let Some(shop_id) = shop_id {
        config.shop_id = shop_id;
    }
    Ok(config)
}
