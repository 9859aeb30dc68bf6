//! Shop Chat CLI - Terminal widget, history and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Chat with a running server from the terminal
//! shop-chat chat --app-url http://127.0.0.1:3000
//!
//! # Resume a conversation
//! shop-chat chat --conversation-id 5d0c...
//!
//! # Print the stored messages of a conversation
//! shop-chat history 5d0c...
//!
//! # Run database migrations
//! shop-chat migrate
//! ```
//!
//! # Commands
//!
//! - `chat` - Interactive chat through the widget engine
//! - `history` - Print a conversation's visible messages
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "shop-chat")]
#[command(author, version, about = "Shop Chat CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection options shared by the commands that talk to the server.
#[derive(clap::Args)]
struct ServerArgs {
    /// Chat server base URL (defaults to `SHOP_CHAT_APP_URL`)
    #[arg(long)]
    app_url: Option<Url>,

    /// Shop ID sent with chat requests
    #[arg(long)]
    shop_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant from the terminal
    Chat {
        #[command(flatten)]
        server: ServerArgs,

        /// Resume an existing conversation
        #[arg(long)]
        conversation_id: Option<String>,

        /// System prompt variant
        #[arg(long)]
        prompt_type: Option<String>,

        /// JSON file replacing the built-in FAQ flow
        #[arg(long)]
        flow: Option<PathBuf>,
    },
    /// Print the visible messages of a conversation
    History {
        #[command(flatten)]
        server: ServerArgs,

        /// Conversation to print
        conversation_id: String,
    },
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Chat {
            server,
            conversation_id,
            prompt_type,
            flow,
        } => {
            let mut config = commands::widget_config(server.app_url, server.shop_id)?;
            if let Some(prompt_type) = prompt_type {
                config.prompt_type = prompt_type;
            }
            commands::chat::run(config, conversation_id, flow).await?;
        }
        Commands::History {
            server,
            conversation_id,
        } => {
            let config = commands::widget_config(server.app_url, server.shop_id)?;
            commands::history::print(&config, conversation_id).await?;
        }
        Commands::Migrate => commands::migrate::run().await?,
    }
    Ok(())
}
