//! dgr-bot: Dangerous Goods Lookup Bot
//!
//! Main entry point.
//!
//! Usage:
//!   dgr-bot                   - Run the Telegram bot
//!   dgr-bot --config <path>   - Run with an explicit TOML configuration file
//!   dgr-bot --help            - Show help

use std::path::PathBuf;
use std::sync::Arc;

use dgr_core::{Config, SupabaseClient};
use dgr_telegram::{ConversationHandler, TelegramBot};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Run the bot, optionally with an explicit config file
    Run { config_path: Option<PathBuf> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("dgr-bot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Run { config_path } => config_path,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting dgr-bot...");
    tracing::info!(
        "Lookup timeout: {:?}, class list limit: {}",
        config.lookup_timeout(),
        config.lookup.class_list_limit
    );

    let lookup = SupabaseClient::new(&config.supabase, config.lookup_timeout())
        .map_err(|e| anyhow::anyhow!("Failed to create data store client: {}", e))?;

    let handler = Arc::new(ConversationHandler::new(Arc::new(lookup), &config.lookup));

    let bot = TelegramBot::new(&config.telegram.token, handler)
        .map_err(|e| anyhow::anyhow!("Failed to create Telegram bot: {}", e))?;

    tracing::info!("Bot is running. Press Ctrl+C to exit");

    bot.start(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Telegram bot error: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Run { config_path })
}

/// Print help message
fn print_help() {
    println!("dgr-bot - Dangerous goods lookup bot for Telegram");
    println!();
    println!("Usage:");
    println!("  dgr-bot                  Run the bot");
    println!("  dgr-bot --config <path>  Run with a TOML configuration file");
    println!("  dgr-bot --help           Show this help message");
    println!("  dgr-bot --version        Show version");
    println!();
    println!("Without --config, ./dgr-bot.toml is used when present.");
    println!();
    println!("Environment Variables:");
    println!("  TELEGRAM_BOT_TOKEN   Telegram bot token (required)");
    println!("  SUPABASE_URL         Supabase project URL (required)");
    println!("  SUPABASE_ANON_KEY    Supabase anon key (required)");
    println!("  LOOKUP_TIMEOUT_SECS  Per-lookup timeout in seconds (default: 10)");
    println!("  CLASS_LIST_LIMIT     Max classes per reply, 0 = no cap (default: 30)");
    println!("  RUST_LOG             Log filter (default: info)");
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received SIGINT"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM");
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
