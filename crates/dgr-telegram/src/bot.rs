//! Telegram bot implementation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, info, warn};

use crate::commands::{handle_callback, handle_message, Command};
use crate::error::{Result, TelegramError};
use crate::handler::ConversationHandler;

/// Pause between shutdown attempts while the dispatcher is still starting
const SHUTDOWN_RETRY: Duration = Duration::from_millis(100);

/// Telegram bot wrapper
pub struct TelegramBot {
    bot: Bot,
    handler: Arc<ConversationHandler>,
}

impl TelegramBot {
    /// Create a new Telegram bot
    pub fn new(token: &str, handler: Arc<ConversationHandler>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(TelegramError::TokenNotSet);
        }

        Ok(Self {
            bot: Bot::new(token),
            handler,
        })
    }

    /// Run the bot until `shutdown` resolves.
    ///
    /// On shutdown the dispatcher stops polling for updates, lets in-flight
    /// handlers finish and releases its connection before this returns.
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting Telegram bot...");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register bot commands: {}", e);
        }

        let mut dispatcher = Dispatcher::builder(self.bot, schema())
            .dependencies(dptree::deps![self.handler])
            .default_handler(|update| async move {
                debug!("Unhandled update: {:?}", update.id);
            })
            .build();

        let token = dispatcher.shutdown_token();
        let stopper = tokio::spawn(stop_on(shutdown, move || token.shutdown().is_ok()));

        dispatcher.dispatch().await;
        stopper.abort();

        info!("Telegram bot stopped");
        Ok(())
    }
}

/// Wait for `shutdown`, then call `try_stop` until the dispatcher accepts.
///
/// A signal can land before the dispatcher is running, in which case the
/// request is refused and retried.
async fn stop_on<F, S>(shutdown: F, mut try_stop: S)
where
    F: Future<Output = ()>,
    S: FnMut() -> bool,
{
    shutdown.await;
    info!("Stopping Telegram bot...");

    while !try_stop() {
        debug!("Dispatcher not running yet, retrying shutdown");
        tokio::time::sleep(SHUTDOWN_RETRY).await;
    }
}

/// Update routing: messages (commands before free text), then button presses
pub fn schema() -> UpdateHandler<TelegramError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}
