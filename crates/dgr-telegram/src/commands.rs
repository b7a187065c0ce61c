//! Telegram bot commands and update endpoints
//!
//! The endpoints translate teloxide updates into [`Inbound`] events, hand
//! them to the [`ConversationHandler`] and send back whatever it replies.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Me, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

use crate::error::Result;
use crate::handler::{ConversationHandler, Inbound, Reply};
use crate::menu::Action;
use crate::session::ConversationKey;

/// Telegram bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Show the main menu")]
    Start,
    #[command(description = "Check a UN number")]
    Uncheck,
    #[command(description = "Show this help message")]
    Help,
}

/// Classify message text: a recognized `/command` wins over free text
pub fn message_event(text: &str, bot_name: &str) -> Inbound {
    match Command::parse(text, bot_name) {
        Ok(cmd) => Inbound::Command(cmd),
        Err(_) => Inbound::Text(text.to_string()),
    }
}

/// Handle an incoming message; only text is considered
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    me: Me,
    handler: Arc<ConversationHandler>,
) -> Result<()> {
    let (Some(key), Some(text)) = (message_key(&msg), msg.text()) else {
        debug!("Ignoring non-text message in chat {}", msg.chat.id);
        return Ok(());
    };

    if let Some(reply) = handler.handle(key, message_event(text, me.username())).await {
        send_reply(&bot, msg.chat.id, reply).await?;
    }
    Ok(())
}

/// Handle an inline keyboard button press
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    handler: Arc<ConversationHandler>,
) -> Result<()> {
    // Stop the client's loading indicator regardless of what follows.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query {}: {}", q.id, e);
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let action = match data.parse::<Action>() {
        Ok(action) => action,
        Err(_) => {
            warn!("Ignoring unknown callback data: {}", data);
            return Ok(());
        }
    };

    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));
    let key = ConversationKey::new(chat_id.0, q.from.id.0);

    if let Some(reply) = handler.handle(key, Inbound::Action(action)).await {
        send_reply(&bot, chat_id, reply).await?;
    }
    Ok(())
}

/// Conversation identity of a message; `None` for messages without a sender
fn message_key(msg: &Message) -> Option<ConversationKey> {
    msg.from
        .as_ref()
        .map(|user| ConversationKey::new(msg.chat.id.0, user.id.0))
}

/// Send a reply in HTML mode, attaching its menu if any
async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<()> {
    let mut request = bot.send_message(chat_id, reply.text).parse_mode(ParseMode::Html);
    if let Some(menu) = reply.menu {
        request = request.reply_markup(menu.keyboard());
    }
    request.await?;
    Ok(())
}
