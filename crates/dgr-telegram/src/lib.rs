//! dgr-telegram: Telegram front-end for the DGR lookup bot
//!
//! Menus, commands and the session-gated conversation flow that turns
//! button presses and UN numbers into data-store lookups.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod menu;
pub mod session;

pub use bot::TelegramBot;
pub use commands::Command;
pub use error::{Result, TelegramError};
pub use handler::{ConversationHandler, Inbound, Reply};
pub use menu::{Action, Menu};
pub use session::{ConversationKey, ConversationSession, InMemorySessionStore};
