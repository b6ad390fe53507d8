//! Telegram side of the bot: client construction, transport and update handlers

pub mod bot;
pub mod handlers;
pub mod keyboard;
pub mod transport;

pub use bot::{create_bot, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use transport::TelegramTransport;
