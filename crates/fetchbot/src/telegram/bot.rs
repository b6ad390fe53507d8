//! Bot construction and the command list

use fetchcore::Settings;
use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "how to use the bot")]
    Start,
}

pub const START_TEXT: &str = "👋 Send me a link and I'll download it for you.\n\n\
Supported: YouTube, TikTok, Instagram (posts and reels), Pinterest and most other sites yt-dlp knows.\n\
For YouTube you'll get a quality menu; everything else starts right away.";

/// Creates a Bot instance with custom or default API URL
///
/// # Errors
/// Fails when the token is missing, the API URL does not parse or the HTTP client cannot be built.
pub fn create_bot(settings: &Settings) -> anyhow::Result<Bot> {
    if settings.bot_token.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }
    let client = ClientBuilder::new().timeout(settings.bot_session_timeout).build()?;
    let bot = Bot::with_client(settings.bot_token.clone(), client);

    if settings.bot_api_base_url.is_empty() {
        return Ok(bot);
    }
    log::info!("Using custom Bot API URL: {}", settings.bot_api_base_url);
    let url = url::Url::parse(&settings.bot_api_base_url)
        .map_err(|e| anyhow::anyhow!("Invalid BOT_API_BASE_URL: {}", e))?;
    Ok(bot.set_api_url(url))
}
