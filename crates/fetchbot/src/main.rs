use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

use fetchcore::core::logging::{init_logger, log_startup_configuration};
use fetchcore::core::process::{ProcessRunner, TokioProcessRunner};
use fetchcore::core::utils::bytes_to_mb;
use fetchcore::download::quality::menu_heights;
use fetchcore::download::{classify, Executor, Planner, QualityChoice};
use fetchcore::{FetchService, Settings, SETTINGS};

mod cli;
mod telegram;

use cli::{Cli, Commands};
use telegram::{create_bot, schema, HandlerDeps, TelegramTransport};

/// Main entry point for the bot
///
/// Parses CLI arguments and dispatches to the matching subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation) or a CLI command fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from dispatcher tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        } else if let Some(msg) = panic_info.payload().downcast_ref::<String>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // .env must be loaded before SETTINGS is first touched
    let _ = dotenv();

    init_logger(&SETTINGS.log_level, &SETTINGS.log_file)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Probe { url, json }) => run_probe(url, json).await,
        Some(Commands::Download { url, quality, output }) => run_download(url, quality, output).await,
    }
}

fn settings() -> Arc<Settings> {
    Arc::new(SETTINGS.clone())
}

async fn run_bot() -> Result<()> {
    let settings = settings();
    log_startup_configuration(&settings);

    fs_err::create_dir_all(&settings.download_dir)?;

    let bot = create_bot(&settings)?;
    let transport = TelegramTransport::new(bot.clone(), !settings.bot_api_base_url.is_empty());
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
    let service = Arc::new(FetchService::new(settings, runner, Arc::new(transport)));

    match bot.get_me().await {
        Ok(me) => log::info!("Bot started as @{}", me.username()),
        Err(e) => log::warn!("get_me failed: {}", e),
    }

    let handler = schema(HandlerDeps::new(service));
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("An error from the dispatcher"))
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

async fn run_probe(url: String, json: bool) -> Result<()> {
    let settings = settings();
    fs_err::create_dir_all(&settings.download_dir)?;

    let classified = classify(&url);
    let planner = Planner::new(Arc::new(TokioProcessRunner), settings.clone());
    let plan = planner.precheck(&classified, settings.max_file_bytes()).await?;
    let heights = match (&plan.probe, classified.supports_quality_menu) {
        (Some(probe), true) => menu_heights(probe),
        _ => Vec::new(),
    };

    if json {
        let doc = serde_json::json!({
            "url": classified.url,
            "platform": classified.platform,
            "plan": plan,
            "menu_heights": heights,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("URL:       {}", classified.url);
    println!("Platform:  {}", classified.platform);
    println!("Mode:      {:?}", plan.mode);
    if !plan.title.is_empty() {
        println!("Title:     {}", plan.title);
    }
    if let Some(size) = plan.estimated_size {
        println!("Estimate:  {:.1} MB", bytes_to_mb(size));
    }
    if classified.supports_quality_menu {
        let labels: Vec<String> = heights.iter().map(|h| format!("{}p", h)).collect();
        println!("Menu:      best, mp3, {}", labels.join(", "));
    }
    Ok(())
}

async fn run_download(url: String, quality: String, output: Option<PathBuf>) -> Result<()> {
    let settings = settings();
    let choice = match QualityChoice::parse(&quality) {
        Some(QualityChoice::Cancel) | None => anyhow::bail!("Unknown quality '{}': use best, mp3 or e.g. 720p", quality),
        Some(choice) => choice,
    };
    let dest = output.unwrap_or_else(|| settings.download_dir.clone());
    fs_err::create_dir_all(&dest)?;

    let classified = classify(&url);
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
    let plan = Planner::new(runner.clone(), settings.clone())
        .precheck(&classified, settings.max_file_bytes())
        .await?;
    log::info!("Downloading {} ({:?}, {})", classified.url, plan.mode, choice);

    let files = Executor::new(runner, settings.clone())
        .execute(&classified, &plan, &dest, settings.max_file_bytes(), choice)
        .await?;

    for file in &files {
        println!("{}\t{}\t{:.1} MB", file.kind.as_ref(), file.path.display(), bytes_to_mb(file.size));
    }
    Ok(())
}
