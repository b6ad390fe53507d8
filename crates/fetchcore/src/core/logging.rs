//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + optional file)
//! - A one-shot dump of the effective configuration at startup

use anyhow::Result;
use simplelog::*;
use std::path::Path;

use crate::core::config::Settings;

/// Parses a level name such as `INFO` or `debug`; unknown names fall back to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" | "critical" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logger for console output and, when `log_file_path` is non-empty, a log file.
///
/// The file is opened in append mode and its parent directory is created if missing.
pub fn init_logger(level: &str, log_file_path: &str) -> Result<()> {
    let level = parse_level(level);
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if !log_file_path.is_empty() {
        if let Some(parent) = Path::new(log_file_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file_path, e))?;
        loggers.push(WriteLogger::new(level, config, log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!(
        "BOT_START | download_dir={} api_base={} session_timeout={}s quality_ttl={}s delete_status={} delay={}s",
        settings.download_dir.display(),
        if settings.bot_api_base_url.is_empty() {
            "-"
        } else {
            settings.bot_api_base_url.as_str()
        },
        settings.bot_session_timeout.as_secs(),
        settings.quality_menu_ttl.as_secs(),
        settings.delete_status_on_success,
        settings.delete_status_delay.as_secs(),
    );
    log::info!(
        "LIMITS | max_file={}MB max_upload={}MB probe_timeout={:?} download_timeout={:?}",
        settings.max_file_mb,
        settings.max_upload_mb,
        settings.tools.probe_timeout,
        settings.tools.download_timeout,
    );
    log::info!(
        "TOOLS | yt-dlp={} gallery-dl={} impersonate={} ipv4={} player_client={} remote_components={}",
        settings.tools.ytdlp_bin,
        settings.tools.gallery_dl_bin,
        settings.tools.impersonate,
        settings.tools.force_ipv4,
        settings.tools.youtube_player_client,
        settings.tools.remote_components,
    );

    match &settings.cookies_file {
        Some(path) => log::info!("COOKIES | source={} (copied per job)", path.display()),
        None => log::warn!("COOKIES | no cookie source found; Instagram and age-gated downloads may fail"),
    }
}
