//! Runtime configuration read from the environment, plus fixed limits.

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-wide settings, read once from the environment on first access.
///
/// `.env` is loaded by the binary before this is touched, so values from it are visible here.
pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

/// Cookie file mounted as a Docker secret; used when `YTDLP_COOKIES` is not set.
pub const DEFAULT_COOKIES_SECRET: &str = "/run/secrets/cookies.txt";

/// Caption configuration
pub mod caption {
    /// Maximum caption length in characters (Telegram limit for media captions)
    pub const MAX_LEN: usize = 1024;

    /// Marker appended to a truncated caption
    pub const ELLIPSIS: char = '…';
}

/// External tool diagnostics configuration
pub mod diagnostics {
    /// How many trailing characters of tool output are surfaced to the user
    pub const TAIL_CHARS: usize = 1200;
}

/// Delivery configuration
pub mod delivery {
    /// Telegram refuses media groups larger than this
    pub const MEDIA_GROUP_LIMIT: usize = 10;
}

/// Quality menu configuration
pub mod quality {
    /// Heights offered in the menu, in display order
    pub const PREFERRED_HEIGHTS: [u32; 4] = [1080, 720, 480, 360];
}

/// Flags and headers handed to the external retrieval tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// yt-dlp binary (`YTDL_BIN`)
    pub ytdlp_bin: String,
    /// gallery-dl binary (`GALLERY_DL_BIN`)
    pub gallery_dl_bin: String,
    /// Browser fingerprint for `--impersonate` on TikTok (`YTDLP_IMPERSONATE`)
    pub impersonate: String,
    /// Force IPv4 on TikTok (`YTDLP_FORCE_IPV4`)
    pub force_ipv4: bool,
    /// Ordered YouTube player clients (`YTDLP_YOUTUBE_PLAYER_CLIENT`)
    pub youtube_player_client: String,
    /// Remote components needed for YouTube script execution (`YTDLP_REMOTE_COMPONENTS`)
    pub remote_components: String,
    /// Metadata probe timeout; `None` disables it (`YTDLP_PROBE_TIMEOUT_SEC`)
    pub probe_timeout: Option<Duration>,
    /// Payload download timeout; `None` disables it (`DOWNLOAD_TIMEOUT_SEC`)
    pub download_timeout: Option<Duration>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp_bin: "yt-dlp".to_string(),
            gallery_dl_bin: "gallery-dl".to_string(),
            impersonate: "chrome".to_string(),
            force_ipv4: true,
            youtube_player_client: "web_embedded,web,tv".to_string(),
            remote_components: "ejs:github".to_string(),
            probe_timeout: Some(Duration::from_secs(120)),
            download_timeout: Some(Duration::from_secs(1800)),
        }
    }
}

/// Bot configuration.
///
/// Tolerant parsing: unset, blank or unparsable variables fall back to the defaults below.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bot token (`BOT_TOKEN`, falls back to `TELOXIDE_TOKEN`)
    pub bot_token: String,
    /// Working directory for downloads (`DOWNLOAD_DIR`, default `/data`)
    pub download_dir: PathBuf,
    /// Download-time ceiling in MB (`MAX_FILE_MB`, default 1900)
    pub max_file_mb: u64,
    /// Per-file delivery ceiling in MB (`TG_MAX_UPLOAD_MB`, default 1900)
    pub max_upload_mb: u64,
    /// Log level name (`LOG_LEVEL`, default `INFO`)
    pub log_level: String,
    /// Log file path; empty disables file logging (`LOG_FILE`, default `/app/bot.log`)
    pub log_file: String,
    /// Local Bot API server; empty means the public API (`BOT_API_BASE_URL`)
    pub bot_api_base_url: String,
    /// HTTP client timeout for Bot API requests (`BOT_SESSION_TIMEOUT`, default 600s)
    pub bot_session_timeout: Duration,
    /// Lifetime of a quality menu (`QUALITY_MENU_TTL_SEC`, default 600s)
    pub quality_menu_ttl: Duration,
    /// Delete the status message after a successful job (`DELETE_STATUS_ON_SUCCESS`)
    pub delete_status_on_success: bool,
    /// Delay before that deletion (`DELETE_STATUS_DELAY_SEC`, default 2s)
    pub delete_status_delay: Duration,
    /// Read-only cookie source (`YTDLP_COOKIES`, else the Docker secret if present)
    pub cookies_file: Option<PathBuf>,
    pub tools: ToolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            download_dir: PathBuf::from("/data"),
            max_file_mb: 1900,
            max_upload_mb: 1900,
            log_level: "INFO".to_string(),
            log_file: "/app/bot.log".to_string(),
            bot_api_base_url: String::new(),
            bot_session_timeout: Duration::from_secs(600),
            quality_menu_ttl: Duration::from_secs(600),
            delete_status_on_success: true,
            delete_status_delay: Duration::from_secs(2),
            cookies_file: None,
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Builds settings from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tool_defaults = ToolSettings::default();

        let download_dir = env_str("DOWNLOAD_DIR")
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned()))
            .unwrap_or(defaults.download_dir);

        Self {
            bot_token: env_str("BOT_TOKEN")
                .or_else(|| env_str("TELOXIDE_TOKEN"))
                .unwrap_or_default(),
            download_dir,
            max_file_mb: env_u64("MAX_FILE_MB").unwrap_or(defaults.max_file_mb),
            max_upload_mb: env_u64("TG_MAX_UPLOAD_MB").unwrap_or(defaults.max_upload_mb),
            log_level: env_str("LOG_LEVEL").unwrap_or(defaults.log_level),
            // An explicitly empty LOG_FILE disables file logging, so read it raw.
            log_file: env::var("LOG_FILE").map(|v| v.trim().to_string()).unwrap_or(defaults.log_file),
            bot_api_base_url: env_str("BOT_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            bot_session_timeout: env_u64("BOT_SESSION_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.bot_session_timeout),
            quality_menu_ttl: env_u64("QUALITY_MENU_TTL_SEC")
                .map(Duration::from_secs)
                .unwrap_or(defaults.quality_menu_ttl),
            delete_status_on_success: env_bool("DELETE_STATUS_ON_SUCCESS").unwrap_or(defaults.delete_status_on_success),
            delete_status_delay: env_u64("DELETE_STATUS_DELAY_SEC")
                .map(Duration::from_secs)
                .unwrap_or(defaults.delete_status_delay),
            cookies_file: resolve_cookies_source(env_str("YTDLP_COOKIES").as_deref(), Path::new(DEFAULT_COOKIES_SECRET)),
            tools: ToolSettings {
                ytdlp_bin: env_str("YTDL_BIN").unwrap_or(tool_defaults.ytdlp_bin),
                gallery_dl_bin: env_str("GALLERY_DL_BIN").unwrap_or(tool_defaults.gallery_dl_bin),
                impersonate: env_str("YTDLP_IMPERSONATE").unwrap_or(tool_defaults.impersonate),
                force_ipv4: env_bool("YTDLP_FORCE_IPV4").unwrap_or(tool_defaults.force_ipv4),
                youtube_player_client: env_str("YTDLP_YOUTUBE_PLAYER_CLIENT")
                    .unwrap_or(tool_defaults.youtube_player_client),
                remote_components: env_str("YTDLP_REMOTE_COMPONENTS").unwrap_or(tool_defaults.remote_components),
                probe_timeout: env_u64("YTDLP_PROBE_TIMEOUT_SEC")
                    .map(timeout_from_secs)
                    .unwrap_or(tool_defaults.probe_timeout),
                download_timeout: env_u64("DOWNLOAD_TIMEOUT_SEC")
                    .map(timeout_from_secs)
                    .unwrap_or(tool_defaults.download_timeout),
            },
        }
    }

    /// Download-time ceiling in bytes.
    pub fn max_file_bytes(&self) -> u64 {
        mb_to_bytes(self.max_file_mb)
    }

    /// Per-file delivery ceiling in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        mb_to_bytes(self.max_upload_mb)
    }
}

pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Picks the cookie source: an explicit path wins (only if it exists), else the fallback secret.
pub fn resolve_cookies_source(explicit: Option<&str>, fallback: &Path) -> Option<PathBuf> {
    if let Some(raw) = explicit {
        let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
        return path.exists().then_some(path);
    }
    fallback.exists().then(|| fallback.to_path_buf())
}

fn env_str(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(name: &str) -> Option<u64> {
    env_str(name).and_then(|value| value.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    env_str(name).map(|value| parse_bool(&value))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "y", "On"] {
            assert!(parse_bool(value), "{value} should be truthy");
        }
        for value in ["0", "false", "no", "off", "maybe"] {
            assert!(!parse_bool(value), "{value} should be falsy");
        }
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.max_file_mb, 1900);
        assert_eq!(settings.max_upload_bytes(), 1900 * 1024 * 1024);
        assert_eq!(settings.quality_menu_ttl, Duration::from_secs(600));
        assert_eq!(settings.tools.youtube_player_client, "web_embedded,web,tv");
        assert_eq!(settings.tools.remote_components, "ejs:github");
        assert!(settings.tools.force_ipv4);
    }

    #[test]
    fn test_timeout_zero_disables() {
        assert_eq!(timeout_from_secs(0), None);
        assert_eq!(timeout_from_secs(5), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_resolve_cookies_source_prefers_existing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("cookies.txt");
        let fallback = dir.path().join("secret.txt");
        std::fs::write(&explicit, "# Netscape HTTP Cookie File").unwrap();
        std::fs::write(&fallback, "# Netscape HTTP Cookie File").unwrap();

        let resolved = resolve_cookies_source(explicit.to_str(), &fallback);
        assert_eq!(resolved, Some(explicit));
    }

    #[test]
    fn test_resolve_cookies_source_missing_explicit_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("secret.txt");
        std::fs::write(&fallback, "").unwrap();

        let missing = dir.path().join("nope.txt");
        assert_eq!(resolve_cookies_source(missing.to_str(), &fallback), None);
        assert_eq!(resolve_cookies_source(None, &fallback), Some(fallback));
    }
}
