//! Argument lists for the external retrieval tools.
//!
//! Provides a fluent API for building yt-dlp invocations. Platform hardening is keyed
//! on [`Platform`] only, never on raw URL text.

use std::path::{Path, PathBuf};

use crate::core::config::ToolSettings;
use crate::download::planner::DownloadMode;
use crate::download::platform::{ClassifiedUrl, Platform};
use crate::download::quality::{format_selector, QualityChoice};

/// Desktop Chrome user agent sent to TikTok and Instagram.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const TIKTOK_REFERER: &str = "Referer:https://www.tiktok.com/";
const TIKTOK_ACCEPT_LANGUAGE: &str = "Accept-Language:en-US,en;q=0.9";

/// Output name template: job id prefix, running number, title, extension.
pub fn output_template(dest_dir: &Path, job_id: &str) -> String {
    dest_dir
        .join(format!("{}.%(autonumber)03d.%(title).200s.%(ext)s", job_id))
        .to_string_lossy()
        .into_owned()
}

/// Builder for yt-dlp argument lists.
///
/// # Example
///
/// ```ignore
/// let args = YtdlpArgsBuilder::new(&classified, &settings.tools)
///     .cookies(Some(cookie_copy))
///     .download(DownloadMode::Video, QualityChoice::Height(720), max_mb, &template);
/// ```
pub struct YtdlpArgsBuilder<'a> {
    classified: &'a ClassifiedUrl,
    tools: &'a ToolSettings,
    cookies: Option<PathBuf>,
}

impl<'a> YtdlpArgsBuilder<'a> {
    pub fn new(classified: &'a ClassifiedUrl, tools: &'a ToolSettings) -> Self {
        Self {
            classified,
            tools,
            cookies: None,
        }
    }

    /// Attach a writable cookie file.
    pub fn cookies(mut self, path: Option<PathBuf>) -> Self {
        self.cookies = path;
        self
    }

    /// Flags shared by probe and download: playlist policy, naming, platform hardening.
    fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let platform = self.classified.platform;

        // Posts may be carousels, so playlist expansion stays on for them.
        if platform != Platform::InstagramPost {
            args.push("--no-playlist".into());
        }
        args.extend(["--restrict-filenames".into(), "--no-progress".into()]);

        match platform {
            Platform::YouTube => {
                args.extend([
                    "--remote-components".into(),
                    self.tools.remote_components.clone(),
                    "--extractor-args".into(),
                    format!("youtube:player_client={}", self.tools.youtube_player_client),
                ]);
            }
            Platform::TikTok => {
                args.extend([
                    "--impersonate".into(),
                    self.tools.impersonate.clone(),
                    "--add-header".into(),
                    TIKTOK_REFERER.into(),
                    "--add-header".into(),
                    TIKTOK_ACCEPT_LANGUAGE.into(),
                    "--user-agent".into(),
                    DESKTOP_USER_AGENT.into(),
                ]);
                if self.tools.force_ipv4 {
                    args.push("-4".into());
                }
            }
            Platform::Instagram | Platform::InstagramPost => {
                args.extend([
                    "--sleep-requests".into(),
                    "2".into(),
                    "--sleep-interval".into(),
                    "2".into(),
                    "--max-sleep-interval".into(),
                    "4".into(),
                    "--user-agent".into(),
                    DESKTOP_USER_AGENT.into(),
                ]);
                if platform == Platform::InstagramPost {
                    args.extend(["--ignore-no-formats-error".into(), "--no-abort-on-error".into()]);
                }
            }
            Platform::Pinterest | Platform::Generic => {}
        }

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args
    }

    /// Metadata-only invocation printing one JSON document.
    pub fn probe(self) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "--dump-single-json".into(),
            "--skip-download".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            self.classified.url.clone(),
        ]);
        args
    }

    /// Payload invocation writing files that match `template`.
    ///
    /// `Best` deliberately carries no `-f`: an explicit filter would stop yt-dlp from
    /// merging the best separate streams on its own.
    /// Download invocation. The mp4 merge container is forced for video plans only.
    pub fn download(self, mode: DownloadMode, choice: QualityChoice, max_file_mb: u64, template: &str) -> Vec<String> {
        let mut args = self.base_args();

        match choice {
            QualityChoice::Mp3 => {
                args.extend([
                    "-f".into(),
                    "bestaudio/best".into(),
                    "-x".into(),
                    "--audio-format".into(),
                    "mp3".into(),
                    "--audio-quality".into(),
                    "0".into(),
                ]);
            }
            QualityChoice::Height(height) => {
                args.extend(["-f".into(), format_selector(height)]);
            }
            QualityChoice::Best | QualityChoice::Cancel => {}
        }

        args.extend(["--max-filesize".into(), format!("{}M", max_file_mb)]);
        if mode == DownloadMode::Video && choice != QualityChoice::Mp3 {
            args.extend(["--merge-output-format".into(), "mp4".into()]);
        }
        args.extend(["-o".into(), template.to_string(), self.classified.url.clone()]);
        args
    }
}

/// gallery-dl invocation into `dest_dir`.
pub fn gallery_dl_args(url: &str, dest_dir: &Path, cookies: Option<&Path>) -> Vec<String> {
    let mut args = vec!["-d".to_string(), dest_dir.to_string_lossy().into_owned()];
    if let Some(cookies) = cookies {
        args.push("--cookies".into());
        args.push(cookies.to_string_lossy().into_owned());
    }
    args.push(url.to_string());
    args
}
