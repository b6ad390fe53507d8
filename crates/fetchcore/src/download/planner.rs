//! Precheck: decide the retrieval strategy for a URL without downloading payload.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::config::{self, Settings};
use crate::core::process::{CommandSpec, ProcessRunner};
use crate::download::args::YtdlpArgsBuilder;
use crate::download::cookies::{prepare_cookie_copy, remove_cookie_copy};
use crate::download::error::DownloadError;
use crate::download::platform::{ClassifiedUrl, Platform};
use crate::download::quality::new_token;

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    Video,
    Photo,
    Gallery,
}

/// Result of prechecking one URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadPlan {
    pub mode: DownloadMode,
    pub title: String,
    pub description: String,
    /// Probe document; only present when a probe actually ran
    #[serde(skip)]
    pub probe: Option<Value>,
    pub estimated_size: Option<u64>,
}

impl DownloadPlan {
    fn unprobed(mode: DownloadMode) -> Self {
        Self {
            mode,
            title: String::new(),
            description: String::new(),
            probe: None,
            estimated_size: None,
        }
    }

    /// Video plan rebuilt from a pending choice, without probing again.
    pub fn resumed(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            mode: DownloadMode::Video,
            title: title.into(),
            description: description.into(),
            probe: None,
            estimated_size: None,
        }
    }
}

/// Parses the first JSON object in tool output.
///
/// Tries the first line as a whole object, then falls back to the span between the
/// first `{` and the last `}` to get past leading log noise.
pub fn load_first_json(output: &str) -> Result<Value, DownloadError> {
    let text = output.trim();
    if let Some(first_line) = text.lines().next() {
        let line = first_line.trim();
        if line.starts_with('{') && line.ends_with('}') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(line) {
                return Ok(value);
            }
        }
    }

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(DownloadError::Probe("no JSON object in probe output".to_string()));
    };
    if end < start {
        return Err(DownloadError::Probe("no JSON object in probe output".to_string()));
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(DownloadError::Probe("probe output is not a JSON object".to_string())),
        Err(e) => Err(DownloadError::Probe(e.to_string())),
    }
}

fn positive_size(doc: &Value, key: &str) -> Option<u64> {
    let size = match doc.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as u64)),
        _ => None,
    };
    size.filter(|size| *size > 0)
}

/// Size estimate: `filesize`, then `filesize_approx`, then the same keys on each
/// entry of `requested_downloads`. First positive integer wins.
pub fn estimated_size(probe: &Value) -> Option<u64> {
    const KEYS: [&str; 2] = ["filesize", "filesize_approx"];

    if let Some(size) = KEYS.iter().find_map(|key| positive_size(probe, key)) {
        return Some(size);
    }

    probe
        .get("requested_downloads")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|entry| KEYS.iter().find_map(|key| positive_size(entry, key)))
}

fn text_field(probe: &Value, key: &str) -> String {
    probe.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Produces [`DownloadPlan`]s, probing with yt-dlp where that is reliable.
pub struct Planner {
    runner: Arc<dyn ProcessRunner>,
    settings: Arc<Settings>,
}

impl Planner {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: Arc<Settings>) -> Self {
        Self { runner, settings }
    }

    /// Plans `classified`, failing when the estimated size exceeds `max_bytes`.
    pub async fn precheck(&self, classified: &ClassifiedUrl, max_bytes: u64) -> Result<DownloadPlan, DownloadError> {
        match classified.platform {
            Platform::InstagramPost => {
                log::info!("PRECHECK | skip probe | instagram post -> photo");
                return Ok(DownloadPlan::unprobed(DownloadMode::Photo));
            }
            Platform::Pinterest => {
                log::info!("PRECHECK | skip probe | pinterest -> gallery");
                return Ok(DownloadPlan::unprobed(DownloadMode::Gallery));
            }
            Platform::TikTok => {
                log::info!("PRECHECK | skip probe | tiktok -> video");
                return Ok(DownloadPlan::unprobed(DownloadMode::Video));
            }
            Platform::Instagram | Platform::YouTube | Platform::Generic => {}
        }

        let probe_id = format!("probe_{}", new_token());
        let cookie_copy = prepare_cookie_copy(
            self.settings.cookies_file.as_deref(),
            &self.settings.download_dir,
            &probe_id,
        )
        .await;

        let result = self.run_probe(classified, cookie_copy.clone(), max_bytes).await;
        remove_cookie_copy(cookie_copy.as_deref()).await;
        result
    }

    async fn run_probe(
        &self,
        classified: &ClassifiedUrl,
        cookies: Option<PathBuf>,
        max_bytes: u64,
    ) -> Result<DownloadPlan, DownloadError> {
        let args = YtdlpArgsBuilder::new(classified, &self.settings.tools)
            .cookies(cookies)
            .probe();
        let spec = CommandSpec::new(&self.settings.tools.ytdlp_bin, args).timeout(self.settings.tools.probe_timeout);

        log::info!("PRECHECK | probe | platform={} url={}", classified.platform, classified.url);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            let diagnostic = output.diagnostic_tail(config::diagnostics::TAIL_CHARS);
            log::warn!("PRECHECK | probe failed | code={} | {}", output.code, diagnostic);
            return Err(DownloadError::from_output(&spec.tool_name(), &output));
        }

        let probe = load_first_json(&output.stdout)?;
        let size = estimated_size(&probe);
        if let Some(size) = size {
            if size > max_bytes {
                log::warn!("PRECHECK | too large | estimate={} limit={}", size, max_bytes);
                return Err(DownloadError::estimate_too_large(size, max_bytes));
            }
        }

        let plan = DownloadPlan {
            mode: DownloadMode::Video,
            title: text_field(&probe, "title"),
            description: text_field(&probe, "description"),
            probe: Some(probe),
            estimated_size: size,
        };
        log::info!(
            "PRECHECK | ok | title={:?} estimate={:?}",
            plan.title,
            plan.estimated_size
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_load_first_json_single_line() {
        let value = load_first_json("{\"title\": \"a\"}\n").unwrap();
        assert_eq!(value["title"], "a");
    }

    #[test]
    fn test_load_first_json_skips_leading_noise() {
        let output = "[youtube] Extracting URL\nWARNING: something\n{\"title\": \"b\",\n \"id\": 1}\ntrailing";
        let value = load_first_json(output).unwrap();
        assert_eq!(value["title"], "b");
    }

    #[test]
    fn test_load_first_json_rejects_garbage() {
        assert!(matches!(load_first_json("nothing here"), Err(DownloadError::Probe(_))));
        assert!(matches!(load_first_json("} {"), Err(DownloadError::Probe(_))));
        assert!(matches!(load_first_json("{broken"), Err(DownloadError::Probe(_))));
    }

    #[test]
    fn test_estimated_size_priority() {
        assert_eq!(estimated_size(&json!({"filesize": 10, "filesize_approx": 20})), Some(10));
        assert_eq!(estimated_size(&json!({"filesize": null, "filesize_approx": 20})), Some(20));
        assert_eq!(
            estimated_size(&json!({"filesize": 0, "requested_downloads": [{"filesize_approx": 30}, {"filesize": 40}]})),
            Some(30)
        );
        assert_eq!(
            estimated_size(&json!({"requested_downloads": [{"filesize": -1}, {"filesize": 50}]})),
            Some(50)
        );
        assert_eq!(estimated_size(&json!({"title": "x"})), None);
        assert_eq!(estimated_size(&json!({"filesize": 1.5e3})), Some(1500));
    }

    #[test]
    fn test_resumed_plan_is_video_without_probe() {
        let plan = DownloadPlan::resumed("T", "D");
        assert_eq!(plan.mode, DownloadMode::Video);
        assert!(plan.probe.is_none());
        assert_eq!(plan.title, "T");
    }
}
