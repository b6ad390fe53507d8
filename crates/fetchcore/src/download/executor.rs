//! Download execution.
//!
//! yt-dlp is the primary tool. gallery-dl handles gallery plans and is the fallback
//! when yt-dlp reports no formats for a post or pin. Whatever the outcome, partial
//! output and cookie copies of a failed job are removed before returning.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::{self, Settings};
use crate::core::process::{CommandSpec, ProcessRunner};
use crate::delivery::classify::MediaKind;
use crate::download::args::{gallery_dl_args, output_template, YtdlpArgsBuilder};
use crate::download::cookies::{prepare_cookie_copy, remove_cookie_copy};
use crate::download::error::DownloadError;
use crate::download::planner::{DownloadMode, DownloadPlan};
use crate::download::platform::{ClassifiedUrl, Platform};
use crate::download::quality::{new_token, QualityChoice};

/// Extensions collected from a gallery-dl tree.
const GALLERY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "mp4", "mov", "webm", "mkv"];

/// Leftovers yt-dlp writes next to the output and that are never media.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// A file produced by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub size: u64,
    /// gallery-dl job directory this file lives in; removed together with its last file
    pub job_dir: Option<PathBuf>,
}

impl RetrievedFile {
    async fn from_path(path: PathBuf, job_dir: Option<&Path>) -> io::Result<Self> {
        let size = fs_err::tokio::metadata(&path).await?.len();
        Ok(Self {
            kind: MediaKind::from_path(&path),
            size,
            job_dir: job_dir.map(Path::to_path_buf),
            path,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Runs the retrieval tools for a plan.
pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
    settings: Arc<Settings>,
}

impl Executor {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: Arc<Settings>) -> Self {
        Self { runner, settings }
    }

    /// Retrieves the media behind `classified` into `dest_dir`.
    ///
    /// `choice` matters for video and photo plans only; gallery plans ignore it.
    pub async fn execute(
        &self,
        classified: &ClassifiedUrl,
        plan: &DownloadPlan,
        dest_dir: &Path,
        max_bytes: u64,
        choice: QualityChoice,
    ) -> Result<Vec<RetrievedFile>, DownloadError> {
        fs_err::tokio::create_dir_all(dest_dir)
            .await
            .map_err(|e| DownloadError::NothingFound(format!("cannot prepare download directory: {}", e)))?;

        if plan.mode == DownloadMode::Gallery {
            return self.run_gallery(&classified.url, dest_dir, max_bytes).await;
        }

        match self.run_ytdlp(classified, plan.mode, dest_dir, max_bytes, choice).await {
            Err(DownloadError::NoFormats { tool, code, .. }) if classified.platform.allows_gallery_fallback() => {
                log::warn!(
                    "YTDLP | {} exited {} with no formats for {} | falling back to gallery-dl",
                    tool,
                    code,
                    classified.platform
                );
                self.run_gallery(&classified.url, dest_dir, max_bytes).await
            }
            other => other,
        }
    }

    async fn run_ytdlp(
        &self,
        classified: &ClassifiedUrl,
        mode: DownloadMode,
        dest_dir: &Path,
        max_bytes: u64,
        choice: QualityChoice,
    ) -> Result<Vec<RetrievedFile>, DownloadError> {
        let tools = &self.settings.tools;
        let job_id = new_token();

        if classified.platform == Platform::TikTok {
            self.log_tool_version().await;
        }

        let cookies = prepare_cookie_copy(self.settings.cookies_file.as_deref(), dest_dir, &job_id).await;
        let template = output_template(dest_dir, &job_id);
        let max_mb = (max_bytes / (1024 * 1024)).max(1);
        let args = YtdlpArgsBuilder::new(classified, tools)
            .cookies(cookies.clone())
            .download(mode, choice, max_mb, &template);
        let spec = CommandSpec::new(&tools.ytdlp_bin, args).timeout(tools.download_timeout);

        log::info!(
            "YTDLP | start | job={} platform={} mode={:?} choice={} url={}",
            job_id,
            classified.platform,
            mode,
            choice,
            classified.url
        );
        let result = self.runner.run(&spec).await;
        remove_cookie_copy(cookies.as_deref()).await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                remove_paths(&find_job_files(dest_dir, &job_id, true).await).await;
                return Err(e);
            }
        };

        if !output.success() {
            remove_paths(&find_job_files(dest_dir, &job_id, true).await).await;
            let diagnostic = output.diagnostic_tail(config::diagnostics::TAIL_CHARS);
            log::error!("YTDLP | failed | job={} code={} | {}", job_id, output.code, diagnostic);
            return Err(DownloadError::from_output(&spec.tool_name(), &output));
        }

        let paths = find_job_files(dest_dir, &job_id, false).await;
        if paths.is_empty() {
            remove_paths(&find_job_files(dest_dir, &job_id, true).await).await;
            return Err(DownloadError::NothingFound(
                "yt-dlp finished but produced no files".to_string(),
            ));
        }

        let files = self.finish(paths, None, max_bytes).await?;
        log::info!("YTDLP | done | job={} files={}", job_id, files.len());
        Ok(files)
    }

    async fn run_gallery(&self, url: &str, dest_dir: &Path, max_bytes: u64) -> Result<Vec<RetrievedFile>, DownloadError> {
        let tools = &self.settings.tools;
        let job_id = new_token();
        let job_dir = dest_dir.join(format!("gdl_{}", job_id));
        fs_err::tokio::create_dir_all(&job_dir)
            .await
            .map_err(|e| DownloadError::NothingFound(format!("cannot prepare gallery directory: {}", e)))?;

        let cookies = prepare_cookie_copy(self.settings.cookies_file.as_deref(), &job_dir, &job_id).await;
        let spec = CommandSpec::new(
            &tools.gallery_dl_bin,
            gallery_dl_args(url, &job_dir, cookies.as_deref()),
        )
        .timeout(tools.download_timeout);

        log::info!("GALLERY_DL | start | dir={} url={}", job_dir.display(), url);
        let result = self.runner.run(&spec).await;
        remove_cookie_copy(cookies.as_deref()).await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                remove_dir(&job_dir).await;
                return Err(e);
            }
        };

        if !output.success() {
            remove_dir(&job_dir).await;
            let diagnostic = output.diagnostic_tail(config::diagnostics::TAIL_CHARS);
            log::error!("GALLERY_DL | failed | code={} | {}", output.code, diagnostic);
            return Err(DownloadError::from_output(&spec.tool_name(), &output));
        }

        let paths = find_gallery_files(&job_dir).await;
        if paths.is_empty() {
            remove_dir(&job_dir).await;
            return Err(DownloadError::NothingFound(
                "gallery-dl finished but no media was found".to_string(),
            ));
        }

        match self.finish(paths, Some(&job_dir), max_bytes).await {
            Ok(files) => {
                log::info!("GALLERY_DL | done | files={}", files.len());
                Ok(files)
            }
            Err(e) => {
                remove_dir(&job_dir).await;
                Err(e)
            }
        }
    }

    /// Stats the produced files and enforces the download ceiling on each of them.
    async fn finish(
        &self,
        paths: Vec<PathBuf>,
        job_dir: Option<&Path>,
        max_bytes: u64,
    ) -> Result<Vec<RetrievedFile>, DownloadError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            match RetrievedFile::from_path(path.clone(), job_dir).await {
                Ok(file) => files.push(file),
                Err(e) => {
                    remove_paths(&paths).await;
                    return Err(DownloadError::NothingFound(format!("cannot read {}: {}", path.display(), e)));
                }
            }
        }

        if let Some(big) = files.iter().find(|f| f.size > max_bytes) {
            let err = DownloadError::file_too_large(&big.file_name(), big.size, max_bytes);
            remove_paths(&paths).await;
            return Err(err);
        }
        Ok(files)
    }

    /// Best-effort version line before TikTok downloads, which break most often.
    async fn log_tool_version(&self) {
        let tools = &self.settings.tools;
        let spec = CommandSpec::new(&tools.ytdlp_bin, vec!["--version".to_string()]).timeout(tools.probe_timeout);
        match self.runner.run(&spec).await {
            Ok(output) => log::info!(
                "YTDLP | version={} impersonate={} ipv4={}",
                output.stdout.trim(),
                tools.impersonate,
                tools.force_ipv4
            ),
            Err(e) => log::warn!("YTDLP | version check failed: {}", e),
        }
    }
}

/// Files whose name starts with `<job_id>.`, directly in `dir` or one level deeper.
///
/// With `include_partial` leftovers such as `.part` files are returned too, for cleanup.
pub async fn find_job_files(dir: &Path, job_id: &str, include_partial: bool) -> Vec<PathBuf> {
    let prefix = format!("{}.", job_id);
    let mut found = Vec::new();

    let mut dirs = vec![dir.to_path_buf()];
    for subdir in list_dir(dir).await.into_iter().filter(|p| p.is_dir()) {
        dirs.push(subdir);
    }

    for d in dirs {
        for path in list_dir(&d).await {
            let name = match path.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };
            if !name.starts_with(&prefix) || !path.is_file() {
                continue;
            }
            if !include_partial && PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }
            found.push(path);
        }
    }

    found.sort();
    found
}

/// Media files anywhere under `root`, sorted by lowercase file name.
pub async fn find_gallery_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in list_dir(&dir).await {
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() && has_gallery_extension(&path) {
                found.push(path);
            }
        }
    }

    found.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    found
}

fn has_gallery_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| GALLERY_EXTENSIONS.contains(&e.as_str()))
}

async fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match fs_err::tokio::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("list_dir {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut paths = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        paths.push(entry.path());
    }
    paths
}

async fn remove_paths(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs_err::tokio::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("CLEANUP_FAIL | {}", e);
            }
        }
    }
}

async fn remove_dir(dir: &Path) {
    if let Err(e) = fs_err::tokio::remove_dir_all(dir).await {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("CLEANUP_FAIL | {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_find_job_files_searches_one_level_deep() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("job1.001.a.mp4"), b"x").unwrap();
        std::fs::write(nested.join("job1.002.b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("job1.003.c.mp4.part"), b"x").unwrap();
        std::fs::write(dir.path().join("job2.001.d.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("cookies_job1.txt"), b"x").unwrap();

        let found = find_job_files(dir.path(), "job1", false).await;
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"job1.001.a.mp4".to_string()));
        assert!(names.contains(&"job1.002.b.mp4".to_string()));

        assert_eq!(find_job_files(dir.path(), "job1", true).await.len(), 3);
    }

    #[tokio::test]
    async fn test_find_gallery_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("pinterest").join("board");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("B.JPG"), b"x").unwrap();
        std::fs::write(deep.join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("c.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("meta.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("cookies_x.txt"), b"").unwrap();

        let found = find_gallery_files(dir.path()).await;
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "B.JPG", "c.mp4"]);
    }
}
