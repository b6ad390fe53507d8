//! Per-job cookie copies.
//!
//! The configured cookie file is usually a read-only secret mount, while yt-dlp wants
//! to write refreshed cookies back. Every job gets its own writable copy.

use std::path::{Path, PathBuf};

/// File name of the copy for `job_id`. Never shares the job's output prefix, so output
/// collection cannot pick it up.
pub fn cookie_copy_name(job_id: &str) -> String {
    format!("cookies_{}.txt", job_id)
}

/// Copies `source` into `dir`. Returns `None` when there is no source or the copy
/// fails; the download then proceeds without cookies.
pub async fn prepare_cookie_copy(source: Option<&Path>, dir: &Path, job_id: &str) -> Option<PathBuf> {
    let source = source?;
    let target = dir.join(cookie_copy_name(job_id));

    if let Err(e) = fs_err::tokio::create_dir_all(dir).await {
        log::warn!("COOKIES | cannot create {}: {}", dir.display(), e);
        return None;
    }

    match fs_err::tokio::copy(source, &target).await {
        Ok(_) => {
            log::debug!("COOKIES | copied {} -> {}", source.display(), target.display());
            Some(target)
        }
        Err(e) => {
            log::warn!("COOKIES | copy failed, continuing without cookies: {}", e);
            None
        }
    }
}

/// Removes a copy made by [`prepare_cookie_copy`]. Best effort.
pub async fn remove_cookie_copy(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("CLEANUP_FAIL | {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("secret.txt");
        std::fs::write(&source, "# Netscape HTTP Cookie File\n").unwrap();

        let job_dir = dir.path().join("job");
        let copy = prepare_cookie_copy(Some(&source), &job_dir, "abc").await.unwrap();
        assert_eq!(copy, job_dir.join("cookies_abc.txt"));
        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "# Netscape HTTP Cookie File\n");

        remove_cookie_copy(Some(&copy)).await;
        assert!(!copy.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_source_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(prepare_cookie_copy(None, dir.path(), "a").await.is_none());
        let missing = dir.path().join("missing.txt");
        assert!(prepare_cookie_copy(Some(&missing), dir.path(), "a").await.is_none());
    }
}
