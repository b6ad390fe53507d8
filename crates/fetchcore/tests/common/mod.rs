//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod runner;
pub mod transport;

#[allow(unused_imports)]
pub use runner::{FakeRunner, Step};
#[allow(unused_imports)]
pub use transport::{Event, RecordingTransport};

use fetchcore::Settings;
use std::path::Path;
use std::sync::Arc;

/// Settings pointing at `dir`, without cookies or status deletion delays.
#[allow(dead_code)]
pub fn test_settings(dir: &Path) -> Arc<Settings> {
    Arc::new(Settings {
        download_dir: dir.to_path_buf(),
        delete_status_on_success: false,
        delete_status_delay: std::time::Duration::ZERO,
        cookies_file: None,
        ..Settings::default()
    })
}

/// Names of all regular files left anywhere under `dir`.
#[allow(dead_code)]
pub fn leftover_files(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&d) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.push(format!("{}/", path.file_name().unwrap().to_string_lossy()));
                stack.push(path);
            } else {
                out.push(path.file_name().unwrap().to_string_lossy().into_owned());
            }
        }
    }
    out.sort();
    out
}
