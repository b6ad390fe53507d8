//! Planner against a scripted runner.
//!
//! Run with: cargo test -p fetchcore --test planner_test

mod common;

use common::{test_settings, FakeRunner, Step};
use fetchcore::download::{classify, DownloadError, DownloadMode, Planner};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const GIB: u64 = 1024 * 1024 * 1024;

#[tokio::test]
async fn test_skip_probe_platforms_never_invoke_the_tool() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new(vec![]));
    let planner = Planner::new(runner.clone(), test_settings(dir.path()));

    let cases = [
        ("https://www.instagram.com/p/Cx1/", DownloadMode::Photo),
        ("https://www.pinterest.com/pin/123/", DownloadMode::Gallery),
        ("https://pin.it/abc", DownloadMode::Gallery),
        ("https://www.tiktok.com/@user/video/1", DownloadMode::Video),
    ];
    for (url, mode) in cases {
        let plan = planner.precheck(&classify(url), GIB).await.unwrap();
        assert_eq!(plan.mode, mode, "{url}");
        assert!(plan.probe.is_none(), "{url}");
    }
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_probe_extracts_title_description_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let probe = r#"[vimeo] 1: Downloading JSON metadata
{"title": "Clip", "description": "About the clip", "requested_downloads": [{"filesize_approx": 4096}], "formats": []}"#;
    let runner = Arc::new(FakeRunner::new(vec![Step::Stdout(probe.into())]));
    let planner = Planner::new(runner.clone(), test_settings(dir.path()));

    let plan = planner.precheck(&classify("https://vimeo.com/1"), GIB).await.unwrap();
    assert_eq!(plan.mode, DownloadMode::Video);
    assert_eq!(plan.title, "Clip");
    assert_eq!(plan.description, "About the clip");
    assert_eq!(plan.estimated_size, Some(4096));
    assert!(plan.probe.is_some());

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].args.iter().any(|a| a == "--dump-single-json"));
    assert!(calls[0].args.iter().any(|a| a == "--skip-download"));
}

#[tokio::test]
async fn test_probe_estimate_over_ceiling_fails_before_download() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new(vec![Step::Stdout(
        r#"{"title": "Big", "filesize": 5242880}"#.into(),
    )]));
    let planner = Planner::new(runner.clone(), test_settings(dir.path()));

    let err = planner
        .precheck(&classify("https://vimeo.com/1"), 1024 * 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::TooLarge { size_bytes: 5242880, .. }));
    assert_eq!(err.to_string(), "File ~5.0 MB exceeds the 1 MB limit.");
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_probe_failure_carries_bounded_diagnostic_tail() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = format!("{}END", "x".repeat(5000));
    let runner = Arc::new(FakeRunner::new(vec![Step::Fail { code: 2, stderr }]));
    let planner = Planner::new(runner, test_settings(dir.path()));

    match planner.precheck(&classify("https://vimeo.com/1"), GIB).await {
        Err(DownloadError::ToolFailed { code, diagnostic, .. }) => {
            assert_eq!(code, 2);
            assert_eq!(diagnostic.chars().count(), 1200);
            assert!(diagnostic.ends_with("END"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
