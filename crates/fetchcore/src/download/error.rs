//! Structured errors for planning and retrieval.
//!
//! Tool stderr is classified once, right where the tool exits, into a
//! [`ToolFailureKind`]. Retry policy (the gallery fallback) matches on the resulting
//! variant instead of re-reading diagnostic text.

use thiserror::Error;

use crate::core::config;
use crate::core::process::ProcessOutput;
use crate::core::utils::bytes_to_mb;

#[derive(Error, Debug)]
pub enum DownloadError {
    /// Estimated or actual size is above the configured ceiling
    #[error("File {name}~{size:.1} MB exceeds the {limit} MB limit.", size = bytes_to_mb(*.size_bytes), limit = .limit_bytes / (1024 * 1024))]
    TooLarge {
        /// File name with a trailing space, or empty for estimates
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// The primary tool found nothing it could download
    #[error("{tool} error (code {code}): no downloadable formats found\n{diagnostic}")]
    NoFormats { tool: String, code: i32, diagnostic: String },

    /// Any other non-zero exit
    #[error("{tool} error (code {code}):\n{diagnostic}")]
    ToolFailed {
        tool: String,
        code: i32,
        kind: ToolFailureKind,
        diagnostic: String,
    },

    /// We killed the tool after it ran too long
    #[error("{tool} did not finish within {secs}s and was stopped")]
    Timeout { tool: String, secs: u64 },

    /// The tool binary could not be started
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Zero exit but nothing usable on disk
    #[error("{0}")]
    NothingFound(String),

    /// Metadata probe output could not be understood
    #[error("metadata probe failed: {0}")]
    Probe(String),
}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::TooLarge { .. } => "too_large",
            DownloadError::NoFormats { .. } => "no_formats",
            DownloadError::ToolFailed { .. } => "tool_failed",
            DownloadError::Timeout { .. } => "timeout",
            DownloadError::Spawn { .. } => "spawn",
            DownloadError::NothingFound(_) => "nothing_found",
            DownloadError::Probe(_) => "probe",
        }
    }

    /// Builds the error for a non-zero exit.
    ///
    /// The whole failure text is classified; only its tail is kept for the user.
    pub fn from_output(tool: &str, output: &ProcessOutput) -> Self {
        let code = output.code;
        let diagnostic = output.diagnostic_tail(config::diagnostics::TAIL_CHARS);
        match analyze_tool_error(output.failure_text()) {
            ToolFailureKind::NoFormats => DownloadError::NoFormats {
                tool: tool.to_string(),
                code,
                diagnostic,
            },
            kind => DownloadError::ToolFailed {
                tool: tool.to_string(),
                code,
                kind,
                diagnostic,
            },
        }
    }

    /// Size estimate above the ceiling, before any payload is transferred.
    pub fn estimate_too_large(size_bytes: u64, limit_bytes: u64) -> Self {
        DownloadError::TooLarge {
            name: String::new(),
            size_bytes,
            limit_bytes,
        }
    }

    /// A produced file above the delivery ceiling.
    pub fn file_too_large(file_name: &str, size_bytes: u64, limit_bytes: u64) -> Self {
        DownloadError::TooLarge {
            name: format!("{} ", file_name),
            size_bytes,
            limit_bytes,
        }
    }
}

/// Failure classes recognised in yt-dlp / gallery-dl diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// No formats visible to the extractor; some platforms still have media via gallery-dl
    NoFormats,
    /// Cookies missing, expired or rotated
    InvalidCookies,
    /// Site blocked the request as automated
    BotDetection,
    /// Private, removed or region-locked
    Unavailable,
    /// Timeouts, DNS, connection resets
    Network,
    Unknown,
}

/// Classifies tool stderr.
///
/// The marker strings track yt-dlp's wording; a change upstream silently turns a
/// known failure into `Unknown`, so keep the tests below in sync with real output.
pub fn analyze_tool_error(stderr: &str) -> ToolFailureKind {
    let lower = stderr.to_lowercase();

    if lower.contains("no video formats found") {
        return ToolFailureKind::NoFormats;
    }

    if lower.contains("cookies are no longer valid")
        || lower.contains("cookies have likely been rotated")
        || lower.contains("sign in to confirm you're not a bot")
        || lower.contains("login required")
        || lower.contains("use --cookies")
    {
        return ToolFailureKind::InvalidCookies;
    }

    if lower.contains("http error 403") || lower.contains("http error 429") || lower.contains("rate-limit") {
        return ToolFailureKind::BotDetection;
    }

    if lower.contains("private video")
        || lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("has been removed")
        || lower.contains("http error 404")
    {
        return ToolFailureKind::Unavailable;
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("network is unreachable")
        || lower.contains("name or service not known")
    {
        return ToolFailureKind::Network;
    }

    ToolFailureKind::Unknown
}
