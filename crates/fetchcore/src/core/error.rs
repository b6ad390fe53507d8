use thiserror::Error;

use crate::delivery::TransportError;
use crate::download::error::DownloadError;

/// Centralized error type for the fetch core
///
/// Every fallible operation of the pipeline ends up here so the chat layer can
/// render one failure message. Uses `thiserror` for conversion and formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Planning, tool invocation or size-limit failures
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Chat transport failures (send/edit/delete)
    #[error("Telegram error: {0}")]
    Transport(#[from] TransportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the failure looks like a client-side timeout talking to the chat API.
    ///
    /// The upload may still have gone through, so the user is told to check the chat
    /// rather than shown a hard failure. External-tool timeouts are not included.
    pub fn is_transport_timeout(&self) -> bool {
        match self {
            AppError::Transport(TransportError::Timeout(_)) => true,
            AppError::Transport(TransportError::Other(msg)) => {
                let lower = msg.to_lowercase();
                lower.contains("timeout") || lower.contains("timed out")
            }
            _ => false,
        }
    }

    /// Short category for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(e) => e.subcategory(),
            AppError::Transport(_) => "transport",
            AppError::Io(_) => "io",
            AppError::Json(_) => "json",
            AppError::Validation(_) => "validation",
        }
    }
}
