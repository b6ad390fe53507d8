//! The seam between the core and a chat API.
//!
//! Implemented by the Telegram client in the bot crate and by recording fakes in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ConversationId;
use crate::delivery::classify::MediaKind;
use crate::download::quality::QualityMenu;

/// Failures reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server refused a `file://` reference; sending by upload may still work
    #[error("local file reference rejected: {0}")]
    LocalPathRejected(String),

    /// Client-side timeout; the request may have gone through anyway
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// A status message the bot keeps editing while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandle {
    pub chat: ConversationId,
    pub message_id: i32,
}

/// Editing to identical text is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    Unchanged,
}

/// How a single file is handed to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    /// Path reference resolved by a local Bot API server
    LocalPath,
    /// Multipart upload of the file content
    Upload,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat: ConversationId, text: &str) -> Result<StatusHandle, TransportError>;

    async fn edit_text(&self, status: StatusHandle, text: &str) -> Result<EditOutcome, TransportError>;

    /// Replaces the status text with `text` and attaches the quality keyboard.
    async fn present_menu(&self, status: StatusHandle, text: &str, menu: &QualityMenu) -> Result<(), TransportError>;

    async fn delete_message(&self, status: StatusHandle) -> Result<(), TransportError>;

    /// Sends photos or videos as one album; `caption` goes on the first item.
    async fn send_media_group(
        &self,
        chat: ConversationId,
        kind: MediaKind,
        files: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    async fn send_file(
        &self,
        chat: ConversationId,
        kind: MediaKind,
        path: &Path,
        caption: Option<&str>,
        source: FileSource,
    ) -> Result<(), TransportError>;

    /// Whether single files should be tried as path references first.
    fn prefers_local_paths(&self) -> bool {
        false
    }
}
