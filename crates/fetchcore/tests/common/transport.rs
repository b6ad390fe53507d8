//! Transport that records every call instead of talking to Telegram.

#![allow(dead_code)]

use async_trait::async_trait;
use fetchcore::delivery::{EditOutcome, FileSource, MediaKind, StatusHandle, Transport, TransportError};
use fetchcore::download::QualityMenu;
use fetchcore::ConversationId;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Text {
        chat: i64,
        text: String,
    },
    Edit {
        message_id: i32,
        text: String,
    },
    Menu {
        message_id: i32,
        token: String,
        heights: Vec<u32>,
    },
    Delete {
        message_id: i32,
    },
    Group {
        kind: MediaKind,
        files: Vec<String>,
        caption: Option<String>,
        /// Whether every file was still on disk when it was handed over
        existed: bool,
    },
    File {
        kind: MediaKind,
        name: String,
        caption: Option<String>,
        source: FileSource,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Event>>,
    next_id: AtomicI32,
    prefers_local: bool,
    reject_local_paths: bool,
    fail_sends: Option<TransportError>,
}

fn name_of(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(100),
            ..Self::default()
        }
    }

    /// Advertise path references for single files.
    pub fn with_local_paths(mut self) -> Self {
        self.prefers_local = true;
        self
    }

    /// Refuse every path reference the way a public Bot API server does.
    pub fn rejecting_local_paths(mut self) -> Self {
        self.prefers_local = true;
        self.reject_local_paths = true;
        self
    }

    /// Fail every media send, group or single, with `err`.
    pub fn failing_sends(mut self, err: TransportError) -> Self {
        self.fail_sends = Some(err);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Media sends only: groups and single files.
    pub fn sends(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Group { .. } | Event::File { .. }))
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat: ConversationId, text: &str) -> Result<StatusHandle, TransportError> {
        self.push(Event::Text {
            chat: chat.0,
            text: text.to_string(),
        });
        Ok(StatusHandle {
            chat,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_text(&self, status: StatusHandle, text: &str) -> Result<EditOutcome, TransportError> {
        self.push(Event::Edit {
            message_id: status.message_id,
            text: text.to_string(),
        });
        Ok(EditOutcome::Edited)
    }

    async fn present_menu(&self, status: StatusHandle, _text: &str, menu: &QualityMenu) -> Result<(), TransportError> {
        self.push(Event::Menu {
            message_id: status.message_id,
            token: menu.token.clone(),
            heights: menu.heights.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, status: StatusHandle) -> Result<(), TransportError> {
        self.push(Event::Delete {
            message_id: status.message_id,
        });
        Ok(())
    }

    async fn send_media_group(
        &self,
        _chat: ConversationId,
        kind: MediaKind,
        files: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        self.push(Event::Group {
            kind,
            files: files.iter().map(|p| name_of(p)).collect(),
            caption: caption.map(str::to_string),
            existed: files.iter().all(|p| p.exists()),
        });
        match &self.fail_sends {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn send_file(
        &self,
        _chat: ConversationId,
        kind: MediaKind,
        path: &Path,
        caption: Option<&str>,
        source: FileSource,
    ) -> Result<(), TransportError> {
        self.push(Event::File {
            kind,
            name: name_of(path),
            caption: caption.map(str::to_string),
            source,
        });
        if source == FileSource::LocalPath && self.reject_local_paths {
            return Err(TransportError::LocalPathRejected(
                "Bad Request: invalid file HTTP URL specified: Unsupported URL protocol".into(),
            ));
        }
        match &self.fail_sends {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn prefers_local_paths(&self) -> bool {
        self.prefers_local
    }
}
