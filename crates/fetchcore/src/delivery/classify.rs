//! Media kind of a produced file and splitting files by kind.

use std::path::Path;

use serde::Serialize;
use strum::{AsRefStr, Display};

/// How a file is presented in the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Infers the kind from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" => MediaKind::Photo,
            "mp4" | "mkv" | "webm" | "mov" => MediaKind::Video,
            "mp3" | "m4a" | "aac" | "ogg" | "opus" | "wav" => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }
}

/// Items split by kind, relative order preserved within each kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition<T> {
    pub photos: Vec<T>,
    pub videos: Vec<T>,
    pub audios: Vec<T>,
    pub documents: Vec<T>,
}

/// Stable partition of `items` by the kind `kind_of` reports.
pub fn partition<T>(items: impl IntoIterator<Item = T>, kind_of: impl Fn(&T) -> MediaKind) -> Partition<T> {
    let mut out = Partition {
        photos: Vec::new(),
        videos: Vec::new(),
        audios: Vec::new(),
        documents: Vec::new(),
    };
    for item in items {
        match kind_of(&item) {
            MediaKind::Photo => out.photos.push(item),
            MediaKind::Video => out.videos.push(item),
            MediaKind::Audio => out.audios.push(item),
            MediaKind::Document => out.documents.push(item),
        }
    }
    out
}
