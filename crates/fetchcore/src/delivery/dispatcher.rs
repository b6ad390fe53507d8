//! Sends retrieved files to the chat and deletes them afterwards.
//!
//! Order: photos, videos, audio, documents. Photos and videos go out in albums of at
//! most [`MEDIA_GROUP_LIMIT`] items, everything else one by one. Every file is
//! removed once its send attempt is over, whatever the result.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::config::delivery::MEDIA_GROUP_LIMIT;
use crate::core::error::AppResult;
use crate::core::types::ConversationId;
use crate::delivery::classify::{partition, MediaKind};
use crate::delivery::transport::{FileSource, StatusHandle, Transport, TransportError};
use crate::download::error::DownloadError;
use crate::download::executor::RetrievedFile;

pub struct Dispatcher<'a> {
    transport: &'a dyn Transport,
    max_upload_bytes: u64,
}

impl<'a> Dispatcher<'a> {
    pub fn new(transport: &'a dyn Transport, max_upload_bytes: u64) -> Self {
        Self {
            transport,
            max_upload_bytes,
        }
    }

    /// Delivers `files` to `chat`, editing `status` between phases.
    ///
    /// Returns the number of files sent. All files and gallery job directories are
    /// gone from disk when this returns, on success and on error alike.
    pub async fn deliver(
        &self,
        chat: ConversationId,
        status: Option<StatusHandle>,
        files: Vec<RetrievedFile>,
        caption: &str,
    ) -> AppResult<usize> {
        let mut tracker = CleanupTracker::new(&files);
        let result = self.deliver_inner(chat, status, &files, caption, &mut tracker).await;
        tracker.sweep(&files).await;
        result
    }

    async fn deliver_inner(
        &self,
        chat: ConversationId,
        status: Option<StatusHandle>,
        files: &[RetrievedFile],
        caption: &str,
        tracker: &mut CleanupTracker,
    ) -> AppResult<usize> {
        // One oversized file fails the whole job before anything is sent.
        if let Some(big) = files.iter().find(|f| f.size > self.max_upload_bytes) {
            log::warn!(
                "DELIVERY | {} is {} bytes, upload limit {}",
                big.path.display(),
                big.size,
                self.max_upload_bytes
            );
            return Err(DownloadError::file_too_large(&big.file_name(), big.size, self.max_upload_bytes).into());
        }

        let caption = caption.trim();
        let caption = (!caption.is_empty()).then_some(caption);
        let parts = partition(files.iter(), |f| f.kind);

        if !parts.photos.is_empty() {
            self.status(status, &format!("📸 Prepared {} photos, sending…", parts.photos.len()))
                .await;
            self.send_batches(chat, MediaKind::Photo, &parts.photos, caption, tracker)
                .await?;
        }

        if parts.videos.len() > 1 {
            self.status(status, &format!("🎬 Prepared {} videos, sending…", parts.videos.len()))
                .await;
            self.send_batches(chat, MediaKind::Video, &parts.videos, caption, tracker)
                .await?;
        } else if let Some(video) = parts.videos.first() {
            self.status(status, "🎥 Sending video…").await;
            let result = self.send_single(chat, video, caption).await;
            tracker.release(video).await;
            result?;
        }

        let total_audio = parts.audios.len();
        for (idx, audio) in parts.audios.iter().enumerate() {
            self.status(status, &format!("🎧 Sending audio ({}/{})…", idx + 1, total_audio))
                .await;
            let result = self.send_single(chat, audio, caption.filter(|_| idx == 0)).await;
            tracker.release(audio).await;
            result?;
        }

        for (idx, doc) in parts.documents.iter().enumerate() {
            self.status(status, &format!("📤 Sending file: {}", doc.file_name())).await;
            let result = self.send_single(chat, doc, caption.filter(|_| idx == 0)).await;
            tracker.release(doc).await;
            result?;
        }

        Ok(files.len())
    }

    /// Albums of up to ten; a trailing batch of one goes out as a plain file since
    /// the API rejects single-item albums.
    async fn send_batches(
        &self,
        chat: ConversationId,
        kind: MediaKind,
        items: &[&RetrievedFile],
        caption: Option<&str>,
        tracker: &mut CleanupTracker,
    ) -> AppResult<()> {
        for (batch_idx, batch) in items.chunks(MEDIA_GROUP_LIMIT).enumerate() {
            let batch_caption = caption.filter(|_| batch_idx == 0);
            let result = if let [single] = batch {
                self.send_single(chat, single, batch_caption).await
            } else {
                let paths: Vec<PathBuf> = batch.iter().map(|f| f.path.clone()).collect();
                log::info!(
                    "SEND_MEDIA_GROUP_{} | chat={} batch={} items={}",
                    kind.as_ref().to_uppercase(),
                    chat,
                    batch_idx + 1,
                    paths.len()
                );
                self.transport
                    .send_media_group(chat, kind, &paths, batch_caption)
                    .await
                    .map_err(Into::into)
            };
            for file in batch {
                tracker.release(file).await;
            }
            result?;
        }
        Ok(())
    }

    /// One file, as a path reference first when the transport supports it.
    async fn send_single(&self, chat: ConversationId, file: &RetrievedFile, caption: Option<&str>) -> AppResult<()> {
        if self.transport.prefers_local_paths() {
            match self
                .transport
                .send_file(chat, file.kind, &file.path, caption, FileSource::LocalPath)
                .await
            {
                Ok(()) => return Ok(()),
                Err(TransportError::LocalPathRejected(msg)) => {
                    log::warn!("SEND_{} | local path rejected ({}), uploading", file.kind.as_ref().to_uppercase(), msg);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.transport
            .send_file(chat, file.kind, &file.path, caption, FileSource::Upload)
            .await?;
        Ok(())
    }

    async fn status(&self, status: Option<StatusHandle>, text: &str) {
        if let Some(handle) = status {
            if let Err(e) = self.transport.edit_text(handle, text).await {
                log::debug!("status edit failed: {}", e);
            }
        }
    }
}

/// Deletes files as they are sent and each gallery job directory with its last file.
struct CleanupTracker {
    remaining: HashMap<PathBuf, usize>,
}

impl CleanupTracker {
    fn new(files: &[RetrievedFile]) -> Self {
        let mut remaining = HashMap::new();
        for dir in files.iter().filter_map(|f| f.job_dir.clone()) {
            *remaining.entry(dir).or_insert(0) += 1;
        }
        Self { remaining }
    }

    async fn release(&mut self, file: &RetrievedFile) {
        remove_file(&file.path).await;
        let Some(dir) = &file.job_dir else {
            return;
        };
        if let Some(count) = self.remaining.get_mut(dir) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.remaining.remove(dir);
                remove_dir(dir).await;
            }
        }
    }

    /// Final pass for whatever an early error left behind.
    async fn sweep(&mut self, files: &[RetrievedFile]) {
        for file in files {
            remove_file(&file.path).await;
        }
        for (dir, _) in self.remaining.drain() {
            remove_dir(&dir).await;
        }
    }
}

async fn remove_file(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("CLEANUP_FAIL | {}", e);
        }
    }
}

async fn remove_dir(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_dir_all(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("CLEANUP_FAIL | {}", e);
        }
    }
}
