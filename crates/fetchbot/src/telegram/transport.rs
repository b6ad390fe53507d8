//! [`Transport`] over the Telegram Bot API.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fetchcore::delivery::{EditOutcome, FileSource, MediaKind, StatusHandle, Transport, TransportError};
use fetchcore::download::QualityMenu;
use fetchcore::ConversationId;
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, MessageId};
use teloxide::{ApiError, RequestError};

use super::keyboard::quality_keyboard;

/// Sends through a teloxide [`Bot`]. `local_api` marks a self-hosted Bot API server
/// that can read files from disk by `file://` reference.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    local_api: bool,
}

impl TelegramTransport {
    pub fn new(bot: Bot, local_api: bool) -> Self {
        Self { bot, local_api }
    }
}

fn chat_id(chat: ConversationId) -> ChatId {
    ChatId(chat.0)
}

/// Maps a client error onto the transport error kinds the core understands.
pub fn map_request_error(err: RequestError) -> TransportError {
    let text = err.to_string();
    if let RequestError::Network(e) = &err {
        if e.is_timeout() {
            return TransportError::Timeout(text);
        }
    }
    let lower = text.to_lowercase();
    if lower.contains("unsupported url protocol") || lower.contains("invalid file http url") {
        return TransportError::LocalPathRejected(text);
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return TransportError::Timeout(text);
    }
    TransportError::Other(text)
}

fn file_url(path: &Path) -> Result<InputFile, TransportError> {
    let absolute = std::path::absolute(path).map_err(|e| TransportError::LocalPathRejected(e.to_string()))?;
    let url = url::Url::from_file_path(&absolute)
        .map_err(|_| TransportError::LocalPathRejected(format!("not a file path: {}", absolute.display())))?;
    Ok(InputFile::url(url))
}

fn input_file(path: &Path, source: FileSource) -> Result<InputFile, TransportError> {
    match source {
        FileSource::LocalPath => file_url(path),
        FileSource::Upload => Ok(InputFile::file(path.to_path_buf())),
    }
}

/// Sends one request with an optional caption and maps the error.
macro_rules! send_captioned {
    ($request:expr, $caption:expr) => {{
        let mut request = $request;
        if let Some(caption) = $caption {
            request = request.caption(caption);
        }
        request.await.map(|_| ()).map_err(map_request_error)
    }};
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat: ConversationId, text: &str) -> Result<StatusHandle, TransportError> {
        let msg = self
            .bot
            .send_message(chat_id(chat), text)
            .await
            .map_err(map_request_error)?;
        Ok(StatusHandle {
            chat,
            message_id: msg.id.0,
        })
    }

    async fn edit_text(&self, status: StatusHandle, text: &str) -> Result<EditOutcome, TransportError> {
        match self
            .bot
            .edit_message_text(chat_id(status.chat), MessageId(status.message_id), text)
            .await
        {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(EditOutcome::Unchanged),
            Err(e) => Err(map_request_error(e)),
        }
    }

    async fn present_menu(&self, status: StatusHandle, text: &str, menu: &QualityMenu) -> Result<(), TransportError> {
        match self
            .bot
            .edit_message_text(chat_id(status.chat), MessageId(status.message_id), text)
            .reply_markup(quality_keyboard(menu))
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(map_request_error(e)),
        }
    }

    async fn delete_message(&self, status: StatusHandle) -> Result<(), TransportError> {
        self.bot
            .delete_message(chat_id(status.chat), MessageId(status.message_id))
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }

    async fn send_media_group(
        &self,
        chat: ConversationId,
        kind: MediaKind,
        files: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let media: Vec<InputMedia> = files
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let file = InputFile::file(path.clone());
                let caption = if i == 0 { caption } else { None };
                match kind {
                    MediaKind::Video => {
                        let item = InputMediaVideo::new(file);
                        InputMedia::Video(match caption {
                            Some(c) => item.caption(c),
                            None => item,
                        })
                    }
                    _ => {
                        let item = InputMediaPhoto::new(file);
                        InputMedia::Photo(match caption {
                            Some(c) => item.caption(c),
                            None => item,
                        })
                    }
                }
            })
            .collect();

        self.bot
            .send_media_group(chat_id(chat), media)
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }

    async fn send_file(
        &self,
        chat: ConversationId,
        kind: MediaKind,
        path: &Path,
        caption: Option<&str>,
        source: FileSource,
    ) -> Result<(), TransportError> {
        let file = input_file(path, source)?;
        let chat = chat_id(chat);
        match kind {
            MediaKind::Photo => send_captioned!(self.bot.send_photo(chat, file), caption),
            MediaKind::Video => send_captioned!(self.bot.send_video(chat, file), caption),
            MediaKind::Audio => send_captioned!(self.bot.send_audio(chat, file), caption),
            MediaKind::Document => send_captioned!(self.bot.send_document(chat, file), caption),
        }
    }

    fn prefers_local_paths(&self) -> bool {
        self.local_api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_rejection_is_recognised() {
        let err = RequestError::Api(ApiError::Unknown(
            "Bad Request: invalid file HTTP URL specified: Unsupported URL protocol".into(),
        ));
        assert!(matches!(map_request_error(err), TransportError::LocalPathRejected(_)));
    }

    #[test]
    fn test_other_api_errors_pass_through() {
        let err = RequestError::Api(ApiError::Unknown("Bad Request: chat not found".into()));
        assert!(matches!(map_request_error(err), TransportError::Other(_)));
    }

    #[test]
    fn test_local_path_becomes_file_url() {
        assert!(file_url(Path::new("/data/clip.mp4")).is_ok());
    }
}
