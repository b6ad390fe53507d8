//! fetchcore - download orchestration core for the fetch bot
//!
//! Takes a URL from a chat, decides how to retrieve it, drives yt-dlp / gallery-dl,
//! and hands the produced files to a transport for delivery. Nothing in here talks
//! to Telegram directly; the bot crate plugs in through [`delivery::Transport`].
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process execution, shared types
//! - `download`: URL classification, argument building, planning, quality menu, execution
//! - `jobs`: pending quality-choice registry and per-chat locks
//! - `delivery`: file classification, transport seam, batching dispatcher
//! - `pipeline`: the request / choice state machine tying everything together

pub mod core;
pub mod delivery;
pub mod download;
pub mod jobs;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::core::config::{Settings, SETTINGS};
pub use crate::core::error::{AppError, AppResult};
pub use crate::core::types::{ConversationId, SenderId};
pub use pipeline::{AcceptedChoice, ChoiceOutcome, ChoiceResolution, FetchService, RequestOutcome};
