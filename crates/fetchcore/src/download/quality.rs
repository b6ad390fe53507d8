//! Quality menu: heights offered to the user and the callback encoding of their choice.

use std::fmt;

use serde_json::Value;

use crate::core::config;

/// Callback data prefix for quality buttons.
pub const CALLBACK_PREFIX: &str = "q";

/// What the user picked in the quality menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityChoice {
    /// Let yt-dlp merge the best streams itself
    Best,
    /// Audio only, extracted to mp3
    Mp3,
    /// Best stream not taller than this
    Height(u32),
    Cancel,
}

impl QualityChoice {
    /// Parses `best`, `mp3`, `cancel` or `<height>p`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "best" => Some(Self::Best),
            "mp3" => Some(Self::Mp3),
            "cancel" => Some(Self::Cancel),
            other => other
                .strip_suffix('p')
                .and_then(|h| h.parse::<u32>().ok())
                .filter(|h| *h > 0)
                .map(Self::Height),
        }
    }

    /// Button label with the icon used in the menu.
    pub fn label(&self) -> String {
        match self {
            Self::Best => "⭐ Best".to_string(),
            Self::Mp3 => "🎵 MP3".to_string(),
            Self::Cancel => "❌ Cancel".to_string(),
            Self::Height(h) => {
                let icon = match h {
                    1080 => "🎬",
                    720 => "📺",
                    480 => "📱",
                    _ => "⚡",
                };
                format!("{} {}p", icon, h)
            }
        }
    }
}

impl fmt::Display for QualityChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Mp3 => write!(f, "mp3"),
            Self::Cancel => write!(f, "cancel"),
            Self::Height(h) => write!(f, "{}p", h),
        }
    }
}

/// Best video not taller than `height` merged with best audio, else best combined
/// stream within the bound, else anything within the bound.
pub fn format_selector(height: u32) -> String {
    format!(
        "bv*[height<={h}]+ba/b[height<={h}]/best[height<={h}]",
        h = height
    )
}

/// Distinct positive heights of formats that carry video, tallest first.
pub fn available_heights(probe: &Value) -> Vec<u32> {
    let mut heights: Vec<u32> = probe
        .get("formats")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|format| match format.get("vcodec") {
            None | Some(Value::Null) => false,
            Some(Value::String(codec)) => codec != "none",
            Some(_) => true,
        })
        .filter_map(|format| format.get("height").and_then(Value::as_u64))
        .filter(|h| *h > 0)
        .filter_map(|h| u32::try_from(h).ok())
        .collect();

    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();
    heights
}

/// Heights for the menu: the preference list filtered to what the probe offers.
pub fn menu_heights(probe: &Value) -> Vec<u32> {
    let available = available_heights(probe);
    config::quality::PREFERRED_HEIGHTS
        .iter()
        .copied()
        .filter(|h| available.contains(h))
        .collect()
}

/// New pending-choice token: 12 hex characters from a random UUID.
pub fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Callback data for a button: `q|<choice>|<token>`.
pub fn encode_callback(choice: QualityChoice, token: &str) -> String {
    format!("{}|{}|{}", CALLBACK_PREFIX, choice, token)
}

/// Parses callback data produced by [`encode_callback`].
pub fn parse_callback(data: &str) -> Option<(QualityChoice, String)> {
    let mut parts = data.splitn(3, '|');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let choice = QualityChoice::parse(parts.next()?)?;
    let token = parts.next()?.trim();
    if token.is_empty() {
        return None;
    }
    Some((choice, token.to_string()))
}

/// A menu bound to one pending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityMenu {
    pub token: String,
    pub heights: Vec<u32>,
}

impl QualityMenu {
    pub fn new(token: impl Into<String>, heights: Vec<u32>) -> Self {
        Self {
            token: token.into(),
            heights,
        }
    }

    /// Button rows: Best + MP3, heights two per row, then Cancel on its own.
    pub fn rows(&self) -> Vec<Vec<QualityChoice>> {
        let mut rows = vec![vec![QualityChoice::Best, QualityChoice::Mp3]];
        for pair in self.heights.chunks(2) {
            rows.push(pair.iter().map(|h| QualityChoice::Height(*h)).collect());
        }
        rows.push(vec![QualityChoice::Cancel]);
        rows
    }

    /// Rows as `(label, callback data)` pairs, ready for a transport keyboard.
    pub fn buttons(&self) -> Vec<Vec<(String, String)>> {
        self.rows()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|choice| (choice.label(), encode_callback(choice, &self.token)))
                    .collect()
            })
            .collect()
    }
}
