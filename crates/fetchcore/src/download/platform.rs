//! URL classification into a closed set of platforms.
//!
//! Pure substring matching on the lowercased URL; never fails and never touches the
//! network. Everything downstream switches on [`Platform`], not on URL text.

use serde::Serialize;
use strum::{AsRefStr, Display};

/// Generic hosts where several resolutions are expected, so a quality menu makes sense.
const QUALITY_MENU_HOSTS: &[&str] = &[
    "vk.com",
    "vkvideo.ru",
    "rutube.ru",
    "vimeo.com",
    "dailymotion.com",
    "twitch.tv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Any Instagram page other than a single post (reels, stories, profiles)
    Instagram,
    /// Single Instagram post (`/p/`), possibly a carousel
    InstagramPost,
    Pinterest,
    #[strum(serialize = "tiktok")]
    #[serde(rename = "tiktok")]
    TikTok,
    #[strum(serialize = "youtube")]
    #[serde(rename = "youtube")]
    YouTube,
    Generic,
}

impl Platform {
    /// Both Instagram variants share pacing, user agent and cookie rules.
    pub fn is_instagram(self) -> bool {
        matches!(self, Platform::Instagram | Platform::InstagramPost)
    }

    /// Platforms whose metadata probe is skipped.
    pub fn skips_probe(self) -> bool {
        matches!(self, Platform::InstagramPost | Platform::Pinterest | Platform::TikTok)
    }

    /// Platforms that may be retried through gallery-dl when yt-dlp sees no formats.
    pub fn allows_gallery_fallback(self) -> bool {
        matches!(self, Platform::InstagramPost | Platform::Pinterest)
    }
}

/// A URL together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedUrl {
    pub url: String,
    pub platform: Platform,
    pub supports_quality_menu: bool,
}

/// Classifies a URL. Unknown hosts become [`Platform::Generic`].
pub fn classify(url: &str) -> ClassifiedUrl {
    let lower = url.to_lowercase();

    let platform = if lower.contains("instagram.com/p/") {
        Platform::InstagramPost
    } else if lower.contains("instagram.com") || lower.contains("instagr.am") {
        Platform::Instagram
    } else if lower.contains("pinterest.") || lower.contains("pin.it") {
        Platform::Pinterest
    } else if lower.contains("tiktok.com") {
        Platform::TikTok
    } else if lower.contains("youtube.com") || lower.contains("youtu.be") {
        Platform::YouTube
    } else {
        Platform::Generic
    };

    let supports_quality_menu = match platform {
        Platform::YouTube => true,
        Platform::Generic => QUALITY_MENU_HOSTS.iter().any(|host| lower.contains(host)),
        Platform::Instagram | Platform::InstagramPost | Platform::Pinterest | Platform::TikTok => false,
    };

    ClassifiedUrl {
        url: url.to_string(),
        platform,
        supports_quality_menu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_platforms() {
        let cases = [
            ("https://www.instagram.com/p/Cxyz/", Platform::InstagramPost),
            ("https://www.instagram.com/reel/Cxyz/", Platform::Instagram),
            ("https://instagr.am/stories/x", Platform::Instagram),
            ("https://www.pinterest.com/pin/123/", Platform::Pinterest),
            ("https://pin.it/abc", Platform::Pinterest),
            ("https://vt.tiktok.com/ZS123/", Platform::TikTok),
            ("https://www.tiktok.com/@u/video/1", Platform::TikTok),
            ("https://www.youtube.com/watch?v=a", Platform::YouTube),
            ("https://youtu.be/a", Platform::YouTube),
            ("https://vimeo.com/1", Platform::Generic),
            ("https://example.org/video", Platform::Generic),
        ];
        for (url, expected) in cases {
            assert_eq!(classify(url).platform, expected, "{url}");
        }
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("HTTPS://WWW.YOUTUBE.COM/watch?v=A").platform, Platform::YouTube);
        assert_eq!(classify("https://Instagram.com/P/abc").platform, Platform::InstagramPost);
    }

    #[test]
    fn test_quality_menu_support() {
        assert!(classify("https://youtu.be/a").supports_quality_menu);
        assert!(classify("https://vimeo.com/1").supports_quality_menu);
        assert!(classify("https://rutube.ru/video/1").supports_quality_menu);
        assert!(!classify("https://example.org/video").supports_quality_menu);
        assert!(!classify("https://www.instagram.com/p/x/").supports_quality_menu);
        assert!(!classify("https://www.instagram.com/reel/x/").supports_quality_menu);
        assert!(!classify("https://pin.it/x").supports_quality_menu);
        assert!(!classify("https://www.tiktok.com/@u/video/1").supports_quality_menu);
    }

    #[test]
    fn test_platform_tags() {
        assert_eq!(Platform::InstagramPost.to_string(), "instagram-post");
        assert_eq!(Platform::TikTok.to_string(), "tiktok");
        assert_eq!(Platform::YouTube.as_ref(), "youtube");
        assert_eq!(Platform::Generic.to_string(), "generic");
    }
}
