//! Caption discovery over a snapshot of the player page.
//!
//! Everything here is pure: the browser side collects a [`PlayerSnapshot`] and these functions
//! decide whether the player is ready and which caption URL it exposes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::VideoReference;
use crate::utils::unescape_embedded_url;

/// Caption URLs embedded in page markup
static CAPTION_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://[^"'<>\s]*(?:captions|texttrack)[^"'<>\s]*\.vtt[^"'<>\s]*"#)
        .expect("valid caption URL pattern")
});

/// Script evaluated in the page; always yields a JSON string
pub const SNAPSHOT_SCRIPT: &str = r#"(() => {
    let config = null;
    try {
        if (window.playerConfig && typeof window.playerConfig === 'object') {
            config = JSON.parse(JSON.stringify(window.playerConfig));
        }
    } catch (e) {}
    let status = null;
    try {
        const nav = performance.getEntriesByType('navigation')[0];
        if (nav && nav.responseStatus) { status = nav.responseStatus; }
    } catch (e) {}
    const frames = Array.from(document.querySelectorAll('iframe'))
        .map(f => f.src)
        .filter(Boolean);
    return JSON.stringify({ config, frames, status, location: window.location.href });
})()"#;

/// What the page looked like at one point in time
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSnapshot {
    /// `window.playerConfig`, if the page defines one
    #[serde(default)]
    pub config: Option<serde_json::Value>,

    /// `src` of every iframe on the page
    #[serde(default)]
    pub frames: Vec<String>,

    /// HTTP status of the document, when the browser reports it
    #[serde(default)]
    pub status: Option<u16>,

    /// Page location
    #[serde(default)]
    pub location: String,

    /// Serialized DOM
    #[serde(skip)]
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerConfig {
    #[serde(default)]
    request: PlayerRequest,
    #[serde(default)]
    video: Option<PlayerVideo>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerRequest {
    #[serde(default)]
    text_tracks: Vec<TextTrack>,
    #[serde(default)]
    player_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextTrack {
    url: String,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerVideo {
    #[serde(default)]
    id: Option<u64>,
}

/// Caption URL discovered on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCaption {
    pub url: Url,
    pub language: Option<String>,
    pub label: Option<String>,
}

impl PlayerSnapshot {
    pub fn from_script_output(json: &str, html: String) -> serde_json::Result<Self> {
        let mut snapshot: PlayerSnapshot = serde_json::from_str(json)?;
        snapshot.html = html;
        Ok(snapshot)
    }

    /// The document itself failed to load (private, removed, or blocked)
    pub fn failed_status(&self) -> Option<u16> {
        self.status.filter(|status| *status >= 400)
    }

    /// The player has initialized, or the page embeds one we can follow
    pub fn is_ready(&self, frame_marker: &str) -> bool {
        self.config.is_some()
            || CAPTION_URL.is_match(&self.html)
            || self.frames.iter().any(|src| src.contains(frame_marker))
    }

    /// Id of the video the player config describes
    pub fn config_video_id(&self) -> Option<u64> {
        self.player_config()?.video?.id
    }

    /// First caption track: player config first, then markup
    pub fn caption(&self) -> Option<DiscoveredCaption> {
        self.caption_from_config().or_else(|| self.caption_from_markup())
    }

    fn player_config(&self) -> Option<PlayerConfig> {
        let value = self.config.clone()?;
        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!("Ignoring unrecognised player config: {}", e);
                None
            }
        }
    }

    fn caption_from_config(&self) -> Option<DiscoveredCaption> {
        let config = self.player_config()?;
        let base = config
            .request
            .player_url
            .as_deref()
            .and_then(player_base)
            .or_else(|| Url::parse(&self.location).ok());

        let track = config.request.text_tracks.into_iter().next()?;
        let url = resolve_track_url(&track.url, base.as_ref())?;

        Some(DiscoveredCaption {
            url,
            language: track.lang,
            label: track.label,
        })
    }

    fn caption_from_markup(&self) -> Option<DiscoveredCaption> {
        let raw = CAPTION_URL.find(&self.html)?.as_str();
        let url = Url::parse(&unescape_embedded_url(raw)).ok()?;

        Some(DiscoveredCaption {
            url,
            language: None,
            label: None,
        })
    }

    /// Embedded player to follow, preferring the frame that names the requested video
    pub fn player_frame(&self, video: &VideoReference, frame_marker: &str) -> Option<Url> {
        let wanted = format!("/video/{}", video.id());
        let mut candidates = self
            .frames
            .iter()
            .filter(|src| src.contains(frame_marker));

        let chosen = candidates
            .clone()
            .find(|src| src.contains(&wanted))
            .or_else(|| candidates.next())?;

        Url::parse(chosen).ok()
    }
}

fn player_base(player_url: &str) -> Option<Url> {
    if player_url.contains("://") {
        Url::parse(player_url).ok()
    } else {
        Url::parse(&format!("https://{}/", player_url.trim_matches('/'))).ok()
    }
}

fn resolve_track_url(raw: &str, base: Option<&Url>) -> Option<Url> {
    let raw = unescape_embedded_url(raw);
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(&raw).ok(),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_with_config(config: serde_json::Value) -> PlayerSnapshot {
        PlayerSnapshot {
            config: Some(config),
            location: "https://player.vimeo.com/video/123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_text_track_wins() {
        let snapshot = snapshot_with_config(json!({
            "request": {
                "player_url": "player.vimeo.com",
                "text_tracks": [
                    { "url": "/texttrack/1.vtt?token=a", "lang": "en", "label": "English" },
                    { "url": "/texttrack/2.vtt?token=b", "lang": "de", "label": "Deutsch" }
                ]
            },
            "video": { "id": 123 }
        }));

        let caption = snapshot.caption().unwrap();
        assert_eq!(caption.url.as_str(), "https://player.vimeo.com/texttrack/1.vtt?token=a");
        assert_eq!(caption.language.as_deref(), Some("en"));
        assert_eq!(caption.label.as_deref(), Some("English"));
        assert_eq!(snapshot.config_video_id(), Some(123));
    }

    #[test]
    fn test_relative_track_resolves_against_location() {
        let snapshot = snapshot_with_config(json!({
            "request": { "text_tracks": [ { "url": "/texttrack/9.vtt" } ] }
        }));
        assert_eq!(
            snapshot.caption().unwrap().url.as_str(),
            "https://player.vimeo.com/texttrack/9.vtt"
        );
    }

    #[test]
    fn test_config_without_tracks_has_no_caption() {
        let snapshot = snapshot_with_config(json!({ "request": { "text_tracks": [] } }));
        assert!(snapshot.is_ready("player.vimeo"));
        assert!(snapshot.caption().is_none());
    }

    #[test]
    fn test_markup_fallback_unescapes_url() {
        let snapshot = PlayerSnapshot {
            html: r#"<script>var c = "https://captions.cloud.vimeo.com/captions/55.vtt?expires=1&amp;sig=x";</script>"#
                .to_string(),
            ..Default::default()
        };

        assert!(snapshot.is_ready("player.vimeo"));
        assert_eq!(
            snapshot.caption().unwrap().url.as_str(),
            "https://captions.cloud.vimeo.com/captions/55.vtt?expires=1&sig=x"
        );
    }

    #[test]
    fn test_unready_page() {
        let snapshot = PlayerSnapshot {
            html: "<html><body>Loading…</body></html>".to_string(),
            frames: vec!["https://ads.example.com/frame".to_string()],
            ..Default::default()
        };
        assert!(!snapshot.is_ready("player.vimeo"));
        assert!(snapshot.caption().is_none());
    }

    #[test]
    fn test_player_frame_prefers_requested_video() {
        let video = VideoReference::parse("https://vimeo.com/showcase/X?video=123").unwrap();
        let snapshot = PlayerSnapshot {
            frames: vec![
                "https://ads.example.com/frame".to_string(),
                "https://player.vimeo.com/video/999?h=a".to_string(),
                "https://player.vimeo.com/video/123?h=b".to_string(),
            ],
            ..Default::default()
        };

        let frame = snapshot.player_frame(&video, "player.vimeo").unwrap();
        assert_eq!(frame.as_str(), "https://player.vimeo.com/video/123?h=b");

        let other = VideoReference::parse("https://vimeo.com/555").unwrap();
        let fallback = snapshot.player_frame(&other, "player.vimeo").unwrap();
        assert_eq!(fallback.as_str(), "https://player.vimeo.com/video/999?h=a");
    }

    #[test]
    fn test_same_player_config_gives_same_track_for_showcase_and_direct() {
        let config = json!({
            "request": {
                "player_url": "player.vimeo.com",
                "text_tracks": [ { "url": "/texttrack/1.vtt", "lang": "en" } ]
            }
        });
        let from_showcase = PlayerSnapshot {
            location: "https://vimeo.com/showcase/X?video=123".to_string(),
            ..snapshot_with_config(config.clone())
        };
        let from_direct = PlayerSnapshot {
            location: "https://vimeo.com/123".to_string(),
            ..snapshot_with_config(config)
        };

        assert_eq!(from_showcase.caption(), from_direct.caption());
    }

    #[test]
    fn test_script_output_and_failed_status() {
        let snapshot = PlayerSnapshot::from_script_output(
            r#"{"config":null,"frames":[],"status":404,"location":"https://vimeo.com/1"}"#,
            String::new(),
        )
        .unwrap();
        assert_eq!(snapshot.failed_status(), Some(404));
        assert!(snapshot.config.is_none());
    }
}
