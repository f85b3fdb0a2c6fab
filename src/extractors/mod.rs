use async_trait::async_trait;
use url::Url;

pub mod browser;
pub mod player;

use crate::{Result, TranscriptError};

/// How a video was referenced on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `https://vimeo.com/<id>` and channel/group/unlisted variants
    Direct,
    /// A showcase page naming the video by query parameter or path
    Showcase,
    /// `https://player.vimeo.com/video/<id>`
    Player,
}

/// A single video, identified by its numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    id: u64,
    kind: ReferenceKind,
    source: Url,
}

impl VideoReference {
    /// Parse user input into a video reference
    pub fn parse(input: &str) -> Result<Self> {
        let source = crate::utils::parse_http_url(input)
            .map_err(|e| TranscriptError::InvalidVideoUrl(format!("{}: {}", input, e)))?;

        let (id, kind) = Self::identify(&source)
            .ok_or_else(|| TranscriptError::InvalidVideoUrl(format!("{} does not name a video", input)))?;

        Ok(Self { id, kind, source })
    }

    fn identify(url: &Url) -> Option<(u64, ReferenceKind)> {
        if let Some((_, video)) = url.query_pairs().find(|(key, _)| key == "video") {
            return parse_id(&video).map(|id| (id, ReferenceKind::Showcase));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.first() {
            Some(&"showcase") => segments
                .windows(2)
                .find(|pair| pair[0] == "video")
                .and_then(|pair| parse_id(pair[1]))
                .map(|id| (id, ReferenceKind::Showcase)),
            Some(&"video") => segments
                .get(1)
                .and_then(|s| parse_id(s))
                .map(|id| (id, ReferenceKind::Player)),
            _ => segments
                .iter()
                .find_map(|s| parse_id(s))
                .map(|id| (id, ReferenceKind::Direct)),
        }
    }

    /// Canonical numeric video id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// The URL as given; showcase pages are loaded as-is so their access rules apply
    pub fn page_url(&self) -> &Url {
        &self.source
    }

    pub fn canonical_url(&self) -> String {
        format!("https://vimeo.com/{}", self.id)
    }
}

fn parse_id(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Cookie held by the browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub domain: String,
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Whether the cookie would be sent to `host`
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain || host.ends_with(&format!(".{}", domain)))
    }
}

/// Build a `Cookie` header value from the session cookies that apply to `host`
pub fn cookie_header(cookies: &[SessionCookie], host: &str) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|cookie| cookie.matches_host(host))
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// A caption track found on a video page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Timed-text resource
    pub url: Url,

    /// Track language, when the player config names it
    pub language: Option<String>,

    /// Human-readable track label
    pub label: Option<String>,

    /// Page the track was found on, sent as `Referer`
    pub referer: Option<String>,

    /// Session cookies that apply to the caption host
    pub cookie_header: Option<String>,
}

impl CaptionTrack {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            language: None,
            label: None,
            referer: None,
            cookie_header: None,
        }
    }
}

/// Trait for locating the caption track of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionLocator: Send + Sync {
    /// Find the first caption track the video's player exposes
    async fn locate(&self, video: &VideoReference) -> Result<CaptionTrack>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_urls() {
        let video = VideoReference::parse("https://vimeo.com/123456789").unwrap();
        assert_eq!(video.id(), 123456789);
        assert_eq!(video.kind(), ReferenceKind::Direct);

        let channel = VideoReference::parse("https://vimeo.com/channels/staffpicks/42").unwrap();
        assert_eq!(channel.id(), 42);

        let unlisted = VideoReference::parse("https://vimeo.com/42/abcdef1234").unwrap();
        assert_eq!(unlisted.id(), 42);
    }

    #[test]
    fn test_showcase_urls() {
        let query = VideoReference::parse("https://vimeo.com/showcase/MyShowcase?video=123").unwrap();
        assert_eq!(query.id(), 123);
        assert_eq!(query.kind(), ReferenceKind::Showcase);

        let numeric_showcase = VideoReference::parse("https://vimeo.com/showcase/7654321?video=123").unwrap();
        assert_eq!(numeric_showcase.id(), 123);

        let path = VideoReference::parse("https://vimeo.com/showcase/7654321/video/123").unwrap();
        assert_eq!(path.id(), 123);
        assert_eq!(path.kind(), ReferenceKind::Showcase);
    }

    #[test]
    fn test_showcase_and_direct_share_canonical_id() {
        let showcase = VideoReference::parse("https://vimeo.com/showcase/X?video=123").unwrap();
        let direct = VideoReference::parse("https://vimeo.com/123").unwrap();
        assert_eq!(showcase.id(), direct.id());
        assert_eq!(showcase.canonical_url(), direct.canonical_url());
        assert_ne!(showcase.page_url(), direct.page_url());
    }

    #[test]
    fn test_player_url() {
        let video = VideoReference::parse("https://player.vimeo.com/video/987?h=abc").unwrap();
        assert_eq!(video.id(), 987);
        assert_eq!(video.kind(), ReferenceKind::Player);
    }

    #[test]
    fn test_rejects_non_video_urls() {
        for input in [
            "not a url",
            "ftp://vimeo.com/123",
            "https://vimeo.com/channels/staffpicks",
            "https://vimeo.com/showcase/7654321",
            "https://vimeo.com/showcase/X?video=abc",
        ] {
            let err = VideoReference::parse(input).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<TranscriptError>(), Some(TranscriptError::InvalidVideoUrl(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_cookie_header_filters_by_domain() {
        let cookies = vec![
            SessionCookie { domain: ".vimeo.com".into(), name: "vuid".into(), value: "1".into() },
            SessionCookie { domain: "player.vimeo.com".into(), name: "player".into(), value: "2".into() },
            SessionCookie { domain: "example.com".into(), name: "other".into(), value: "3".into() },
        ];

        assert_eq!(
            cookie_header(&cookies, "captions.cloud.vimeo.com").as_deref(),
            Some("vuid=1")
        );
        assert_eq!(
            cookie_header(&cookies, "player.vimeo.com").as_deref(),
            Some("vuid=1; player=2")
        );
        assert_eq!(cookie_header(&cookies, "notvimeo.com"), None);
    }
}
