use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use std::time::Instant;
use tokio::task::JoinHandle;
use url::Url;

use super::player::{PlayerSnapshot, SNAPSHOT_SCRIPT};
use super::{cookie_header, CaptionLocator, CaptionTrack, SessionCookie, VideoReference};
use crate::config::BrowserSettings;
use crate::{Result, TranscriptError};

/// A running browser plus the task pumping its DevTools events
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a browser configured from `settings`
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(settings.navigation_timeout())
            .arg(format!("--user-agent={}", settings.user_agent));

        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(TranscriptError::BrowserLaunch)?;

        tracing::debug!("Launching browser (headless: {})", settings.headless);
        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| TranscriptError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::trace!("DevTools event error: {}", e);
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Open `url` in a new tab and wait for the navigation to finish, sending `referrer` if given
    pub async fn open(&self, url: &str, referrer: Option<&str>, settings: &BrowserSettings) -> Result<Page> {
        let params = navigate_params(url, referrer)?;
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| navigation_error(url, e))?;

        tracing::info!("Loading: {}", url);
        let navigation = tokio::time::timeout(settings.navigation_timeout(), page.goto(params))
            .await
            .map(|result| result.map(|_| ()));

        match navigation {
            Err(_) | Ok(Err(CdpError::Timeout)) => Err(TranscriptError::Timeout {
                what: format!("{} to load", url),
                seconds: settings.navigation_timeout_secs,
            }
            .into()),
            Ok(Err(e)) => Err(navigation_error(url, e).into()),
            Ok(Ok(())) => Ok(page),
        }
    }

    /// Close the browser and stop the event task; dropping `Browser` kills a process that ignored the close
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        self.handler.abort();
    }
}

fn navigate_params(url: &str, referrer: Option<&str>) -> std::result::Result<NavigateParams, TranscriptError> {
    let mut builder = NavigateParams::builder().url(url);
    if let Some(referrer) = referrer {
        builder = builder.referrer(referrer);
    }
    builder.build().map_err(|e| navigation_error(url, e))
}

fn navigation_error(url: &str, err: impl std::fmt::Display) -> TranscriptError {
    TranscriptError::Navigation {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

/// Capture the page's player state and markup
async fn take_snapshot(page: &Page) -> Result<PlayerSnapshot> {
    let json: String = page.evaluate(SNAPSHOT_SCRIPT).await?.into_value()?;
    let html = page.content().await?;
    Ok(PlayerSnapshot::from_script_output(&json, html)?)
}

/// Poll until the player shows up, the document reports an error, or the timeout passes
async fn wait_for_player(page: &Page, url: &str, settings: &BrowserSettings) -> Result<PlayerSnapshot> {
    let deadline = Instant::now() + settings.player_timeout();

    loop {
        match take_snapshot(page).await {
            Ok(snapshot) => {
                if let Some(status) = snapshot.failed_status() {
                    return Err(navigation_error(url, format!("HTTP {}", status)).into());
                }
                if snapshot.is_ready(&settings.player_frame_marker) {
                    return Ok(snapshot);
                }
            }
            // The document can be swapped out under us while scripts run
            Err(e) => tracing::debug!("Page not inspectable yet: {:#}", e),
        }

        if Instant::now() >= deadline {
            return Err(TranscriptError::Timeout {
                what: format!("the video player on {}", url),
                seconds: settings.player_timeout_secs,
            }
            .into());
        }

        tokio::time::sleep(settings.poll_interval()).await;
    }
}

/// Finds caption tracks by loading the video page in a headless browser
pub struct BrowserLocator {
    settings: BrowserSettings,
}

impl BrowserLocator {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    async fn locate_in(&self, session: &BrowserSession, video: &VideoReference) -> Result<CaptionTrack> {
        let page_url = video.page_url().as_str();
        let page = session.open(page_url, None, &self.settings).await?;
        let snapshot = wait_for_player(&page, page_url, &self.settings).await?;

        if let Some(track) = self.track_from(&page, &snapshot, video).await {
            return Ok(track);
        }

        if let Some(frame) = snapshot.player_frame(video, &self.settings.player_frame_marker) {
            tracing::debug!("No captions on the page itself, following player frame {}", frame);
            // Embed-restricted players only serve their config to the embedding page
            let frame_page = session
                .open(frame.as_str(), Some(snapshot.location.as_str()), &self.settings)
                .await?;
            let frame_snapshot = wait_for_player(&frame_page, frame.as_str(), &self.settings).await?;

            if let Some(track) = self.track_from(&frame_page, &frame_snapshot, video).await {
                return Ok(track);
            }
        }

        Err(TranscriptError::NoCaptions.into())
    }

    async fn track_from(
        &self,
        page: &Page,
        snapshot: &PlayerSnapshot,
        video: &VideoReference,
    ) -> Option<CaptionTrack> {
        let caption = snapshot.caption()?;

        if let Some(config_id) = snapshot.config_video_id() {
            if config_id != video.id() {
                tracing::warn!(
                    "Player on {} describes video {}, expected {}",
                    snapshot.location,
                    config_id,
                    video.id()
                );
            }
        }

        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies
                .into_iter()
                .map(|cookie| SessionCookie {
                    domain: cookie.domain,
                    name: cookie.name,
                    value: cookie.value,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Could not read session cookies: {}", e);
                Vec::new()
            }
        };

        let host = caption.url.host_str().unwrap_or_default().to_string();
        tracing::info!(
            "Found caption track {} ({})",
            caption.url,
            caption.language.as_deref().unwrap_or("unknown language")
        );

        Some(CaptionTrack {
            cookie_header: cookie_header(&cookies, &host),
            referer: Url::parse(&snapshot.location).ok().map(String::from),
            url: caption.url,
            language: caption.language,
            label: caption.label,
        })
    }
}

#[async_trait]
impl CaptionLocator for BrowserLocator {
    async fn locate(&self, video: &VideoReference) -> Result<CaptionTrack> {
        let session = BrowserSession::launch(&self.settings).await?;
        let outcome = self.locate_in(&session, video).await;
        session.close().await;
        outcome
    }
}
