use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::extractors::browser::BrowserLocator;
use crate::extractors::{CaptionLocator, CaptionTrack, VideoReference};
use crate::fetch::CaptionFetcher;
use crate::{Result, TranscriptError};

pub mod webvtt;

pub use webvtt::{Cue, TimedTextDocument};

/// Finished transcript, ready for the output sink
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Video the transcript belongs to
    pub video: VideoReference,

    /// Caption track it was downloaded from
    pub track: CaptionTrack,

    /// Format of `content`
    pub format: OutputFormat,

    /// Rendered output; for `vtt` these are exactly the downloaded bytes
    pub content: Vec<u8>,
}

/// Convert a downloaded caption payload into the requested format
pub fn convert(payload: &[u8], format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Vtt => Ok(payload.to_vec()),
        OutputFormat::Text => {
            let source = std::str::from_utf8(payload).map_err(|e| TranscriptError::Parse {
                line: 1 + payload[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count(),
                reason: "payload is not valid UTF-8".to_string(),
            })?;
            let document = TimedTextDocument::parse(source)?;
            tracing::debug!("Parsed {} caption cues", document.cues.len());

            let mut text = document.to_plain_text();
            text.push('\n');
            Ok(text.into_bytes())
        }
    }
}

/// Main extraction pipeline: locate → fetch → convert
pub struct TranscriptPipeline {
    locator: Box<dyn CaptionLocator>,
    fetcher: CaptionFetcher,
    progress: ProgressBar,
}

impl TranscriptPipeline {
    /// Create a pipeline backed by a headless browser
    pub fn new(config: &Config, show_progress: bool) -> Result<Self> {
        let fetcher = CaptionFetcher::new(&config.http, &config.browser.user_agent)?;
        let locator = Box::new(BrowserLocator::new(config.browser.clone()));

        let progress = if show_progress {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            spinner
        } else {
            ProgressBar::hidden()
        };

        Ok(Self::with_parts(locator, fetcher).with_progress(progress))
    }

    /// Create a pipeline from explicit parts, without progress output
    pub fn with_parts(locator: Box<dyn CaptionLocator>, fetcher: CaptionFetcher) -> Self {
        Self {
            locator,
            fetcher,
            progress: ProgressBar::hidden(),
        }
    }

    fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Extract the transcript for `input` in `format`
    pub async fn run(&self, input: &str, format: OutputFormat) -> Result<Transcript> {
        let video = VideoReference::parse(input)?;
        tracing::info!(
            "Extracting captions for {} via {}",
            video.canonical_url(),
            crate::utils::extract_domain(video.page_url().as_str()).unwrap_or_default()
        );
        tracing::debug!("Video reference kind: {:?}", video.kind());

        self.progress.enable_steady_tick(Duration::from_millis(120));
        let outcome = self.run_stages(video, format).await;
        self.progress.finish_and_clear();
        outcome
    }

    async fn run_stages(&self, video: VideoReference, format: OutputFormat) -> Result<Transcript> {
        self.progress.set_message("Loading video page...");
        let track = self.locator.locate(&video).await?;

        self.progress.set_message("Downloading captions...");
        let payload = self.fetcher.fetch(&track).await?;

        self.progress.set_message("Converting captions...");
        let content = convert(&payload, format)?;

        Ok(Transcript {
            video,
            track,
            format,
            content,
        })
    }
}
