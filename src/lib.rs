//! Vimeo Transcript - A Rust CLI tool for extracting closed-caption transcripts from Vimeo
//!
//! This library drives a headless browser to a video (or showcase) page, finds the caption
//! track the embedded player exposes, downloads it and renders it as plain text or WebVTT.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod fetch;
pub mod output;
pub mod transcript;
pub mod utils;

use std::path::PathBuf;

pub use cli::{Cli, OutputFormat};
pub use config::Config;
pub use extractors::{CaptionLocator, CaptionTrack, VideoReference};
pub use fetch::CaptionFetcher;
pub use transcript::{Transcript, TranscriptPipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error kinds a transcript extraction can end with
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid video URL: {0}")]
    InvalidVideoUrl(String),

    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Could not load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Could not find transcript/captions for this video. The video may not have captions enabled.")]
    NoCaptions,

    #[error("Failed to download captions: {0}")]
    Fetch(String),

    #[error("Malformed WebVTT at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Failed to write transcript to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TranscriptError {
    /// Process exit code reported for this kind of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            TranscriptError::InvalidVideoUrl(_) => 2,
            TranscriptError::BrowserLaunch(_) | TranscriptError::Navigation { .. } => 3,
            TranscriptError::Timeout { .. } => 4,
            TranscriptError::NoCaptions => 5,
            TranscriptError::Fetch(_) => 6,
            TranscriptError::Parse { .. } => 7,
            TranscriptError::Io { .. } => 8,
        }
    }
}

/// Exit code for an error chain: the first typed kind found wins, anything else is 1
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<TranscriptError>())
        .map(TranscriptError::exit_code)
        .unwrap_or(1)
}
