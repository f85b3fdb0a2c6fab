use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vimeo-transcript",
    about = "Extract transcripts from Vimeo videos",
    version,
    long_about = "Loads a Vimeo video or showcase page in a headless browser, finds the caption track exposed by the embedded player and prints it as plain text or WebVTT.",
    after_help = "Examples:\n  vimeo-transcript https://vimeo.com/123456789\n  vimeo-transcript \"https://vimeo.com/showcase/MyShowcase?video=123456789\"\n  vimeo-transcript https://vimeo.com/123456789 --output transcript.txt\n  vimeo-transcript https://vimeo.com/123456789 --format vtt"
)]
pub struct Cli {
    /// Vimeo video URL, or a showcase URL carrying a `video` query parameter
    #[arg(value_name = "VIDEO_URL")]
    pub url: String,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable progress indicators and informational messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, timing and markup removed
    Text,
    /// WebVTT exactly as served
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
