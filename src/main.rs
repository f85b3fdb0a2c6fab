use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vimeo_transcript::{exit_code_for, output, Cli, Config, TranscriptPipeline};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the transcript, so logs go to stderr
    let default_filter = if cli.verbose {
        "vimeo_transcript=debug"
    } else if cli.quiet {
        "vimeo_transcript=warn"
    } else {
        "vimeo_transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", console::style("Error:").red().bold(), err);
        std::process::exit(exit_code_for(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let show_progress = !cli.quiet && console::Term::stderr().is_term();
    let pipeline = TranscriptPipeline::new(&config, show_progress)?;

    let transcript = pipeline.run(&cli.url, cli.format).await?;

    output::write_transcript(&transcript, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        if !cli.quiet {
            eprintln!("Transcript saved to: {}", path.display());
        }
    }

    Ok(())
}
