use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use telecheck::models::transcript::format_for_sheet;
use telecheck::{
    resolve_agent_tag, run_quality_check_batch, BatchConfig, OpenAiClient, OpenAiConfig,
    RetryPolicy, RetryingCompletion, Roster, RowStore, SheetsClient, SheetsConfig,
    TranscriptionClient, TranscriptionConfig,
};

#[derive(Parser)]
#[command(name = "telecheck")]
#[command(author, version, about = "Phone-sales call transcription and quality audit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe audio files with speaker diarization and append them to the sheet
    Transcribe {
        /// Audio files to transcribe
        #[arg(short, long, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Expected number of speakers per call
        #[arg(long, default_value = "2")]
        speakers: u32,

        /// Language code for the transcription provider
        #[arg(long, default_value = "ja")]
        language: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the rubric quality check over pending sheet rows
    Check {
        /// Maximum number of pending rows to process
        #[arg(long, default_value = "50")]
        max_rows: usize,

        /// Buffered records per sheet flush
        #[arg(long, default_value = "5")]
        batch_size: usize,

        /// Agent roster: a comma-separated list, or @path to a file with one name per line
        #[arg(long)]
        roster: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            input,
            speakers,
            language,
            verbose,
        } => {
            setup_logging(verbose);
            transcribe_files(input, speakers, language).await
        }
        Commands::Check {
            max_rows,
            batch_size,
            roster,
            verbose,
        } => {
            setup_logging(verbose);
            run_check(max_rows, batch_size, &roster).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn transcribe_files(inputs: Vec<PathBuf>, speakers: u32, language: String) -> Result<()> {
    anyhow::ensure!(!inputs.is_empty(), "no input files given");

    let mut transcription_config =
        TranscriptionConfig::from_env().context("transcription provider not configured")?;
    transcription_config.speakers_expected = speakers;
    transcription_config.language = language;
    let transcriber = TranscriptionClient::new(transcription_config);

    let store = SheetsClient::new(SheetsConfig::from_env().context("sheet store not configured")?);

    let mut processed = 0usize;
    let mut failed = 0usize;

    for (i, path) in inputs.iter().enumerate() {
        info!("transcribing {:?} ({}/{})", path, i + 1, inputs.len());

        let audio = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("skipping {:?}: {}", path, e);
                failed += 1;
                continue;
            }
        };

        let transcript = match transcriber
            .transcribe(audio, |stage| info!("{:?}: {}", path, stage))
            .await
        {
            Ok(Some(transcript)) => transcript,
            Ok(None) => {
                warn!("skipping {:?}: transcription failed or timed out", path);
                failed += 1;
                continue;
            }
            Err(e) => {
                warn!("skipping {:?}: {}", path, e);
                failed += 1;
                continue;
            }
        };

        // One role map per transcript, shared by every formatter
        let agent_tag = resolve_agent_tag(&transcript);
        let roles = match &agent_tag {
            Some(tag) => transcript.role_map(tag),
            None => {
                warn!("{:?}: no agent could be attributed", path);
                transcript.role_map("")
            }
        };

        let formatted = format_for_sheet(&transcript, &roles);
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        store
            .append_transcript(&formatted, &source)
            .await
            .with_context(|| format!("failed to save transcript for {:?}", path))?;
        info!("{:?}: saved to sheet", path);
        processed += 1;
    }

    info!("done: {} transcribed, {} failed", processed, failed);
    Ok(())
}

async fn run_check(max_rows: usize, batch_size: usize, roster_arg: &str) -> Result<()> {
    let roster = parse_roster(roster_arg)?;
    anyhow::ensure!(!roster.is_empty(), "roster is empty");

    let completion = RetryingCompletion::new(
        OpenAiClient::new(OpenAiConfig::from_env().context("completion provider not configured")?),
        RetryPolicy::default(),
    );
    let store = SheetsClient::new(SheetsConfig::from_env().context("sheet store not configured")?);

    let config = BatchConfig {
        max_rows,
        batch_size,
        ..Default::default()
    };

    let report = run_quality_check_batch(&store, &completion, &roster, &config, |progress| {
        info!(
            "{}/{} rows processed ({} ok, {} failed)",
            progress.rows_processed, progress.rows_read, progress.succeeded, progress.failed
        );
    })
    .await
    .context("quality check batch failed")?;

    info!(
        "quality check complete: {} rows, {} ok, {} failed, {} skipped as too short",
        report.rows_read, report.succeeded, report.failed, report.skipped_short
    );
    Ok(())
}

fn parse_roster(arg: &str) -> Result<Roster> {
    if let Some(path) = arg.strip_prefix('@') {
        Roster::from_file(std::path::Path::new(path))
            .with_context(|| format!("failed to read roster file {}", path))
    } else {
        Ok(Roster::from_csv(arg))
    }
}
