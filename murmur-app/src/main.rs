use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use murmur_common::observability::{LogConfig, LogFormat, init_logging};
use murmur_config::{MurmurConfig, MurmurConfigLoader};
use std::path::PathBuf;

mod driver;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Fetch, stream and score posts from Twitter", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "MURMUR_CONFIG", default_value = "murmur.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one page of a user's timeline and print the analysis
    Batch {
        /// Account to fetch (defaults to `batch.screen_name`)
        #[arg(long)]
        screen_name: Option<String>,

        /// Number of posts to fetch (defaults to `batch.count`)
        #[arg(long)]
        count: Option<u32>,

        /// Print the annotated table as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Append live posts matching the track terms to a file
    Stream {
        /// Output file (defaults to `stream.output_file`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Track terms; repeat the flag for more than one
        #[arg(short, long)]
        track: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg: MurmurConfig = MurmurConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let format: LogFormat = cfg
        .logging
        .format
        .parse()
        .map_err(anyhow::Error::msg)
        .context("logging.format")?;
    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::debug!(log = %log_path.display(), config = %cli.config.display(), "murmur.start");

    match cli.command {
        Commands::Batch {
            screen_name,
            count,
            json,
        } => {
            if let Some(name) = screen_name {
                cfg.batch.screen_name = name;
            }
            if let Some(count) = count {
                cfg.batch.count = count;
            }
            driver::run_batch(&cfg, json).await
        }
        Commands::Stream { output, track } => {
            if let Some(output) = output {
                cfg.stream.output_file = output;
            }
            if !track.is_empty() {
                cfg.stream.track = track;
            }
            driver::run_stream(&cfg).await
        }
    }
}
