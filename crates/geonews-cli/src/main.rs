//! Geonews CLI - Command-line interface
//!
//! Usage:
//!   geonews run [--input <csv>] [--output <csv>] [--checkpoint <file>] [--publish]
//!   geonews extract <text> [--outlet <name>]
//!   geonews export-geojson [--input <csv>] [--output <geojson>]
//!   geonews publish [--file <csv>] [--message <msg>]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use geonews_core::{AppConfig, LoggingConfig, NlpBackend, SourceRecord, UNKNOWN_OUTLET};
use geonews_dataset::{export_geojson, CheckpointStore, SourceDataset};
use geonews_pipeline::{GitPublisher, Pipeline, PublishOutcome};

#[derive(Parser)]
#[command(name = "geonews")]
#[command(about = "Geolocate events in Spanish-language news")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables take precedence)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Language model backend: rules or http
    #[arg(long, global = true)]
    nlp: Option<NlpBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process new records of the source dataset
    Run {
        /// Source news CSV
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output locations CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Checkpoint file
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Publish the output with git after the run
        #[arg(long)]
        publish: bool,
    },
    /// Extract locations from a single text and print them as JSON
    Extract {
        /// News text
        text: String,
        /// Outlet name
        #[arg(long, default_value = UNKNOWN_OUTLET)]
        outlet: String,
    },
    /// Convert the output CSV to GeoJSON for the map
    ExportGeojson {
        /// Output locations CSV
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// GeoJSON file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Commit and push the output dataset
    Publish {
        /// File to publish
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(backend) = cli.nlp {
        config.nlp.backend = backend;
    }
    init_tracing(&config.logging);
    info!(
        input = %config.input.path.display(),
        output = %config.output.csv_path.display(),
        nlp = ?config.nlp.backend,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run {
            input,
            output,
            checkpoint,
            publish,
        } => {
            if let Some(path) = input {
                config.input.path = path;
            }
            if let Some(path) = output {
                config.output.csv_path = path;
            }
            if let Some(path) = checkpoint {
                config.output.checkpoint_path = path;
            }
            config.publish.enabled |= publish;
            run(&config).await?;
        }
        Commands::Extract { text, outlet } => {
            let pipeline =
                Pipeline::from_config(&config).context("Failed to initialize pipeline")?;
            let rows = pipeline
                .process_record(&SourceRecord::new(outlet, text, 1))
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::ExportGeojson { input, output } => {
            let input = input.unwrap_or(config.output.csv_path);
            let output = output.unwrap_or(config.output.geojson_path);
            let summary = export_geojson(&input, &output)
                .with_context(|| format!("Failed to export {}", input.display()))?;
            println!(
                "Wrote {} features to {} ({} rows without coordinates skipped)",
                summary.features,
                output.display(),
                summary.skipped
            );
        }
        Commands::Publish { file, message } => {
            let file = file.unwrap_or(config.output.csv_path);
            let outcome = publisher(message.or(config.publish.commit_message)).publish(&file);
            print_outcome(&outcome);
        }
    }

    Ok(())
}

async fn run(config: &AppConfig) -> Result<()> {
    let dataset = SourceDataset::load_with_names(&config.input.path, &config.input.encodings)
        .with_context(|| format!("Failed to read {}", config.input.path.display()))?;
    let pipeline = Pipeline::from_config(config).context("Failed to initialize pipeline")?;
    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);

    let summary = pipeline
        .run(&dataset, &config.output.csv_path, &checkpoint)
        .await?;

    if !summary.has_new_records() {
        println!("No new records to process");
        return Ok(());
    }

    println!("Records processed: {}", summary.records_processed);
    println!("Empty records skipped: {}", summary.records_skipped_empty);
    println!("Locations extracted: {}", summary.rows_written);
    println!("Results saved to: {}", config.output.csv_path.display());
    println!("Checkpoint: record {}", summary.last_checkpoint);

    if config.publish.enabled {
        let outcome =
            publisher(config.publish.commit_message.clone()).publish(&config.output.csv_path);
        print_outcome(&outcome);
    }

    Ok(())
}

fn publisher(message: Option<String>) -> GitPublisher {
    GitPublisher::new(".").with_message(message)
}

fn print_outcome(outcome: &PublishOutcome) {
    println!("Publish: {outcome}");
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
