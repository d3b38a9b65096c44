use clap::{Parser, Subcommand};
use crackbatu::config::Config;
use crackbatu::delivery::{DeliveryAdapter, DeliveryOutcome, DocumentReference, LogNotifier};
use crackbatu::fetcher::DocumentFetcher;
use crackbatu::resolver;
use crackbatu::sink::FsSink;
use std::path::PathBuf;
use std::sync::Arc;

/// Crack BATU - watermarking download pipeline for archived exam papers
#[derive(Parser, Debug)]
#[command(name = "crackbatu")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a shared paper, watermark every page, and save it locally
    Download {
        /// Share link of the paper
        share_url: String,

        /// Display title used for the filename
        #[arg(long)]
        title: String,

        /// Year label used for the filename
        #[arg(long)]
        year: String,

        /// Override the configured download directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the direct-download URL for a share link
    Resolve { share_url: String },

    /// Print the provider preview URL for a share link
    Preview { share_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging subsystem
    crackbatu::logging::init_subscriber().expect("Failed to initialize logging subsystem");

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?,
        None => {
            tracing::info!("No configuration file given; using defaults");
            Config::default()
        }
    };

    match args.command {
        Command::Download {
            share_url,
            title,
            year,
            out_dir,
        } => {
            let fetcher = DocumentFetcher::new(config.fetch.to_fetcher_config())?;
            let download_dir = out_dir.unwrap_or_else(|| config.download.dir.clone());

            tracing::info!(
                share_url = %share_url,
                download_dir = %download_dir.display(),
                watermark_text = %config.watermark.text,
                "Starting download"
            );

            let adapter = DeliveryAdapter::new(
                Arc::new(fetcher),
                Arc::new(FsSink::new(download_dir)),
                Arc::new(LogNotifier),
                config.watermark.clone(),
            );
            let doc_ref = DocumentReference {
                share_url,
                title,
                year,
            };

            // Both outcomes are terminal successes; fallback already
            // surfaced the original link.
            match adapter.deliver(&doc_ref).await {
                DeliveryOutcome::Saved(filename) => println!("Saved {}", filename),
                DeliveryOutcome::Fallback => {
                    println!("Watermarking failed; the original link was printed above")
                }
                DeliveryOutcome::AlreadyInFlight => {}
            }
        }
        Command::Resolve { share_url } => {
            println!("{}", resolver::resolve_direct_url(&share_url));
        }
        Command::Preview { share_url } => {
            println!("{}", resolver::preview_url(&share_url));
        }
    }

    Ok(())
}
