//! rill-corpus binary - replays saved fuzz corpora through the parsers
//! that accept bytes from outside the process.

mod runner;
mod target;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use runner::{collect_cases, replay};

#[derive(Parser)]
#[command(name = "rill-corpus")]
#[command(about = "Replay fuzz corpus files against rill's untrusted-input parsers")]
#[command(version)]
struct Cli {
    /// Corpus files to replay
    #[arg(short, long)]
    file: Vec<PathBuf>,

    /// Directories of corpus files (regular files only, replayed in name order)
    #[arg(short, long)]
    directory: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cases = collect_cases(&cli.file, &cli.directory)?;
    if cases.is_empty() {
        anyhow::bail!("No corpus files to replay; pass --file and/or --directory");
    }

    let report = replay(&cases)?;

    println!("\n=== Corpus Replay Complete ===");
    println!("Cases:    {}", report.total());
    println!("Parsed:   {}", report.parsed);
    println!("Rejected: {}", report.rejected);
    println!("Panicked: {}", report.panicked.len());

    if !report.panicked.is_empty() {
        for case in &report.panicked {
            eprintln!("panicked: {}", case.display());
        }
        anyhow::bail!("{} of {} cases panicked", report.panicked.len(), report.total());
    }

    Ok(())
}
