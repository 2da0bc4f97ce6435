use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use sausages::archive;

#[derive(Parser)]
#[command(name = "arc")]
#[command(about = "Pack, list and unpack game data archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pack files into a new archive
    #[command(name = "c", alias = "create")]
    Create {
        archive: PathBuf,
        files: Vec<PathBuf>,
    },
    /// Print the archive directory
    #[command(name = "l", alias = "list")]
    List { archive: PathBuf },
    /// Unpack every entry, by default into the current directory
    #[command(name = "x", alias = "extract")]
    Extract {
        archive: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Create { archive, files } => create(archive, files),
        Command::List { archive } => list(archive),
        Command::Extract { archive, dir } => extract(archive, dir),
    }
}

fn create(archive: PathBuf, files: Vec<PathBuf>) -> Result<()> {
    if files.is_empty() {
        bail!("arc c: need files to pack");
    }

    let entries = archive::create(&archive, &files)
        .with_context(|| format!("Failed to create {}", archive.display()))?;

    log::info!("Packed {} files into {}", entries.len(), archive.display());
    Ok(())
}

fn list(archive: PathBuf) -> Result<()> {
    let entries = archive::list(&archive)
        .with_context(|| format!("Failed to list {}", archive.display()))?;

    println!("{:<56} {:>10} {:>10}", "name", "offset", "size");
    for entry in entries {
        println!("{:<56} {:>10} {:>10}", entry.name, entry.offset, entry.size);
    }
    Ok(())
}

fn extract(archive: PathBuf, dir: PathBuf) -> Result<()> {
    let summary = archive::extract_all(&archive, &dir)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    log::info!(
        "Extracted {} entries into {}",
        summary.extracted.len(),
        dir.display()
    );
    if !summary.skipped.is_empty() {
        log::warn!("Skipped {} entries", summary.skipped.len());
    }
    Ok(())
}
