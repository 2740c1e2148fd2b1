use anyhow::{Context, Result};
use binder::{assemble, Config};
use clap::Parser;
use std::path::PathBuf;

/// Assembles the book's Markdown chapters into a single LaTeX document.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file; defaults to `book.toml` in the working directory if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    // Read configuration
    let config = Config::load(cli.config.as_deref()).context("failed to read configuration")?;

    // Build the book
    let output_path = assemble(&config).context("failed to assemble book")?;

    println!("{}", output_path.display());

    Ok(())
}
