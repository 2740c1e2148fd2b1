use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use common::{read_text, write_text};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_SITE_DIR: &str = "_build/html";
const DEFAULT_PATTERNS: [&str; 1] = ["thebe.js"];

/// Removes lines referencing unwanted scripts from every HTML file in a built site.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Directory of built HTML files; subdirectories are not searched
    #[arg(default_value = DEFAULT_SITE_DIR)]
    site_dir: Utf8PathBuf,

    /// Remove lines containing this text (repeatable)
    #[arg(short, long = "pattern", default_values = DEFAULT_PATTERNS)]
    patterns: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    let matcher = AhoCorasick::new(&cli.patterns).context("failed to build pattern matcher")?;

    for path in html_files(&cli.site_dir)? {
        let removed = strip_file(&path, &matcher)
            .with_context(|| format!("failed to filter {}", path.display()))?;
        info!(path = %path.display(), removed, "filtered file");
    }

    Ok(())
}

fn html_files(site_dir: &Utf8Path) -> Result<Vec<PathBuf>> {
    let pattern: Utf8PathBuf = [site_dir.as_str(), "*.html"].into_iter().collect();

    glob(pattern.as_str())
        .context("site directory does not form a valid glob pattern")?
        .map(|entry| entry.context("failed to access entry in site directory"))
        .collect()
}

/// Rewrites a file in place without the lines that match, returning how many lines were removed.
fn strip_file(path: &Path, matcher: &AhoCorasick) -> Result<usize> {
    let text = read_text(path)?;
    let (kept, removed) = strip_lines(&text, matcher);
    write_text(path, &kept)?;
    Ok(removed)
}

/// Drops every line containing any pattern. Kept lines retain their line terminators.
fn strip_lines(text: &str, matcher: &AhoCorasick) -> (String, usize) {
    let mut kept = String::with_capacity(text.len());
    let mut removed = 0;

    for line in text.split_inclusive('\n') {
        if matcher.is_match(line) {
            removed += 1;
        } else {
            kept.push_str(line);
        }
    }

    (kept, removed)
}
