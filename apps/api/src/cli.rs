use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "returns-api")]
#[command(version, about = "Customer-returns desk: extract, decide, draft a reply")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve,

    /// Run one email through the pipeline and print the drafted reply
    Process {
        /// File holding the customer email, or "-" for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the full run (case record, timestamps) as JSON instead of the reply
        #[arg(long)]
        json: bool,
    },
}

/// Reads the email text from `path` ("-" means stdin). Blank input is an error.
pub fn read_email(path: &Path) -> Result<String> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read email from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read email from {}", path.display()))?
    };

    if text.trim().is_empty() {
        bail!("Email input is empty");
    }
    Ok(text)
}
