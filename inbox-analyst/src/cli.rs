use std::path::PathBuf;

use clap::Parser;

/// Fetches recent Gmail messages, analyzes each one with an OpenAI model and
/// prints a summary report.
#[derive(Debug, Parser)]
#[command(name = "inbox-analyst", version)]
pub struct Cli {
    /// Maximum number of messages to process
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u32).range(1..))]
    pub max_messages: Option<u32>,

    /// Gmail search query, e.g. "is:unread label:work"
    #[arg(long, short)]
    pub query: Option<String>,

    /// Where to write the processed messages as JSON
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to inbox-analyst.toml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Print the report without writing the JSON file
    #[arg(long)]
    pub no_save: bool,
}
