use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "slack-backup", version)]
#[command(
    about = "A tool for downloading message history from Slack. Downloads the \
             message history for all your public channels, private channels, \
             and direct message threads, resuming where the previous run left off."
)]
pub struct Cli {
    /// Output directory for the archive
    #[arg(long, default_value = ".")]
    pub outdir: PathBuf,

    /// Slack API token; falls back to SLACK_TOKEN, then slack-backup.toml
    #[arg(long)]
    pub token: Option<String>,
}
