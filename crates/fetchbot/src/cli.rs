use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fetchbot")]
#[command(author, version, about = "Telegram bot that downloads media by URL and sends it back", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Plan a URL without Telegram: platform, mode, size estimate and quality menu
    Probe {
        /// URL to inspect
        url: String,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL locally and print the produced files
    Download {
        /// URL to download
        url: String,

        /// Quality: best, mp3 or a height such as 720p
        #[arg(short, long, default_value = "best")]
        quality: String,

        /// Output directory (defaults to DOWNLOAD_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
