use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP merge service
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Download a video and an audio track once and merge them
    Merge {
        /// URL of the video input
        #[arg(long)]
        video_url: String,

        /// URL of the audio input
        #[arg(long)]
        audio_url: String,

        /// Where to write the merged file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check that the media engine can be executed
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
