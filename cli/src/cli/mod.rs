pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lia-proxy")]
#[command(author, version, about = "LIA voice assistant backend - chat API proxied to LM Studio")]
pub struct Cli {
    /// Path to config file (checked in order: local config.toml, ~/.config/lia-proxy/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat API server
    Start {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration and check the server and inference service
    Status,

    /// Send a single message to the model and print the reply
    Ask {
        /// Message to send
        message: String,

        /// JSON file with previous turns: [{"role": "user", "content": "..."}, ...]
        #[arg(long)]
        history: Option<PathBuf>,
    },
}
