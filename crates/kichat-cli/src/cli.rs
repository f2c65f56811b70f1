use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kichat", about = "Chat with an OpenRouter model from the terminal", version)]
pub struct Cli {
    /// Path to config file (defaults to ~/.kichat/config.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model to use, overriding the config
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Keep chats in memory only; no database is opened
    #[arg(long)]
    pub guest: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
