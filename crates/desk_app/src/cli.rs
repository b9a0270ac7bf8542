use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "deskbot")]
#[command(about = "Retrieval-augmented customer-support chatbot")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./deskbot.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a single query and exit
    Ask {
        /// Username whose history records the exchange
        #[arg(long)]
        user: Option<String>,
        query: String,
    },
    /// Interactive chat session on stdin/stdout
    Chat {
        #[arg(long)]
        user: Option<String>,
    },
    /// Offline index artifacts
    #[command(subcommand)]
    Index(IndexCommand),
    /// Load the FAQ files and print the effective entries after precedence
    FaqCheck,
    /// Create a user account
    UserAdd { username: String, password: String },
    /// Print a user's chat history
    History { username: String },
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Chunk the corpus, embed every chunk and write the artifact pair
    Build {
        /// Corpus directory (defaults to the configured one)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Show the manifest of the last completed build
    Status,
}
