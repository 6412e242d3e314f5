//! CLI module for Sikt.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Sikt - Chat with your video corpus
///
/// A local-first CLI for conversational Q&A over indexed video segments.
/// The name "Sikt" comes from the Norwegian word for "sight."
#[derive(Parser, Debug)]
#[command(name = "sikt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Sikt and verify system requirements
    Init,

    /// Import pre-indexed video segments from a JSONL file
    Import {
        /// Path to a JSONL file of segment records with embeddings
        input: String,

        /// Replace existing segments for videos present in the file
        #[arg(short, long)]
        replace: bool,
    },

    /// Ask a single question grounded in the best-matching segment
    Ask {
        /// The question to ask
        question: String,

        /// Vision-language model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search for relevant video segments
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Start an interactive chat session over the video corpus
    Chat {
        /// Vision-language model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List indexed videos
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
