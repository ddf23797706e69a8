//! CLI module for Syllabus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Syllabus - Course Material Q&A
///
/// Ask questions about indexed course material. A language model searches
/// course content and outlines with tools and answers with citations.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
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
    /// Ask a question about the course material
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum number of tool rounds
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Print the tool calls the model made
        #[arg(long)]
        show_tools: bool,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the outline of a course
    Outline {
        /// Course name (partial matches work)
        course: String,
    },

    /// List indexed courses
    Courses,

    /// Import a pre-chunked course from a JSON file
    Import {
        /// Path to the course JSON file
        file: String,
    },

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

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "llm.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
