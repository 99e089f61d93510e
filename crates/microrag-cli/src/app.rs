//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "microrag")]
#[command(
    author,
    version,
    about = "Guarded question answering over your documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),

    /// Answer a question from the indexed documents
    Ask(AskArgs),

    /// Run the query guardrails without answering
    Check(CheckArgs),

    /// Show or initialize the configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind, overriding server.bind
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question to answer
    pub question: Vec<String>,

    /// Number of passages to retrieve
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub top_k: Option<u8>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Query to validate
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the config file path only
    #[arg(long)]
    pub path: bool,

    /// Write the default configuration if no file exists
    #[arg(long, conflicts_with = "path")]
    pub init: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
