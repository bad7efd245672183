//! `vecprep` command-line entry point.

mod commands;
mod config;
mod telemetry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

/// Build vocabularies and embedding matrices from pretrained word vectors.
#[derive(Parser, Debug)]
#[command(name = "vecprep", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a vector file and print vocabulary statistics
    Inspect(CommandArgs),
    /// Encode texts into vocabulary indices, one JSON array per line
    Encode(CommandArgs),
    /// Write the embedding matrix and vocabulary as a reloadable snapshot
    Export(CommandArgs),
}

#[derive(Args, Debug)]
struct CommandArgs {
    /// TOML settings file; defaults to `<command>.toml` when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Word-vector file, overriding `embeddings_path` from the settings
    #[arg(long)]
    embeddings: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Inspect(args) => commands::run_inspect(args.config, args.embeddings),
        Command::Encode(args) => commands::run_encode(args.config, args.embeddings),
        Command::Export(args) => commands::run_export(args.config, args.embeddings),
    }
}
