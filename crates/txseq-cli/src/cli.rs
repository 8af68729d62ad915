use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "txseq",
    about = "Inspect and compare transaction sequence status snapshots",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write an empty status snapshot
    Init(InitArgs),
    /// Decode and print a status snapshot
    Inspect(InspectArgs),
    /// List transactions confirmed in REMOTE but not in LOCAL
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Node that owns the sequence space
    #[arg(long)]
    pub owner: String,
    /// Number of slots
    #[arg(long, default_value = "1000")]
    pub capacity: usize,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
    pub out: PathBuf,
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Also dump the raw encoded bytes
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub local: PathBuf,
    pub remote: PathBuf,
}
