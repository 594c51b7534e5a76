use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::align::{handle_align_command, AlignArgs};
use commands::dataset::{handle_dataset_command, DatasetCommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid alignment and change-sample tooling for land cover reference data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snap point samples to UTM grid cells and write their polygons
    Align(AlignArgs),
    /// Inspect a change-sample dataset described by a TOML config
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Align(args) => handle_align_command(args),
        Command::Dataset { command } => handle_dataset_command(command),
    }
}
