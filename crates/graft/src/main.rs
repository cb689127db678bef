//! graft CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "graft")]
#[command(version)]
#[command(about = "Merge YAML documents and evaluate (( operator )) expressions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge documents in order and evaluate their operators
    Merge {
        /// Documents to merge; later files override earlier ones
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Concatenate lists that carry no merge directive instead of merging them by position
        #[arg(long)]
        fallback_append: bool,

        /// Merge only; leave (( operator )) expressions unevaluated
        #[arg(long)]
        skip_eval: bool,

        /// Remove PATH from the output (repeatable)
        #[arg(long, value_name = "PATH")]
        prune: Vec<String>,

        /// YAML file of secrets (`path: { key: value }`) for (( vault ))
        #[arg(long, value_name = "FILE")]
        secrets: Option<PathBuf>,

        /// Replace every (( vault )) secret with REDACTED
        #[arg(long)]
        redact: bool,

        /// Write JSON instead of YAML
        #[arg(long)]
        json: bool,

        /// Show debug output
        #[arg(long)]
        debug: bool,
    },
}

fn init_logging(debug: bool) {
    let default = if debug { "graft=debug" } else { "graft=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            files,
            fallback_append,
            skip_eval,
            prune,
            secrets,
            redact,
            json,
            debug,
        } => {
            init_logging(debug);
            commands::merge::execute(commands::merge::MergeArgs {
                files,
                fallback_append,
                skip_eval,
                prune,
                secrets,
                redact,
                json,
            })
        }
    }
}
