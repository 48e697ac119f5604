//! CLI parser and command dispatch.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "gbstd")]
#[command(about = "GB national standard document acquisition tool")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./gbstd.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory (overrides config file)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing page and print discovered identifiers
    List,

    /// Acquire every document on the current listing page
    Run {
        /// Accept OCR guesses without prompting; attempts with no
        /// guess are skipped
        #[arg(long)]
        non_interactive: bool,
    },

    /// Acquire a single document by its hcno identifier
    Download {
        /// Identifier from the listing page (hcno)
        hcno: String,

        /// Accept OCR guesses without prompting
        #[arg(long)]
        non_interactive: bool,
    },
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(output) = cli.output {
        settings.save_dir = output;
    }

    match cli.command {
        Commands::List => commands::cmd_list(&settings).await,
        Commands::Run { non_interactive } => commands::cmd_run(&settings, non_interactive).await,
        Commands::Download {
            hcno,
            non_interactive,
        } => commands::cmd_download(&settings, &hcno, non_interactive).await,
    }
}
