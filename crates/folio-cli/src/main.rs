//! # Folio CLI
//!
//! Command-line interface for the Folio bibliography browser.
//!
//! ## Commands
//!
//! - `folio query [text]` - Filter, sort and page through the library
//! - `folio browse` - Start the interactive terminal browser
//! - `folio stats` - Show dataset, hierarchy and index statistics
//! - `folio collections` - Print the collection tree
//! - `folio check` - Report collection hierarchy problems
//!
//! ## Example Usage
//!
//! ```bash
//! # Records mentioning "deep" in the NLP collection, newest first
//! folio query deep --collection nlp --sort year --desc
//!
//! # Reopen a shared view
//! folio query --state "q=deep&collection=nlp&page=2"
//!
//! # Interactive browsing
//! folio browse
//! ```

mod app;
mod commands;
mod tui;

use clap::{Parser, Subcommand};
use folio_core::SortKey;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Folio - Search and browse a bibliography
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the datasets (overrides the config)
    #[arg(short, long, global = true, env = "FOLIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, sort and page through the library
    Query {
        /// Search text (all terms must match)
        text: Option<String>,

        /// Restrict to a collection and its sub-collections
        #[arg(short = 'C', long)]
        collection: Option<String>,

        /// Sort key (title, author, year, venue, type)
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// Sort in descending order
        #[arg(long)]
        desc: bool,

        /// Page to show (paged mode)
        #[arg(short, long)]
        page: Option<usize>,

        /// Start from a shared state encoding
        #[arg(long)]
        state: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Start the interactive terminal browser
    #[command(alias = "i")]
    Browse {
        /// Start from a shared state encoding
        #[arg(long)]
        state: Option<String>,
    },

    /// Show dataset, hierarchy and index statistics
    Stats,

    /// Print the collection tree with item counts
    Collections,

    /// Report collection hierarchy problems
    Check,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => folio_core::Config::load_from(path)?,
        None => folio_core::Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.general.data_dir = Some(dir);
    }

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    // The browser owns the terminal; keep log lines off it
    let quiet_terminal = matches!(cli.command, Commands::Browse { .. }) && cli.verbose == 0;
    let filter = if quiet_terminal {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Query {
            text,
            collection,
            sort,
            desc,
            page,
            state,
            output,
        } => commands::query::run(
            config,
            commands::query::QueryArgs {
                text,
                collection,
                sort,
                desc,
                page,
                state,
            },
            output,
        ),
        Commands::Browse { state } => tui::run(config, state.as_deref()),
        Commands::Stats => commands::stats::run(config),
        Commands::Collections => commands::collections::run(config),
        Commands::Check => commands::check::run(config),
    }
}
