//! CLI interface for Scrivo.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use output::OutputMode;

/// Scrivo - codex reference detection and cursor context for fiction writing
#[derive(Parser)]
#[command(name = "scrivo", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.scrivo)
    #[arg(long, env = "SCRIVO_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Config file (default: {data_path}/scrivo.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Entity catalog file, YAML or JSON (default: {data_path}/catalog.yaml)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find catalog entity references in a text file
    Detect {
        /// Text file to scan ("-" for stdin)
        file: PathBuf,
        /// Override the minimum confidence threshold
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Detect catalog concepts, or complete a partial name
    Concepts {
        /// Text file to scan ("-" for stdin)
        file: Option<PathBuf>,
        /// List concepts whose name or alias matches this prefix/substring
        #[arg(long)]
        complete: Option<String>,
    },

    /// Extract the context windows and keywords around a cursor
    Context {
        /// Text file ("-" for stdin)
        file: PathBuf,
        /// Cursor position in characters
        #[arg(long, allow_negative_numbers = true)]
        cursor: i64,
    },

    /// Build the retrieval query for a cursor position
    Collect {
        /// Text file ("-" for stdin)
        file: PathBuf,
        /// Cursor position in characters
        #[arg(long, allow_negative_numbers = true)]
        cursor: i64,
    },

    /// Apply typographic auto-replacement (smart quotes, dashes, ellipsis)
    Replace {
        /// Text file ("-" for stdin)
        file: PathBuf,
        /// Only replace near this cursor position
        #[arg(long)]
        cursor: Option<usize>,
        /// Write the result back to the file
        #[arg(long)]
        write: bool,
    },

    /// Show catalog, detector, and collector statistics
    Stats,
}

/// Execute a CLI command.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Detect { file, threshold } => {
            handlers::detect::handle_detect(ctx, file, *threshold, mode)?
        }

        Commands::Concepts { file, complete } => {
            handlers::detect::handle_concepts(ctx, file.as_deref(), complete.as_deref(), mode)?
        }

        Commands::Context { file, cursor } => {
            handlers::context::handle_context(ctx, file, *cursor, mode)?
        }

        Commands::Collect { file, cursor } => {
            handlers::context::handle_collect(ctx, file, *cursor, mode).await?
        }

        Commands::Replace {
            file,
            cursor,
            write,
        } => handlers::utility::handle_replace(ctx, file, *cursor, *write, mode)?,

        Commands::Stats => handlers::utility::handle_stats(ctx, mode)?,
    }

    Ok(())
}
