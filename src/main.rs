//! Scrivo - writing-assistant core for fiction
//!
//! Usage:
//!   scrivo detect chapter.txt                 Find catalog references
//!   scrivo concepts --complete 陈             Autocomplete a name
//!   scrivo collect chapter.txt --cursor 420   Build the retrieval query at a cursor
//!   scrivo replace chapter.txt --write        Smart quotes, dashes, ellipsis
//!   scrivo --help                             Show all commands

use anyhow::Result;
use clap::Parser;

use scrivo::cli::output::OutputMode;
use scrivo::cli::Cli;
use scrivo::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scrivo=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);
    let ctx = AppContext::new(
        cli.data_path.clone(),
        cli.config.as_deref(),
        cli.catalog.as_deref(),
    )?;
    scrivo::cli::execute(&cli.command, &ctx, mode).await?;

    Ok(())
}
