//! Wiki Indexer
//!
//! Builds frontmatter and full-text indexes over a directory of markdown
//! pages in the background.
//!
//! # Usage
//!
//! ```bash
//! wiki-indexer index [--pages-dir DIR] [--json]
//! wiki-indexer query exact|exists|prefix PATH [VALUE]
//! wiki-indexer search QUERY [-n LIMIT]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/wiki-index/config.toml)
//! 3. Environment variables (WIKI_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use wiki_indexer::{init_logging, load_settings, run_index, run_query, run_search, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.pages_dir.as_deref(),
    )?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Index { json } => {
            run_index(&settings, json).await?;
        }
        Commands::Query { command } => {
            run_query(&settings, command).await?;
        }
        Commands::Search { query, limit } => {
            run_search(&settings, &query, limit).await?;
        }
    }

    Ok(())
}
