//! CLI argument parsing for the wiki indexer.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Wiki Indexer
///
/// Builds frontmatter and full-text indexes over a directory of markdown
/// pages, concurrently and in the background.
#[derive(Parser, Debug)]
#[command(name = "wiki-indexer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/wiki-index/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the pages directory
    #[arg(short, long, global = true)]
    pub pages_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Indexer commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index every page, logging progress until done
    Index {
        /// Print the final progress snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query the frontmatter index
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },

    /// Full-text search over page titles and bodies
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

/// Frontmatter query subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommands {
    /// Pages whose field at PATH equals VALUE
    Exact {
        /// Dotted key path, e.g. `author.name`
        path: String,
        value: String,
    },

    /// Pages that have any value at PATH
    Exists {
        /// Dotted key path
        path: String,
    },

    /// Pages whose field at PATH starts with PREFIX
    Prefix {
        /// Dotted key path
        path: String,
        prefix: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_index() {
        let cli = Cli::parse_from(["wiki-indexer", "index"]);
        assert!(matches!(cli.command, Commands::Index { json: false }));
        assert!(cli.config.is_none());

        let cli = Cli::parse_from(["wiki-indexer", "index", "--json"]);
        assert!(matches!(cli.command, Commands::Index { json: true }));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "wiki-indexer",
            "index",
            "--config",
            "/tmp/wiki.toml",
            "--log-level",
            "debug",
            "--pages-dir",
            "/tmp/pages",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/wiki.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.pages_dir.as_deref(), Some("/tmp/pages"));
    }

    #[test]
    fn test_cli_query_exact() {
        let cli = Cli::parse_from(["wiki-indexer", "query", "exact", "author.name", "ada"]);
        match cli.command {
            Commands::Query {
                command: QueryCommands::Exact { path, value },
            } => {
                assert_eq!(path, "author.name");
                assert_eq!(value, "ada");
            }
            _ => panic!("Expected Query Exact command"),
        }
    }

    #[test]
    fn test_cli_query_prefix_and_exists() {
        let cli = Cli::parse_from(["wiki-indexer", "query", "prefix", "tags", "too"]);
        assert!(matches!(
            cli.command,
            Commands::Query {
                command: QueryCommands::Prefix { .. }
            }
        ));

        let cli = Cli::parse_from(["wiki-indexer", "query", "exists", "tags"]);
        assert!(matches!(
            cli.command,
            Commands::Query {
                command: QueryCommands::Exists { .. }
            }
        ));
    }

    #[test]
    fn test_cli_search_limit() {
        let cli = Cli::parse_from(["wiki-indexer", "search", "hammer", "-n", "3"]);
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "hammer");
                assert_eq!(limit, 3);
            }
            _ => panic!("Expected Search command"),
        }
    }
}
