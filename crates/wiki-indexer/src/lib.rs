//! Wiki indexer library exports.
//!
//! This crate provides the command-line indexer binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (index, query, search)
//! - `store`: Markdown pages on disk as a page source

pub mod cli;
pub mod commands;
pub mod store;

pub use cli::{Cli, Commands, QueryCommands};
pub use commands::{
    index_pages, init_logging, load_settings, run_index, run_query, run_search, WikiIndexes,
};
pub use store::{split_frontmatter, FilePageStore};
