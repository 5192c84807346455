//! Tantivy index management.
//!
//! Handles index creation and opening, in RAM or on disk.

use std::path::{Path, PathBuf};

use tantivy::Index;
use tracing::{debug, info};

use crate::error::SearchError;
use crate::schema::build_page_schema;

/// Default memory budget for IndexWriter (50MB)
pub const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Search index configuration
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Path to index directory; `None` keeps the index in RAM
    pub index_path: Option<PathBuf>,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }
}

impl SearchIndexConfig {
    /// Config for an in-memory index.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Config for an index persisted under `index_path`.
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: Some(index_path.into()),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

/// Open an existing index or create a new one.
pub fn open_or_create_index(config: &SearchIndexConfig) -> Result<Index, SearchError> {
    match &config.index_path {
        None => {
            debug!("Creating in-memory index");
            Ok(Index::create_in_ram(build_page_schema().schema().clone()))
        }
        Some(path) => open_or_create_in_dir(path),
    }
}

fn open_or_create_in_dir(path: &Path) -> Result<Index, SearchError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        Ok(Index::open_in_dir(path)?)
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = build_page_schema();
        Ok(Index::create_in_dir(path, schema.schema().clone())?)
    }
}
