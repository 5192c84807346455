//! Configuration loading for the wiki indexer.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/wiki-index/config.toml.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Worker pool sizing and progress reporting for background indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingSettings {
    /// Workers draining the frontmatter index queue
    #[serde(default = "default_frontmatter_workers")]
    pub frontmatter_workers: usize,

    /// Workers draining the full-text index queue
    #[serde(default = "default_search_workers")]
    pub search_workers: usize,

    /// How often the CLI logs a progress snapshot (ms)
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
}

fn default_frontmatter_workers() -> usize {
    4
}

fn default_search_workers() -> usize {
    2
}

fn default_progress_interval() -> u64 {
    500
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            frontmatter_workers: default_frontmatter_workers(),
            search_workers: default_search_workers(),
            progress_interval_ms: default_progress_interval(),
        }
    }
}

impl IndexingSettings {
    /// Validate configuration values.
    ///
    /// Worker counts must be positive; a coordinator built with zero
    /// workers for an index would never drain its queue.
    pub fn validate(&self) -> Result<(), String> {
        if self.frontmatter_workers == 0 {
            return Err("frontmatter_workers must be > 0".to_string());
        }
        if self.search_workers == 0 {
            return Err("search_workers must be > 0".to_string());
        }
        if self.progress_interval_ms == 0 {
            return Err("progress_interval_ms must be > 0".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory containing the markdown pages
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for the full-text index; in-memory when unset
    #[serde(default)]
    pub search_index_path: Option<String>,

    /// Memory budget for the full-text index writer (MB)
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Background indexing settings
    #[serde(default)]
    pub indexing: IndexingSettings,
}

fn default_pages_dir() -> String {
    ProjectDirs::from("", "", "wiki-index")
        .map(|p| p.data_local_dir().join("pages"))
        .unwrap_or_else(|| PathBuf::from("./pages"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            log_level: default_log_level(),
            search_index_path: None,
            writer_memory_mb: default_writer_memory_mb(),
            indexing: IndexingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/wiki-index/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (WIKI_*, nested keys separated by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, IndexError> {
        let config_dir = ProjectDirs::from("", "", "wiki-index")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");
        let indexing = IndexingSettings::default();

        let mut builder = Config::builder()
            .set_default("pages_dir", default_pages_dir())
            .map_err(|e| IndexError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| IndexError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| IndexError::Config(e.to_string()))?
            .set_default(
                "indexing.frontmatter_workers",
                indexing.frontmatter_workers as i64,
            )
            .map_err(|e| IndexError::Config(e.to_string()))?
            .set_default("indexing.search_workers", indexing.search_workers as i64)
            .map_err(|e| IndexError::Config(e.to_string()))?
            .set_default(
                "indexing.progress_interval_ms",
                indexing.progress_interval_ms as i64,
            )
            .map_err(|e| IndexError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // WIKI_LOG_LEVEL, WIKI_INDEXING__SEARCH_WORKERS, ...
        builder = builder.add_source(
            Environment::with_prefix("WIKI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        settings.indexing.validate().map_err(IndexError::Config)?;
        Ok(settings)
    }

    /// Expand ~ in pages_dir to the home directory
    pub fn expanded_pages_dir(&self) -> PathBuf {
        expand_home(&self.pages_dir)
    }

    /// Expanded full-text index directory, if one is configured
    pub fn expanded_search_index_path(&self) -> Option<PathBuf> {
        self.search_index_path.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
