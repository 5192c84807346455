//! Command implementations for the wiki indexer.
//!
//! Handles:
//! - index: Build every index in the background, logging progress
//! - query: Build the indexes, then answer one frontmatter query
//! - search: Build the indexes, then run one full-text search

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use wiki_frontmatter::FrontmatterIndex;
use wiki_indexing::{BackgroundIndexingCoordinator, IndexingProgress};
use wiki_search::{SearchIndexConfig, TextSearchIndex};
use wiki_types::{IndexOperator, IndexingSettings, PageIdentifier, PageReader, Settings};

use crate::cli::QueryCommands;
use crate::store::FilePageStore;

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    pages_dir_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(pages_dir) = pages_dir_override {
        settings.pages_dir = pages_dir.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// The page store and every index built over it.
pub struct WikiIndexes {
    pub store: Arc<FilePageStore>,
    pub frontmatter: Arc<FrontmatterIndex>,
    pub text: Arc<TextSearchIndex>,
}

impl WikiIndexes {
    /// Open the page store and create empty indexes over it.
    pub fn open(settings: &Settings) -> Result<Self> {
        let store = Arc::new(FilePageStore::new(settings.expanded_pages_dir()));
        let reader: Arc<dyn PageReader> = store.clone();

        let search_config = match settings.expanded_search_index_path() {
            Some(path) => {
                std::fs::create_dir_all(&path)
                    .with_context(|| format!("Failed to create index directory {:?}", path))?;
                SearchIndexConfig::new(path)
            }
            None => SearchIndexConfig::in_memory(),
        }
        .with_memory_mb(settings.writer_memory_mb);

        let text = TextSearchIndex::open(reader.clone(), &search_config)
            .context("Failed to open full-text index")?;

        Ok(Self {
            store,
            frontmatter: Arc::new(FrontmatterIndex::new(reader)),
            text: Arc::new(text),
        })
    }

    /// Build a coordinator over both indexes.
    pub fn coordinator(&self, indexing: &IndexingSettings) -> BackgroundIndexingCoordinator {
        let frontmatter: Arc<dyn IndexOperator> = self.frontmatter.clone();
        let text: Arc<dyn IndexOperator> = self.text.clone();

        BackgroundIndexingCoordinator::new(vec![
            (frontmatter, indexing.frontmatter_workers),
            (text, indexing.search_workers),
        ])
        .with_span(tracing::info_span!(
            "indexing",
            pages_dir = %self.store.root().display()
        ))
    }

    /// List every page and build all indexes.
    pub async fn build(&self, indexing: &IndexingSettings) -> Result<IndexingProgress> {
        let pages = self.store.list_pages().context("Failed to list pages")?;
        let coordinator = self.coordinator(indexing);
        let interval = Duration::from_millis(indexing.progress_interval_ms);
        Ok(index_pages(&coordinator, pages, interval).await)
    }
}

/// Run one background indexing pass and wait for it to finish.
///
/// Logs a snapshot every `interval`. A run where some pages failed never
/// completes, so it is stopped once every page has been attempted.
pub async fn index_pages(
    coordinator: &BackgroundIndexingCoordinator,
    pages: Vec<PageIdentifier>,
    interval: Duration,
) -> IndexingProgress {
    coordinator.start_background(pages);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = coordinator.wait_until_idle() => break,
            _ = ticker.tick() => {
                let progress = coordinator.get_progress();
                log_progress(&progress);
                if !progress.is_running {
                    break;
                }
                if progress.is_settled() {
                    warn!("Some pages failed to index, stopping");
                    break;
                }
            }
        }
    }

    // Join workers still winding down so the indexes are released
    coordinator.stop().await;
    coordinator.get_progress()
}

fn log_progress(progress: &IndexingProgress) {
    info!(
        completed = progress.completed_pages,
        total = progress.total_pages,
        queued = progress.queue_depth,
        rate = %format!("{:.1}/s", progress.processing_rate),
        eta_secs = ?progress.estimated_time_remaining.map(|d| d.as_secs()),
        "Indexing progress"
    );
    for index in progress.index_progress.values() {
        info!(
            index = %index.name,
            completed = index.completed,
            failed = index.failed,
            queued = index.queue_depth,
            "Index progress"
        );
    }
}

fn report(progress: &IndexingProgress) -> Result<()> {
    info!(
        pages = progress.total_pages,
        percent = %format!("{:.1}", progress.percent_complete()),
        "Indexing finished"
    );

    let failing: Vec<_> = progress
        .index_progress
        .values()
        .filter_map(|p| p.last_error.as_ref().map(|e| (p, e)))
        .collect();
    if failing.is_empty() {
        return Ok(());
    }

    for (index, error) in &failing {
        warn!(index = %index.name, failed = index.failed, error = %error, "Index had failures");
    }
    let names: Vec<_> = failing.iter().map(|(p, _)| p.name.as_str()).collect();
    anyhow::bail!("indexing finished with errors in: {}", names.join(", "))
}

/// `index`: build every index, stopping early on Ctrl+C.
pub async fn run_index(settings: &Settings, json: bool) -> Result<()> {
    let indexes = WikiIndexes::open(settings)?;
    let pages = indexes.store.list_pages().context("Failed to list pages")?;
    info!(
        pages = pages.len(),
        pages_dir = %indexes.store.root().display(),
        "Indexing pages"
    );

    let coordinator = indexes.coordinator(&settings.indexing);
    let interval = Duration::from_millis(settings.indexing.progress_interval_ms);

    let progress = tokio::select! {
        progress = index_pages(&coordinator, pages, interval) => progress,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping...");
            coordinator.stop().await;
            coordinator.get_progress()
        }
    };

    info!(
        frontmatter_pages = indexes.frontmatter.page_count(),
        documents = indexes.text.document_count(),
        "Index sizes"
    );

    if json {
        let output =
            serde_json::to_string_pretty(&progress).context("Failed to serialize progress")?;
        println!("{}", output);
    }
    report(&progress)
}

/// Pair every matching page with its stored values at `path`.
fn query_rows(
    index: &FrontmatterIndex,
    path: &str,
    pages: Vec<PageIdentifier>,
) -> Vec<(PageIdentifier, Vec<String>)> {
    pages
        .into_iter()
        .map(|page| {
            let values = index.get_value(&page, path);
            (page, values)
        })
        .collect()
}

/// `query`: answer one frontmatter query.
///
/// Prints one line per page: the identifier, a tab, then every value the
/// page holds at the queried path.
pub async fn run_query(settings: &Settings, command: QueryCommands) -> Result<()> {
    let indexes = WikiIndexes::open(settings)?;
    let progress = indexes.build(&settings.indexing).await?;
    if progress.has_errors() {
        warn!("Some pages could not be indexed; results may be incomplete");
    }

    let frontmatter = &indexes.frontmatter;
    let (path, pages) = match command {
        QueryCommands::Exact { path, value } => {
            let pages = frontmatter.query_exact_match(&path, &value);
            (path, pages)
        }
        QueryCommands::Exists { path } => {
            let pages = frontmatter.query_key_existence(&path);
            (path, pages)
        }
        QueryCommands::Prefix { path, prefix } => {
            let pages = frontmatter.query_prefix_match(&path, &prefix);
            (path, pages)
        }
    };

    let rows = query_rows(frontmatter, &path, pages);
    for (page, values) in &rows {
        println!("{}\t{}", page, values.join(", "));
    }
    info!(results = rows.len(), "Query complete");
    Ok(())
}

/// `search`: run one full-text search.
pub async fn run_search(settings: &Settings, query: &str, limit: usize) -> Result<()> {
    let indexes = WikiIndexes::open(settings)?;
    let progress = indexes.build(&settings.indexing).await?;
    if progress.has_errors() {
        warn!("Some pages could not be indexed; results may be incomplete");
    }

    let hits = indexes
        .text
        .search(query, limit)
        .context("Search failed")?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    for hit in &hits {
        println!("{:.3}\t{}\t{}", hit.score, hit.identifier, hit.title);
    }
    Ok(())
}
