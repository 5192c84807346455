//! Full-text page index.
//!
//! Wraps an IndexWriter behind a Mutex so worker threads can share it.
//! Every add or remove is committed and the reader reloaded before the
//! call returns, so changes are searchable immediately.

use std::sync::{Arc, Mutex, MutexGuard};

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use wiki_types::{IndexError, IndexOperator, PageReader};

use crate::error::SearchError;
use crate::index::{open_or_create_index, SearchIndexConfig};
use crate::schema::PageSchema;

/// Name reported by the full-text index.
pub const TEXT_INDEX_NAME: &str = "text";

/// A search result with relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Page identifier
    pub identifier: String,
    /// Page title (frontmatter title, or the identifier)
    pub title: String,
    /// BM25 relevance score
    pub score: f32,
}

/// Tantivy-backed full-text index over page titles and bodies.
pub struct TextSearchIndex {
    pages: Arc<dyn PageReader>,
    schema: PageSchema,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    query_parser: QueryParser,
}

impl TextSearchIndex {
    /// Open (or create) the index described by `config`.
    pub fn open(pages: Arc<dyn PageReader>, config: &SearchIndexConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(config)?;
        let schema = PageSchema::from_schema(index.schema())?;

        let memory_budget = config.writer_memory_mb * 1024 * 1024;
        let writer = index.writer(memory_budget)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let query_parser = QueryParser::for_index(&index, vec![schema.title, schema.body]);

        debug!(
            memory_mb = config.writer_memory_mb,
            persistent = config.index_path.is_some(),
            "Opened text search index"
        );

        Ok(Self {
            pages,
            schema,
            writer: Mutex::new(writer),
            reader,
            query_parser,
        })
    }

    /// Open an in-memory index.
    pub fn in_memory(pages: Arc<dyn PageReader>) -> Result<Self, SearchError> {
        Self::open(pages, &SearchIndexConfig::in_memory())
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    /// Index a page, replacing any existing document with the same identifier.
    pub fn index_page(&self, id: &str, title: &str, body: &str) -> Result<(), SearchError> {
        let mut writer = self.lock_writer()?;

        writer.delete_term(Term::from_field_text(self.schema.identifier, id));
        writer.add_document(doc!(
            self.schema.identifier => id,
            self.schema.title => title,
            self.schema.body => body
        ))?;
        writer.commit()?;
        self.reader.reload()?;

        debug!(page = %id, "Indexed page text");
        Ok(())
    }

    /// Delete a page by identifier.
    pub fn delete_page(&self, id: &str) -> Result<(), SearchError> {
        let mut writer = self.lock_writer()?;

        writer.delete_term(Term::from_field_text(self.schema.identifier, id));
        writer.commit()?;
        self.reader.reload()?;

        debug!(page = %id, "Deleted page text");
        Ok(())
    }

    /// Search titles and bodies, best matches first.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query = self.query_parser.parse_query(query_str)?;
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;

            let identifier = doc
                .get_first(self.schema.identifier)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let title = doc
                .get_first(self.schema.title)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            hits.push(SearchHit {
                identifier,
                title,
                score,
            });
        }

        debug!(query = query_str, results = hits.len(), "Text search complete");
        Ok(hits)
    }

    /// Number of searchable documents.
    pub fn document_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl IndexOperator for TextSearchIndex {
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError> {
        let body = self.pages.read_markdown(id)?;
        // Unreadable frontmatter must not keep the body out of the index
        let title = self
            .pages
            .read_frontmatter(id)
            .ok()
            .and_then(|fm| fm.title().map(str::to_string))
            .unwrap_or_else(|| id.to_string());

        self.index_page(id, &title, &body)?;
        Ok(())
    }

    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError> {
        self.delete_page(id)?;
        Ok(())
    }

    fn index_name(&self) -> Option<&str> {
        Some(TEXT_INDEX_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wiki_types::{FieldValue, Frontmatter};

    #[derive(Default)]
    struct MemoryPages {
        pages: HashMap<String, (Frontmatter, String)>,
    }

    impl MemoryPages {
        fn with(mut self, id: &str, title: Option<&str>, body: &str) -> Self {
            let mut fm = Frontmatter::new();
            if let Some(title) = title {
                fm = fm.with_field("title", FieldValue::String(title.to_string()));
            }
            self.pages.insert(id.to_string(), (fm, body.to_string()));
            self
        }
    }

    impl PageReader for MemoryPages {
        fn read_frontmatter(&self, id: &str) -> Result<Frontmatter, IndexError> {
            self.pages
                .get(id)
                .map(|(fm, _)| fm.clone())
                .ok_or_else(|| IndexError::PageNotFound(id.to_string()))
        }

        fn read_markdown(&self, id: &str) -> Result<String, IndexError> {
            self.pages
                .get(id)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| IndexError::PageNotFound(id.to_string()))
        }
    }

    fn sample_pages() -> Arc<dyn PageReader> {
        Arc::new(
            MemoryPages::default()
                .with("toolbox", Some("Toolbox"), "A red toolbox with a hammer and pliers.")
                .with("garden", None, "Tomatoes and basil grow in the garden."),
        )
    }

    #[test]
    fn test_add_and_search() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        index.add_page_to_index("toolbox").unwrap();
        index.add_page_to_index("garden").unwrap();

        let hits = index.search("hammer", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "toolbox");
        assert_eq!(hits[0].title, "Toolbox");
        assert!(hits[0].score > 0.0);

        let hits = index.search("basil", 10).unwrap();
        assert_eq!(hits[0].identifier, "garden");
        // No frontmatter title falls back to the identifier
        assert_eq!(hits[0].title, "garden");
    }

    #[test]
    fn test_readd_replaces_document() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        index.add_page_to_index("toolbox").unwrap();
        index.add_page_to_index("toolbox").unwrap();

        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn test_remove_page() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        index.add_page_to_index("toolbox").unwrap();
        index.remove_page_from_index("toolbox").unwrap();

        assert!(index.search("hammer", 10).unwrap().is_empty());
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn test_missing_page_fails() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        let err = index.add_page_to_index("ghost").unwrap_err();
        assert!(matches!(err, IndexError::PageNotFound(_)));
    }

    #[test]
    fn test_empty_query_and_zero_limit() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        index.add_page_to_index("toolbox").unwrap();

        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("hammer", 0).unwrap().is_empty());
    }

    #[test]
    fn test_persistent_index_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchIndexConfig::new(temp_dir.path().join("text"));

        {
            let index = TextSearchIndex::open(sample_pages(), &config).unwrap();
            index.add_page_to_index("garden").unwrap();
        }

        let reopened = TextSearchIndex::open(sample_pages(), &config).unwrap();
        let hits = reopened.search("tomatoes", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "garden");
    }

    #[test]
    fn test_index_name() {
        let index = TextSearchIndex::in_memory(sample_pages()).unwrap();
        assert_eq!(index.index_name(), Some("text"));
    }
}
