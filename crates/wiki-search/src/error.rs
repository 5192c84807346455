//! Search error types.

use thiserror::Error;
use wiki_types::IndexError;

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Query parse error
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The writer lock was poisoned by a panicking thread
    #[error("Index is locked: {0}")]
    IndexLocked(String),
}

impl From<SearchError> for IndexError {
    fn from(err: SearchError) -> Self {
        IndexError::Search(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_index_error() {
        let err: IndexError = SearchError::SchemaMismatch("missing body".to_string()).into();
        assert!(matches!(err, IndexError::Search(_)));
        assert!(err.to_string().contains("missing body"));
    }
}
