//! Error types shared by every index implementation.

use thiserror::Error;

/// Errors that can occur while adding or removing a page from an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A frontmatter field holds a shape the index cannot flatten
    #[error("Unsupported field shape at '{path}': {kind}")]
    UnsupportedFieldShape { path: String, kind: String },

    /// The page does not exist in the page source
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// The page exists but its content could not be read or parsed
    #[error("Page read error for '{id}': {message}")]
    PageRead { id: String, message: String },

    /// Full-text search engine failure
    #[error("Search error: {0}")]
    Search(String),

    /// Generic index operation error
    #[error("Index error: {0}")]
    Index(String),

    /// Configuration problem detected at runtime
    #[error("Configuration error: {0}")]
    Config(String),

    /// Several operators failed for the same page
    #[error("{}", join_messages(.0))]
    Multiple(Vec<IndexError>),
}

impl IndexError {
    /// Shorthand for an unsupported shape at a dotted path.
    pub fn unsupported(path: impl Into<String>, kind: impl Into<String>) -> Self {
        IndexError::UnsupportedFieldShape {
            path: path.into(),
            kind: kind.into(),
        }
    }

    /// Join a set of errors into one.
    ///
    /// Returns `None` for an empty set and the error itself for a single one,
    /// so callers never see a `Multiple` wrapping exactly one error.
    pub fn join(mut errors: Vec<IndexError>) -> Option<IndexError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(IndexError::Multiple(errors)),
        }
    }

    /// The individual errors carried by this error.
    pub fn errors(&self) -> Vec<&IndexError> {
        match self {
            IndexError::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

fn join_messages(errors: &[IndexError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
