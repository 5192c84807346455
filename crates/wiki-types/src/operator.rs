//! The index operator contract.

use std::sync::Arc;

use crate::error::IndexError;

/// Label used for operators that do not report a name.
pub const UNKNOWN_INDEX_NAME: &str = "unknown";

/// Trait for index-specific page operations.
///
/// Implementations must be safe to call from several worker threads at
/// once, but callers never add and remove the same identifier
/// concurrently.
pub trait IndexOperator: Send + Sync {
    /// Add one page to the index.
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError>;

    /// Remove one page from the index.
    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError>;

    /// Optional capability: a name for logging and progress reporting.
    ///
    /// Operators that return `None` are labelled [`UNKNOWN_INDEX_NAME`].
    fn index_name(&self) -> Option<&str> {
        None
    }
}

impl<T: IndexOperator + ?Sized> IndexOperator for Arc<T> {
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError> {
        (**self).add_page_to_index(id)
    }

    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError> {
        (**self).remove_page_from_index(id)
    }

    fn index_name(&self) -> Option<&str> {
        (**self).index_name()
    }
}

/// Resolve the display name of an operator.
pub fn display_name(operator: &dyn IndexOperator) -> String {
    operator
        .index_name()
        .unwrap_or(UNKNOWN_INDEX_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Anonymous;

    impl IndexOperator for Anonymous {
        fn add_page_to_index(&self, _id: &str) -> Result<(), IndexError> {
            Ok(())
        }

        fn remove_page_from_index(&self, _id: &str) -> Result<(), IndexError> {
            Ok(())
        }
    }

    struct Named;

    impl IndexOperator for Named {
        fn add_page_to_index(&self, _id: &str) -> Result<(), IndexError> {
            Ok(())
        }

        fn remove_page_from_index(&self, _id: &str) -> Result<(), IndexError> {
            Ok(())
        }

        fn index_name(&self) -> Option<&str> {
            Some("named")
        }
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name(&Anonymous), "unknown");
        assert_eq!(display_name(&Named), "named");
    }

    #[test]
    fn test_arc_forwards_name() {
        let op: Arc<dyn IndexOperator> = Arc::new(Named);
        assert_eq!(op.index_name(), Some("named"));
        assert!(op.add_page_to_index("page").is_ok());
    }
}
