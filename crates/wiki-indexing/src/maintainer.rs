//! Fan-out of single page operations to every registered index.

use std::sync::Arc;

use tracing::{debug, warn};

use wiki_types::operator::display_name;
use wiki_types::{IndexError, IndexOperator};

/// Applies each page operation to every registered index.
///
/// Every index is attempted even when an earlier one fails; all failures
/// come back together as one joined error.
#[derive(Clone, Default)]
pub struct MultiMaintainer {
    maintainers: Vec<Arc<dyn IndexOperator>>,
}

impl MultiMaintainer {
    /// Create a maintainer over the given indexes.
    pub fn new(maintainers: Vec<Arc<dyn IndexOperator>>) -> Self {
        Self { maintainers }
    }

    fn apply<F>(&self, id: &str, action: &str, op: F) -> Result<(), IndexError>
    where
        F: Fn(&dyn IndexOperator) -> Result<(), IndexError>,
    {
        let mut errors = Vec::new();
        for maintainer in &self.maintainers {
            if let Err(e) = op(maintainer.as_ref()) {
                warn!(
                    index = %display_name(maintainer.as_ref()),
                    page = %id,
                    action,
                    error = %e,
                    "Index operation failed"
                );
                errors.push(e);
            }
        }

        match IndexError::join(errors) {
            Some(err) => Err(err),
            None => {
                debug!(page = %id, action, indexes = self.maintainers.len(), "Applied to all indexes");
                Ok(())
            }
        }
    }
}

impl IndexOperator for MultiMaintainer {
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError> {
        self.apply(id, "add", |m| m.add_page_to_index(id))
    }

    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError> {
        self.apply(id, "remove", |m| m.remove_page_from_index(id))
    }
}
