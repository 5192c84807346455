//! # wiki-search
//!
//! Full-text search over wiki pages using Tantivy.
//!
//! ## Features
//! - Tantivy index in RAM, or in a directory for persistence
//! - Page title and markdown body indexed for BM25 ranking
//! - [`TextSearchIndex`] implements [`wiki_types::IndexOperator`], so the
//!   background coordinator can drive it like any other index

pub mod error;
pub mod index;
pub mod schema;
pub mod text_index;

pub use error::SearchError;
pub use index::{open_or_create_index, SearchIndexConfig};
pub use schema::{build_page_schema, PageSchema};
pub use text_index::{SearchHit, TextSearchIndex, TEXT_INDEX_NAME};
