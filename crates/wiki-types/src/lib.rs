//! # wiki-types
//!
//! Shared types for the wiki indexing system.
//!
//! ## Key Components
//!
//! - [`IndexOperator`]: The unit of work every index implements (add/remove one page)
//! - [`PageReader`]: Source of page content consumed by the indexes
//! - [`Frontmatter`] / [`FieldValue`]: Closed model of structured per-page data
//! - [`IndexError`]: Error type shared across index implementations
//! - [`Settings`]: Layered configuration (defaults, config file, env vars)

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod operator;
pub mod page;

pub use config::{IndexingSettings, Settings};
pub use error::IndexError;
pub use frontmatter::{FieldValue, Frontmatter, IDENTIFIER_KEY};
pub use operator::{display_name, IndexOperator, UNKNOWN_INDEX_NAME};
pub use page::{PageIdentifier, PageReader};
