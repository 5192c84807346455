//! # wiki-frontmatter
//!
//! In-memory inverted index over structured page frontmatter.
//!
//! Nested tables are flattened into dotted key paths (`inventory.container`),
//! and every (path, value) pair maps to the pages that carry it. The index
//! answers exact, key-existence and prefix queries.

pub mod index;

pub use index::{FrontmatterIndex, FRONTMATTER_INDEX_NAME};
