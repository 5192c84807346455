//! Page identity and the page content source.

use crate::error::IndexError;
use crate::frontmatter::Frontmatter;

/// Opaque key identifying one page.
pub type PageIdentifier = String;

/// Source of page content for the indexes.
///
/// Indexes only ever receive identifiers; they resolve the content they
/// need through this trait. Storage, versioning and page discovery live
/// behind it.
pub trait PageReader: Send + Sync {
    /// Read the structured frontmatter of a page.
    fn read_frontmatter(&self, id: &str) -> Result<Frontmatter, IndexError>;

    /// Read the markdown body of a page, without frontmatter.
    fn read_markdown(&self, id: &str) -> Result<String, IndexError>;
}
