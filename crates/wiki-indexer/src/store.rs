//! Markdown pages on disk.
//!
//! Every `*.md` file below the root is a page. Its identifier is the path
//! relative to the root without the extension, using `/` separators, so a
//! top-level file's identifier is its file stem. Frontmatter is TOML
//! between `+++` fences at the top of the file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use wiki_types::{Frontmatter, IndexError, PageIdentifier, PageReader};

const PAGE_EXTENSION: &str = "md";
const FENCE: &str = "+++";

/// Page source backed by a directory of markdown files.
#[derive(Debug, Clone)]
pub struct FilePageStore {
    root: PathBuf,
}

impl FilePageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate every page below the root, sorted by identifier.
    pub fn list_pages(&self) -> Result<Vec<PageIdentifier>, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::Config(format!(
                "pages directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut pages = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some(PAGE_EXTENSION) {
                continue;
            }
            if let Some(id) = self.identifier_for(entry.path()) {
                pages.push(id);
            }
        }

        pages.sort();
        debug!(root = %self.root.display(), pages = pages.len(), "Listed pages");
        Ok(pages)
    }

    fn identifier_for(&self, path: &Path) -> Option<PageIdentifier> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, IndexError> {
        let relative = Path::new(id);
        let escapes = id.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(IndexError::PageNotFound(id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, PAGE_EXTENSION)))
    }

    fn read_page(&self, id: &str) -> Result<String, IndexError> {
        let path = self.path_for(id)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IndexError::PageNotFound(id.to_string()),
            _ => IndexError::PageRead {
                id: id.to_string(),
                message: e.to_string(),
            },
        })
    }
}

impl PageReader for FilePageStore {
    fn read_frontmatter(&self, id: &str) -> Result<Frontmatter, IndexError> {
        let content = self.read_page(id)?;
        match split_frontmatter(&content) {
            (Some(source), _) => Frontmatter::parse_toml(source).map_err(|e| match e {
                IndexError::Index(message) => IndexError::PageRead {
                    id: id.to_string(),
                    message,
                },
                other => other,
            }),
            (None, _) => Ok(Frontmatter::new()),
        }
    }

    fn read_markdown(&self, id: &str) -> Result<String, IndexError> {
        let content = self.read_page(id)?;
        Ok(split_frontmatter(&content).1.to_string())
    }
}

/// Split a page into its frontmatter source (if fenced) and its body.
///
/// An opening fence without a closing one is treated as plain markdown.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = strip_fence_line(content) else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    (None, content)
}

fn strip_fence_line(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}
