//! Frontmatter inverted index.
//!
//! Two structures are kept in lockstep: `postings` maps a dotted key path
//! and a value to the pages carrying it, and `reverse_keys` records which
//! paths each page contributed so removal can undo every add.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use wiki_types::frontmatter::join_path;
use wiki_types::{
    FieldValue, Frontmatter, IndexError, IndexOperator, PageIdentifier, PageReader,
    IDENTIFIER_KEY,
};

/// Name reported by the frontmatter index.
pub const FRONTMATTER_INDEX_NAME: &str = "frontmatter";

#[derive(Debug, Default)]
struct IndexState {
    /// path -> value -> posting list (insertion order)
    postings: HashMap<String, BTreeMap<String, Vec<PageIdentifier>>>,
    /// page -> paths it contributed postings to
    reverse_keys: HashMap<PageIdentifier, HashSet<String>>,
}

/// Inverted index mapping frontmatter fields to page identifiers.
pub struct FrontmatterIndex {
    reader: Arc<dyn PageReader>,
    state: RwLock<IndexState>,
}

impl FrontmatterIndex {
    /// Create an empty index that reads frontmatter through `reader`.
    pub fn new(reader: Arc<dyn PageReader>) -> Self {
        Self {
            reader,
            state: RwLock::new(IndexState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Index raw structured data for a page.
    ///
    /// The document is validated before anything is stored: a field with
    /// an unsupported shape fails the whole add with
    /// [`IndexError::UnsupportedFieldShape`] and leaves the index untouched.
    pub fn add_frontmatter_to_index(
        &self,
        id: &str,
        doc: serde_json::Value,
    ) -> Result<(), IndexError> {
        let frontmatter = Frontmatter::from_json(doc)?;
        self.index_frontmatter(id, &frontmatter);
        Ok(())
    }

    /// Index already-parsed frontmatter for a page.
    ///
    /// Adding the same page twice without removing it in between
    /// duplicates its postings.
    pub fn index_frontmatter(&self, id: &str, frontmatter: &Frontmatter) {
        let mut entries = Vec::new();
        for (key, value) in &frontmatter.fields {
            if key == IDENTIFIER_KEY {
                continue;
            }
            flatten(key, value, &mut entries);
        }

        let mut state = self.write();
        for (path, value) in entries {
            state
                .postings
                .entry(path.clone())
                .or_default()
                .entry(value)
                .or_default()
                .push(id.to_string());
            state
                .reverse_keys
                .entry(id.to_string())
                .or_default()
                .insert(path);
        }

        debug!(page = %id, "Indexed frontmatter");
    }

    /// Remove every posting recorded for a page.
    ///
    /// Removing a page that was never indexed is a no-op.
    pub fn remove_frontmatter_from_index(&self, id: &str) {
        let mut state = self.write();
        let Some(paths) = state.reverse_keys.remove(id) else {
            return;
        };

        for path in paths {
            let Some(values) = state.postings.get_mut(&path) else {
                continue;
            };
            values.retain(|_, pages| {
                pages.retain(|page| page != id);
                !pages.is_empty()
            });
            if values.is_empty() {
                state.postings.remove(&path);
            }
        }

        debug!(page = %id, "Removed frontmatter");
    }

    /// Pages whose field at `path` equals `value`.
    pub fn query_exact_match(&self, path: &str, value: &str) -> Vec<PageIdentifier> {
        self.read()
            .postings
            .get(path)
            .and_then(|values| values.get(value))
            .cloned()
            .unwrap_or_default()
    }

    /// Pages that have any value at `path`.
    pub fn query_key_existence(&self, path: &str) -> Vec<PageIdentifier> {
        let state = self.read();
        let Some(values) = state.postings.get(path) else {
            return Vec::new();
        };
        union(values.values())
    }

    /// Pages whose field at `path` starts with `prefix`.
    ///
    /// Values shorter than the prefix simply do not match.
    pub fn query_prefix_match(&self, path: &str, prefix: &str) -> Vec<PageIdentifier> {
        let state = self.read();
        let Some(values) = state.postings.get(path) else {
            return Vec::new();
        };
        let matching = values
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(value, _)| value.starts_with(prefix))
            .map(|(_, pages)| pages);
        union(matching)
    }

    /// Values stored for a page at `path`.
    pub fn get_value(&self, id: &str, path: &str) -> Vec<String> {
        let state = self.read();
        let recorded = state
            .reverse_keys
            .get(id)
            .is_some_and(|paths| paths.contains(path));
        if !recorded {
            return Vec::new();
        }

        state
            .postings
            .get(path)
            .map(|values| {
                values
                    .iter()
                    .filter(|(_, pages)| pages.iter().any(|page| page == id))
                    .map(|(value, _)| value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of pages with at least one posting.
    pub fn page_count(&self) -> usize {
        self.read().reverse_keys.len()
    }
}

impl IndexOperator for FrontmatterIndex {
    fn add_page_to_index(&self, id: &str) -> Result<(), IndexError> {
        let frontmatter = self.reader.read_frontmatter(id)?;
        self.index_frontmatter(id, &frontmatter);
        Ok(())
    }

    fn remove_page_from_index(&self, id: &str) -> Result<(), IndexError> {
        self.remove_frontmatter_from_index(id);
        Ok(())
    }

    fn index_name(&self) -> Option<&str> {
        Some(FRONTMATTER_INDEX_NAME)
    }
}

fn flatten(path: &str, value: &FieldValue, out: &mut Vec<(String, String)>) {
    match value {
        FieldValue::String(s) => out.push((path.to_string(), s.clone())),
        FieldValue::List(items) => {
            for item in items {
                out.push((path.to_string(), item.clone()));
            }
        }
        FieldValue::Map(map) => {
            for (key, child) in map {
                flatten(&join_path(path, key), child, out);
            }
        }
    }
}

/// Union of posting lists, deduplicated in first-seen order.
fn union<'a>(lists: impl Iterator<Item = &'a Vec<PageIdentifier>>) -> Vec<PageIdentifier> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for pages in lists {
        for page in pages {
            if seen.insert(page.as_str()) {
                result.push(page.clone());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryPages {
        pages: Mutex<HashMap<String, Frontmatter>>,
    }

    impl MemoryPages {
        fn with(self, id: &str, doc: serde_json::Value) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(id.to_string(), Frontmatter::from_json(doc).unwrap());
            self
        }
    }

    impl PageReader for MemoryPages {
        fn read_frontmatter(&self, id: &str) -> Result<Frontmatter, IndexError> {
            self.pages
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| IndexError::PageNotFound(id.to_string()))
        }

        fn read_markdown(&self, _id: &str) -> Result<String, IndexError> {
            Ok(String::new())
        }
    }

    fn empty_index() -> FrontmatterIndex {
        FrontmatterIndex::new(Arc::new(MemoryPages::default()))
    }

    #[test]
    fn test_nested_round_trip() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "a": { "b": "x" } }))
            .unwrap();

        assert_eq!(index.query_exact_match("a.b", "x"), vec!["page1".to_string()]);

        index.remove_frontmatter_from_index("page1");
        assert!(index.query_exact_match("a.b", "x").is_empty());
        assert_eq!(index.page_count(), 0);
    }

    #[test]
    fn test_list_values_post_each_element() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "tags": ["red", "blue"] }))
            .unwrap();

        assert_eq!(index.query_exact_match("tags", "red"), vec!["page1"]);
        assert_eq!(index.query_exact_match("tags", "blue"), vec!["page1"]);
        assert!(index.query_exact_match("tags", "green").is_empty());
    }

    #[test]
    fn test_identifier_key_is_skipped() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "identifier": "page1", "title": "One" }))
            .unwrap();

        assert!(index.query_key_existence("identifier").is_empty());
        assert_eq!(index.query_key_existence("title"), vec!["page1"]);
    }

    #[test]
    fn test_unsupported_shape_leaves_index_untouched() {
        let index = empty_index();
        let err = index
            .add_frontmatter_to_index("page1", json!({ "title": "One", "count": 5 }))
            .unwrap_err();

        assert!(matches!(err, IndexError::UnsupportedFieldShape { .. }));
        assert!(index.query_key_existence("title").is_empty());
        assert_eq!(index.page_count(), 0);
    }

    #[test]
    fn test_key_existence_unions_values() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "status": "draft" }))
            .unwrap();
        index
            .add_frontmatter_to_index("page2", json!({ "status": "published" }))
            .unwrap();
        index
            .add_frontmatter_to_index("page3", json!({ "other": "x" }))
            .unwrap();

        let mut pages = index.query_key_existence("status");
        pages.sort();
        assert_eq!(pages, vec!["page1", "page2"]);
        assert!(index.query_key_existence("missing").is_empty());
    }

    #[test]
    fn test_key_existence_deduplicates() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "tags": ["a", "b"] }))
            .unwrap();

        assert_eq!(index.query_key_existence("tags"), vec!["page1"]);
    }

    #[test]
    fn test_prefix_match() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "name": "hammer" }))
            .unwrap();
        index
            .add_frontmatter_to_index("page2", json!({ "name": "hamster" }))
            .unwrap();
        index
            .add_frontmatter_to_index("page3", json!({ "name": "wrench" }))
            .unwrap();

        let mut pages = index.query_prefix_match("name", "ham");
        pages.sort();
        assert_eq!(pages, vec!["page1", "page2"]);

        // Empty prefix matches every value at the path
        let mut all = index.query_prefix_match("name", "");
        all.sort();
        assert_eq!(all, vec!["page1", "page2", "page3"]);
    }

    #[test]
    fn test_prefix_longer_than_value_does_not_match() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "name": "ab" }))
            .unwrap();

        assert!(index.query_prefix_match("name", "abcdef").is_empty());
        assert!(index.query_prefix_match("missing", "a").is_empty());
    }

    #[test]
    fn test_repeat_add_duplicates_postings() {
        let index = empty_index();
        let doc = json!({ "title": "One" });
        index.add_frontmatter_to_index("page1", doc.clone()).unwrap();
        index.add_frontmatter_to_index("page1", doc).unwrap();

        assert_eq!(index.query_exact_match("title", "One"), vec!["page1", "page1"]);

        index.remove_frontmatter_from_index("page1");
        assert!(index.query_exact_match("title", "One").is_empty());
    }

    #[test]
    fn test_remove_keeps_other_pages() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "tags": ["shared"] }))
            .unwrap();
        index
            .add_frontmatter_to_index("page2", json!({ "tags": ["shared"], "a": { "b": "c" } }))
            .unwrap();

        index.remove_frontmatter_from_index("page2");

        assert_eq!(index.query_exact_match("tags", "shared"), vec!["page1"]);
        assert!(index.query_key_existence("a.b").is_empty());
        assert_eq!(index.page_count(), 1);
        assert!(index.get_value("page2", "tags").is_empty());
    }

    #[test]
    fn test_remove_unknown_page_is_noop() {
        let index = empty_index();
        index.remove_frontmatter_from_index("ghost");
        assert_eq!(index.page_count(), 0);
    }

    #[test]
    fn test_get_value() {
        let index = empty_index();
        index
            .add_frontmatter_to_index("page1", json!({ "tags": ["a", "b"], "title": "T" }))
            .unwrap();

        assert_eq!(index.get_value("page1", "tags"), vec!["a", "b"]);
        assert_eq!(index.get_value("page1", "title"), vec!["T"]);
        assert!(index.get_value("page1", "missing").is_empty());
        assert!(index.get_value("ghost", "tags").is_empty());
    }

    #[test]
    fn test_operator_reads_through_page_reader() {
        let pages = MemoryPages::default().with(
            "toolbox",
            json!({ "inventory": { "container": "garage" } }),
        );
        let index = FrontmatterIndex::new(Arc::new(pages));

        index.add_page_to_index("toolbox").unwrap();
        assert_eq!(
            index.query_exact_match("inventory.container", "garage"),
            vec!["toolbox"]
        );
        assert_eq!(index.index_name(), Some("frontmatter"));

        index.remove_page_from_index("toolbox").unwrap();
        assert!(index.query_exact_match("inventory.container", "garage").is_empty());
    }

    #[test]
    fn test_operator_propagates_missing_page() {
        let index = empty_index();
        let err = index.add_page_to_index("ghost").unwrap_err();
        assert!(matches!(err, IndexError::PageNotFound(_)));
    }

    #[test]
    fn test_concurrent_adds_for_distinct_pages() {
        let index = Arc::new(empty_index());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = index.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let id = format!("page-{}-{}", i, j);
                        index
                            .add_frontmatter_to_index(&id, json!({ "group": format!("g{}", i) }))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.page_count(), 400);
        assert_eq!(index.query_key_existence("group").len(), 400);
        assert_eq!(index.query_exact_match("group", "g3").len(), 50);
    }
}
