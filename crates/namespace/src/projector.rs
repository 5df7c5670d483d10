//! Projection of a flat object listing onto a virtual directory tree.
//!
//! The platform stores objects under flat keys such as `photos/2024/a.jpg`.
//! Folders have no existence of their own: a folder is visible exactly when
//! at least one object key continues below it. [`children_at`] derives the
//! immediate child folders and files for a cursor from a listing snapshot.

use std::collections::BTreeSet;

use crate::cursor::PathCursor;
use crate::object::{StoredObject, SEPARATOR};

/// The immediate children of a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing<'a> {
    /// Child folder names, each listed once, in lexicographic order.
    pub folders: BTreeSet<&'a str>,
    /// Direct child files, in listing order.
    pub files: Vec<&'a StoredObject>,
}

impl<'a> Listing<'a> {
    /// Total number of entries (folders plus files).
    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }

    /// Returns true if there is nothing to show at this cursor.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Iterate entries folders first, then files.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'a>> + '_ {
        self.folders
            .iter()
            .copied()
            .map(Entry::Folder)
            .chain(self.files.iter().copied().map(Entry::File))
    }
}

/// A single row of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    /// A derived folder.
    Folder(&'a str),
    /// A stored object directly under the cursor.
    File(&'a StoredObject),
}

impl<'a> Entry<'a> {
    /// The name shown for this entry.
    pub fn name(&self) -> &'a str {
        match self {
            Entry::Folder(name) => name,
            Entry::File(object) => object.display_name(),
        }
    }
}

/// The part of `key` below `cursor`, or `None` if the key lies elsewhere.
///
/// The prefix check is anchored: a key only belongs to the cursor's subtree
/// when it starts with `"{cursor}/"`.
pub fn relative_key<'k>(key: &'k str, cursor: &PathCursor) -> Option<&'k str> {
    if cursor.is_root() {
        return Some(key);
    }
    key.strip_prefix(cursor.as_str())?.strip_prefix(SEPARATOR)
}

/// Compute the immediate child folders and files of `cursor`.
///
/// Objects outside the cursor's subtree are ignored. A cursor with no
/// matching objects yields an empty listing.
pub fn children_at<'a, I>(objects: I, cursor: &PathCursor) -> Listing<'a>
where
    I: IntoIterator<Item = &'a StoredObject>,
{
    let mut listing = Listing::default();

    for object in objects {
        let Some(relative) = relative_key(&object.key, cursor) else {
            continue;
        };

        match relative.split_once(SEPARATOR) {
            Some((folder, _)) => {
                listing.folders.insert(folder);
            }
            None => listing.files.push(object),
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn object(id: &str, key: &str) -> StoredObject {
        StoredObject::new(id, key, 10, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn objects(keys: &[&str]) -> Vec<StoredObject> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| object(&format!("id{}", i), key))
            .collect()
    }

    fn folder_names<'a>(listing: &Listing<'a>) -> Vec<&'a str> {
        listing.folders.iter().copied().collect()
    }

    fn file_keys<'a>(listing: &Listing<'a>) -> Vec<&'a str> {
        listing.files.iter().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn test_root_single_file() {
        let objs = objects(&["x.txt"]);
        let listing = children_at(&objs, &PathCursor::root());

        assert!(listing.folders.is_empty());
        assert_eq!(file_keys(&listing), vec!["x.txt"]);
    }

    #[test]
    fn test_nested_key_at_each_level() {
        let objs = objects(&["a/b/c.txt"]);

        let root = children_at(&objs, &PathCursor::root());
        assert_eq!(folder_names(&root), vec!["a"]);
        assert!(root.files.is_empty());

        let a = children_at(&objs, &PathCursor::parse("a"));
        assert_eq!(folder_names(&a), vec!["b"]);
        assert!(a.files.is_empty());

        let ab = children_at(&objs, &PathCursor::parse("a/b"));
        assert!(ab.folders.is_empty());
        assert_eq!(file_keys(&ab), vec!["a/b/c.txt"]);
        assert_eq!(ab.files[0].display_name(), "c.txt");
    }

    #[test]
    fn test_folder_names_collapse() {
        let objs = objects(&["docs/a.txt", "docs/b.txt"]);
        let listing = children_at(&objs, &PathCursor::root());

        assert_eq!(folder_names(&listing), vec!["docs"]);
        assert!(listing.files.is_empty());
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn test_files_keep_listing_order() {
        let objs = objects(&["z.txt", "dir/inner.txt", "a.txt", "m.txt"]);
        let listing = children_at(&objs, &PathCursor::root());

        assert_eq!(file_keys(&listing), vec!["z.txt", "a.txt", "m.txt"]);
        assert_eq!(folder_names(&listing), vec!["dir"]);
    }

    #[test]
    fn test_unknown_cursor_is_empty() {
        let objs = objects(&["a/b.txt"]);
        let listing = children_at(&objs, &PathCursor::parse("nope"));
        assert!(listing.is_empty());
        assert_eq!(listing.len(), 0);
    }

    #[test]
    fn test_empty_listing() {
        let objs: Vec<StoredObject> = Vec::new();
        let listing = children_at(&objs, &PathCursor::root());
        assert!(listing.is_empty());
    }

    #[test]
    fn test_prefix_is_anchored() {
        // "b" occurs inside these keys but none of them start with "b/".
        let objs = objects(&["a/b/c.txt", "xb/c.txt", "ab/c.txt"]);
        let listing = children_at(&objs, &PathCursor::parse("b"));
        assert!(listing.is_empty());
    }

    #[test]
    fn test_sibling_with_shared_prefix_excluded() {
        let objs = objects(&["doc/a.txt", "docs/b.txt", "docs.txt"]);
        let listing = children_at(&objs, &PathCursor::parse("doc"));
        assert_eq!(file_keys(&listing), vec!["doc/a.txt"]);
        assert!(listing.folders.is_empty());
    }

    #[test]
    fn test_empty_segment_is_a_folder_name() {
        let objs = objects(&["a//b.txt"]);
        let listing = children_at(&objs, &PathCursor::parse("a"));
        assert_eq!(folder_names(&listing), vec![""]);
    }

    #[test]
    fn test_after_deleting_only_leaf() {
        let mut objs = objects(&["a/b/c.txt", "top.txt"]);
        objs.retain(|o| o.key != "a/b/c.txt");

        let leaf = children_at(&objs, &PathCursor::parse("a/b"));
        assert!(leaf.is_empty());

        let root = children_at(&objs, &PathCursor::root());
        assert!(root.folders.is_empty());
        assert_eq!(file_keys(&root), vec!["top.txt"]);
    }

    #[test]
    fn test_idempotent() {
        let objs = objects(&["a/1", "a/2", "b", "c/d/e"]);
        let cursor = PathCursor::parse("a");
        assert_eq!(children_at(&objs, &cursor), children_at(&objs, &cursor));
    }

    #[test]
    fn test_partition_has_no_double_counting() {
        let objs = objects(&[
            "r.txt",
            "a/1.txt",
            "a/b/2.txt",
            "a/b/c/3.txt",
            "a/x",
            "q/a/9.txt",
        ]);

        for cursor in ["", "a", "a/b", "a/b/c", "q", "q/a"] {
            let cursor = PathCursor::parse(cursor);
            let listing = children_at(&objs, &cursor);

            let under: Vec<&StoredObject> = objs
                .iter()
                .filter(|o| relative_key(&o.key, &cursor).is_some())
                .collect();

            for object in under {
                let relative = relative_key(&object.key, &cursor).unwrap();
                let as_file = listing.files.iter().any(|f| f.id == object.id);
                let as_folder = relative
                    .split_once('/')
                    .map(|(folder, _)| listing.folders.contains(folder))
                    .unwrap_or(false);
                assert!(as_file ^ as_folder, "{} at {:?}", object.key, cursor);
            }
        }
    }

    #[test]
    fn test_entries_folders_first() {
        let objs = objects(&["b.txt", "z/1", "a/1"]);
        let listing = children_at(&objs, &PathCursor::root());
        let names: Vec<&str> = listing.entries().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "z", "b.txt"]);
        assert!(matches!(listing.entries().next(), Some(Entry::Folder("a"))));
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(relative_key("a/b", &PathCursor::root()), Some("a/b"));
        assert_eq!(relative_key("a/b", &PathCursor::parse("a")), Some("b"));
        assert_eq!(relative_key("a", &PathCursor::parse("a")), None);
        assert_eq!(relative_key("ab/c", &PathCursor::parse("a")), None);
    }
}
