//! Trie index over object keys.
//!
//! [`children_at`](crate::projector::children_at) rescans the whole snapshot
//! for every cursor. For large buckets the snapshot can instead be indexed
//! once into a trie keyed by path segment; lookups then cost the depth of the
//! cursor plus the size of the answer.

use std::collections::{BTreeMap, HashMap};

use crate::cursor::PathCursor;
use crate::error::{NamespaceError, Result};
use crate::object::{StoredObject, SEPARATOR};
use crate::projector::Listing;

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
    /// Positions in the snapshot of objects stored directly in this folder.
    files: Vec<usize>,
}

/// A prebuilt index of a listing snapshot.
#[derive(Debug)]
pub struct NamespaceIndex<'a> {
    objects: &'a [StoredObject],
    root: Node,
    by_key: HashMap<&'a str, usize>,
}

impl<'a> NamespaceIndex<'a> {
    /// Build an index over a snapshot.
    pub fn build(objects: &'a [StoredObject]) -> Self {
        let mut root = Node::default();
        let mut by_key = HashMap::with_capacity(objects.len());

        for (position, object) in objects.iter().enumerate() {
            by_key.insert(object.key.as_str(), position);

            let mut segments: Vec<&str> = object.key.split(SEPARATOR).collect();
            // split always yields at least one item; the last is the file name.
            segments.pop();

            let mut node = &mut root;
            for segment in segments {
                node = node.children.entry(segment.to_string()).or_default();
            }
            node.files.push(position);
        }

        Self {
            objects,
            root,
            by_key,
        }
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the snapshot was empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn node(&self, cursor: &PathCursor) -> Option<&Node> {
        cursor
            .segments()
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    /// The immediate children of `cursor`.
    ///
    /// Matches [`children_at`](crate::projector::children_at) on the same
    /// snapshot.
    pub fn children_at(&self, cursor: &PathCursor) -> Listing<'_> {
        let Some(node) = self.node(cursor) else {
            return Listing::default();
        };

        Listing {
            folders: node.children.keys().map(String::as_str).collect(),
            files: node.files.iter().map(|&i| &self.objects[i]).collect(),
        }
    }

    /// Returns true if at least one object lies below `cursor`.
    pub fn contains_folder(&self, cursor: &PathCursor) -> bool {
        cursor.is_root() || self.node(cursor).is_some()
    }

    /// Look up an object by its full key.
    pub fn find_by_key(&self, key: &str) -> Result<&'a StoredObject> {
        self.by_key
            .get(key)
            .map(|&i| &self.objects[i])
            .ok_or_else(|| NamespaceError::KeyNotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::children_at;
    use chrono::{TimeZone, Utc};

    fn objects(keys: &[&str]) -> Vec<StoredObject> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| {
                StoredObject::new(
                    format!("id{}", i),
                    *key,
                    i as u64,
                    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_matches_projector() {
        let objs = objects(&[
            "readme.md",
            "photos/2024/a.jpg",
            "photos/2024/b.jpg",
            "photos/cover.png",
            "photos2/x.jpg",
            "docs/a.txt",
            "docs/b.txt",
            "z.txt",
        ]);
        let index = NamespaceIndex::build(&objs);

        for cursor in ["", "photos", "photos/2024", "photos2", "docs", "missing", "photos/cover.png"] {
            let cursor = PathCursor::parse(cursor);
            assert_eq!(
                index.children_at(&cursor),
                children_at(&objs, &cursor),
                "cursor {:?}",
                cursor
            );
        }
    }

    #[test]
    fn test_contains_folder() {
        let objs = objects(&["a/b/c.txt"]);
        let index = NamespaceIndex::build(&objs);

        assert!(index.contains_folder(&PathCursor::root()));
        assert!(index.contains_folder(&PathCursor::parse("a")));
        assert!(index.contains_folder(&PathCursor::parse("a/b")));
        assert!(!index.contains_folder(&PathCursor::parse("a/b/c.txt")));
        assert!(!index.contains_folder(&PathCursor::parse("b")));
    }

    #[test]
    fn test_find_by_key() {
        let objs = objects(&["a/b/c.txt", "d.txt"]);
        let index = NamespaceIndex::build(&objs);

        assert_eq!(index.find_by_key("d.txt").unwrap().id, "id1");
        assert_eq!(
            index.find_by_key("a/b").unwrap_err(),
            NamespaceError::KeyNotFound("a/b".to_string())
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let objs: Vec<StoredObject> = Vec::new();
        let index = NamespaceIndex::build(&objs);
        assert!(index.is_empty());
        assert!(index.children_at(&PathCursor::root()).is_empty());
    }
}
