//! The path cursor: the currently displayed virtual directory.
//!
//! A cursor is a slash-joined sequence of segments, with the empty string
//! standing for the root. It is transient navigation state and is only ever
//! changed by explicit navigation (open, back, breadcrumb jump, home).

use std::fmt;

use crate::error::{NamespaceError, Result};
use crate::object::SEPARATOR;

/// The currently displayed virtual directory path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathCursor {
    path: String,
}

/// One entry in the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Segment name shown to the user.
    pub name: String,
    /// Cursor that selecting this crumb navigates to.
    pub target: PathCursor,
}

impl PathCursor {
    /// The root cursor.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a cursor from user input.
    ///
    /// Leading and trailing separators are dropped so `/docs/` and `docs`
    /// address the same folder. Inner empty segments are kept as-is.
    pub fn parse(input: &str) -> Self {
        Self {
            path: input.trim_matches(SEPARATOR).to_string(),
        }
    }

    /// Returns true if the cursor is at the root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The cursor as a slash-joined string (empty at the root).
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The prefix an object key must start with to lie under this cursor.
    ///
    /// Empty at the root.
    pub fn prefix(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}{}", self.path, SEPARATOR)
        }
    }

    /// Iterate the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let path = self.path.as_str();
        // "".split('/') yields one empty item; the root has no segments.
        path.split(SEPARATOR).filter(move |_| !path.is_empty())
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Descend into a child folder.
    ///
    /// An empty folder name is legal below the root (`a//b`). At the root it
    /// would address the root itself, so keys starting with `/` project an
    /// empty folder that cannot be entered and this returns an error.
    pub fn open(&mut self, folder: &str) -> Result<()> {
        if folder.contains(SEPARATOR) {
            return Err(NamespaceError::NotASegment(folder.to_string()));
        }
        if folder.is_empty() && self.is_root() {
            return Err(NamespaceError::EmptyRootSegment);
        }
        if self.is_root() {
            self.path = folder.to_string();
        } else {
            self.path.push(SEPARATOR);
            self.path.push_str(folder);
        }
        Ok(())
    }

    /// Return a cursor for a child folder without changing this one.
    pub fn child(&self, folder: &str) -> Result<Self> {
        let mut next = self.clone();
        next.open(folder)?;
        Ok(next)
    }

    /// Pop the last segment. A no-op at the root.
    pub fn back(&mut self) {
        match self.path.rfind(SEPARATOR) {
            Some(idx) => self.path.truncate(idx),
            None => self.path.clear(),
        }
    }

    /// Return to the root.
    pub fn home(&mut self) {
        self.path.clear();
    }

    /// The breadcrumb trail, one crumb per segment.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let mut crumbs = Vec::new();
        let mut target = PathCursor::root();
        for segment in self.segments() {
            if target.is_root() {
                target.path = segment.to_string();
            } else {
                target.path.push(SEPARATOR);
                target.path.push_str(segment);
            }
            crumbs.push(Breadcrumb {
                name: segment.to_string(),
                target: target.clone(),
            });
        }
        crumbs
    }

    /// Jump to the breadcrumb at `index` (0 is the first segment).
    pub fn jump(&mut self, index: usize) -> Result<()> {
        let depth = self.depth();
        let crumb = self
            .breadcrumbs()
            .into_iter()
            .nth(index)
            .ok_or(NamespaceError::BreadcrumbOutOfRange { index, depth })?;
        *self = crumb.target;
        Ok(())
    }

    /// The object key for `name` uploaded while this cursor is displayed.
    ///
    /// `name` may itself be a relative path (as in a folder upload).
    pub fn key_for(&self, name: &str) -> Result<String> {
        let name = name.trim_start_matches(SEPARATOR);
        if name.is_empty() {
            return Err(NamespaceError::EmptyName);
        }
        Ok(if self.is_root() {
            name.to_string()
        } else {
            format!("{}{}{}", self.path, SEPARATOR, name)
        })
    }
}

impl fmt::Display for PathCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path)
    }
}

impl From<&str> for PathCursor {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
