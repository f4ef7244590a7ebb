//! Tree paths
//!
//! A [`TreePath`] addresses a node in the hierarchical store:
//! `recordType/recordId/fieldName[/childId]`. Paths are sequences of
//! key segments; the store has no array nodes (to-many relationships
//! are maps by invariant), so segments are always object keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for tree path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty segment in path (`posts//title`)
    #[error("empty segment in path at position {0}")]
    EmptySegment(usize),
}

/// A path into the hierarchical store
///
/// Paths address nodes by slash-joined key segments, Firebase-style:
///
/// | Path | Meaning |
/// |------|---------|
/// | (empty) | Root |
/// | `posts` | All records of type `post` |
/// | `posts/p1` | Record node |
/// | `posts/p1/comments` | Relationship field |
/// | `posts/p1/comments/c1` | Link entry or embedded child |
///
/// # Examples
///
/// ```
/// use treesync_core::TreePath;
///
/// let post = TreePath::root().child("posts").child("p1");
/// let links = post.clone().child("comments");
/// assert_eq!(links.to_string(), "posts/p1/comments");
/// assert!(post.is_ancestor_of(&links));
///
/// let parsed: TreePath = "posts/p1/comments".parse().unwrap();
/// assert_eq!(parsed, links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        TreePath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments(segments: Vec<String>) -> Self {
        TreePath { segments }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if this is the root path (empty)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn child(mut self, key: impl Into<String>) -> Self {
        self.segments.push(key.into());
        self
    }

    /// Push a key segment (mutating)
    pub fn push(&mut self, key: impl Into<String>) {
        self.segments.push(key.into());
    }

    /// Get the parent path (None if root)
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }

    /// Get the last segment (None if root)
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Check if this path is an ancestor of another (or equal)
    ///
    /// A path is an ancestor if it is a prefix of the other path.
    /// The root path is an ancestor of all paths.
    pub fn is_ancestor_of(&self, other: &TreePath) -> bool {
        if self.segments.len() > other.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }

    /// Check if this path is a descendant of another (or equal)
    pub fn is_descendant_of(&self, other: &TreePath) -> bool {
        other.is_ancestor_of(self)
    }

    /// Check if two paths overlap (one is ancestor/descendant of the other)
    ///
    /// Two ops in one patch must not overlap, or the later op would
    /// clobber part of the earlier one.
    pub fn overlaps(&self, other: &TreePath) -> bool {
        self.is_ancestor_of(other) || self.is_descendant_of(other)
    }
}

impl FromStr for TreePath {
    type Err = PathParseError;

    /// Parse a slash-joined path. An empty string parses to the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(TreePath::root());
        }
        let mut segments = Vec::new();
        for (i, seg) in s.split('/').enumerate() {
            if seg.is_empty() {
                return Err(PathParseError::EmptySegment(i));
            }
            segments.push(seg.to_string());
        }
        Ok(TreePath { segments })
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
