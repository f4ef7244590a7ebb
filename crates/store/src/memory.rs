//! In-memory tree store
//!
//! ## Design: single root value
//!
//! MemoryTree holds one `RwLock<serde_json::Value>` whose value is the
//! whole tree. A patch is applied under a single write lock, which
//! gives the atomic-update contract for free. Reads clone the subtree
//! so callers never observe later mutations.
//!
//! ## Thread Safety
//!
//! MemoryTree is `Send + Sync` and can be shared across threads via
//! `Arc`.

use crate::TreeStore;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use treesync_core::{Patch, Result, TreePath};

/// In-memory hierarchical store
///
/// # Examples
///
/// ```
/// use treesync_store::{MemoryTree, TreeStore};
/// use treesync_core::{Patch, TreePath};
/// use serde_json::json;
///
/// let tree = MemoryTree::new();
/// let mut patch = Patch::new();
/// patch.set("posts/p1/title".parse().unwrap(), json!("New Post"));
/// tree.update(&patch).unwrap();
///
/// let node = tree.read(&"posts/p1".parse().unwrap()).unwrap();
/// assert_eq!(node, Some(json!({"title": "New Post"})));
/// ```
#[derive(Debug)]
pub struct MemoryTree {
    root: RwLock<Value>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        MemoryTree::new()
    }
}

impl MemoryTree {
    /// Create an empty tree
    pub fn new() -> Self {
        MemoryTree {
            root: RwLock::new(Value::Object(serde_json::Map::new())),
        }
    }

    /// Seed the tree with existing content (test fixtures)
    pub fn with_root(root: Value) -> Self {
        MemoryTree {
            root: RwLock::new(root),
        }
    }

    /// Snapshot the whole tree
    pub fn dump(&self) -> Value {
        self.root.read().clone()
    }
}

impl TreeStore for MemoryTree {
    fn update(&self, patch: &Patch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        debug!(ops = patch.len(), "applying patch");
        let mut root = self.root.write();
        patch.apply_to(&mut root);
        Ok(())
    }

    fn read(&self, path: &TreePath) -> Result<Option<Value>> {
        let root = self.root.read();
        let mut node: &Value = &root;
        for segment in path.segments() {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node.clone()))
    }
}
