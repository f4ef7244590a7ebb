//! Patches
//!
//! A [`Patch`] is a minimal set of path-scoped operations produced by
//! the payload differ and applied atomically by the tree store. Each
//! op either sets a value at a path or removes the node at a path.
//!
//! Semantics follow the tree store's data model:
//! - `Set` creates intermediate object nodes as needed.
//! - `Remove` of a missing node is a no-op.
//! - Empty objects do not exist: removing the last child of a node
//!   removes the node itself, recursively.

use crate::path::TreePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action carried by a single patch op
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchAction {
    /// Write the value at the path, replacing any existing node
    Set(Value),
    /// Remove the node at the path
    Remove,
}

/// A single path-scoped operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    /// Target path
    pub path: TreePath,
    /// Set or remove
    pub action: PatchAction,
}

/// A minimal set of path-scoped set/remove operations
///
/// Applied atomically as one update by the store. Ops within one
/// patch target disjoint paths per relationship field; the differ
/// guarantees this.
///
/// # Examples
///
/// ```
/// use treesync_core::{Patch, TreePath};
/// use serde_json::json;
///
/// let mut patch = Patch::new();
/// patch.set("posts/p1/title".parse().unwrap(), json!("New Post"));
/// patch.remove("posts/p1/user".parse().unwrap());
/// assert_eq!(patch.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    /// Create an empty patch
    pub fn new() -> Self {
        Patch { ops: Vec::new() }
    }

    /// Check whether the patch carries no operations
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations in the patch
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The operations, in insertion order
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Append a set op
    pub fn set(&mut self, path: TreePath, value: Value) {
        self.push(PatchOp {
            path,
            action: PatchAction::Set(value),
        });
    }

    /// Append a remove op
    pub fn remove(&mut self, path: TreePath) {
        self.push(PatchOp {
            path,
            action: PatchAction::Remove,
        });
    }

    /// Append an op, replacing any earlier op at the same path
    ///
    /// Within a coalescing window the latest mutation of a path wins;
    /// one path never carries two ops in a transmitted patch.
    pub fn push(&mut self, op: PatchOp) {
        self.ops.retain(|existing| existing.path != op.path);
        self.ops.push(op);
    }

    /// Merge another patch into this one, later ops winning per path
    pub fn merge(&mut self, other: Patch) {
        for op in other.ops {
            self.push(op);
        }
    }

    /// Apply the patch to an in-memory tree
    ///
    /// Used by the in-memory store and by diff idempotence checks.
    /// The root must be (or become) an object node.
    pub fn apply_to(&self, root: &mut Value) {
        for op in &self.ops {
            match &op.action {
                PatchAction::Set(value) => set_node(root, op.path.segments(), value.clone()),
                PatchAction::Remove => {
                    remove_node(root, op.path.segments());
                }
            }
        }
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Set a value at a key path, creating intermediate objects
fn set_node(root: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *root = value;
        return;
    };
    if !root.is_object() {
        *root = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = root.as_object_mut() {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_node(child, rest, value);
    }
}

/// Remove the node at a key path; prunes emptied ancestors
///
/// Returns true if the subtree at `root` became empty and the caller
/// should drop it too.
fn remove_node(root: &mut Value, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        *root = Value::Null;
        return true;
    };
    let Some(map) = root.as_object_mut() else {
        return false;
    };
    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        if remove_node(child, rest) {
            map.remove(first);
        }
    }
    map.is_empty()
}
