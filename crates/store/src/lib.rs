//! Tree store contract and in-memory implementation
//!
//! The reconciliation engine treats the remote tree database as a
//! black box behind [`TreeStore`]: one atomic multi-path update per
//! patch, one subtree read per reconstruction. [`MemoryTree`] is the
//! in-process implementation the test suites run against.

pub mod memory;
pub mod testing;

pub use memory::MemoryTree;

use treesync_core::{Patch, Result, TreePath};

/// Abstract hierarchical key-value store
///
/// Paths address nodes as `recordType/recordId/fieldName[/childId]`.
/// Implementations must apply a whole patch atomically: either every
/// op lands or none does, so a failed save leaves no partial state.
pub trait TreeStore: Send + Sync {
    /// Apply a patch as one atomic update
    fn update(&self, patch: &Patch) -> Result<()>;

    /// Fetch the full subtree at a path
    ///
    /// Returns `None` when no node exists at the path. Missing nodes
    /// are not an error; absent relationship fields are the normal
    /// persisted form of "empty".
    fn read(&self, path: &TreePath) -> Result<Option<serde_json::Value>>;
}
