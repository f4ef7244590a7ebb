//! Test doubles for store failure injection
//!
//! Used by the engine's error-path tests: a wrapper store that fails
//! the next N operations, then delegates to an inner [`MemoryTree`].

use crate::{MemoryTree, TreeStore};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use treesync_core::{Error, Patch, Result, TreePath};

/// Store wrapper that fails a configurable number of operations
///
/// Writes and reads each consume from their own failure budget, so a
/// test can fail one save and then observe the retry succeed.
#[derive(Debug, Default)]
pub struct FailingTree {
    inner: MemoryTree,
    failing_writes: AtomicUsize,
    failing_reads: AtomicUsize,
}

impl FailingTree {
    /// Create a store that initially fails nothing
    pub fn new() -> Self {
        FailingTree::default()
    }

    /// Fail the next `n` writes
    pub fn fail_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads
    pub fn fail_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Snapshot the underlying tree
    pub fn dump(&self) -> Value {
        self.inner.dump()
    }

    fn consume(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl TreeStore for FailingTree {
    fn update(&self, patch: &Patch) -> Result<()> {
        if Self::consume(&self.failing_writes) {
            return Err(Error::PersistenceFailure(
                "injected write failure".to_string(),
            ));
        }
        self.inner.update(patch)
    }

    fn read(&self, path: &TreePath) -> Result<Option<Value>> {
        if Self::consume(&self.failing_reads) {
            return Err(Error::PersistenceFailure(
                "injected read failure".to_string(),
            ));
        }
        self.inner.read(path)
    }
}
