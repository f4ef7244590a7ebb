//! Payload differ
//!
//! Compares the previous persisted snapshot of a record's fields
//! against the new candidate state and computes a minimal patch.
//!
//! Properties the save path relies on:
//!
//! - **Minimal**: unchanged ids and attributes produce no ops; an
//!   untouched link is never rewritten.
//! - **Idempotent**: re-diffing against an already-applied patch
//!   yields an empty patch.
//! - **Field-scoped**: diffing one field only emits ops under that
//!   field's path, so per-field patches compose in any order.
//!
//! A corrupted previous snapshot (non-map where a map is expected) is
//! treated as "no prior state known", logged as a recoverable anomaly.
//! The current save always proceeds with full-add semantics.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::warn;
use treesync_core::{Patch, RecordId, TreePath};

/// Interpret a snapshot value as a map, falling back on corruption
fn snapshot_map<'a>(prev: Option<&'a Value>, field_path: &TreePath) -> Option<&'a Map<String, Value>> {
    match prev {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            warn!(
                path = %field_path,
                found = other.to_string(),
                "corrupted snapshot, expected a map; treating as no prior state"
            );
            None
        }
    }
}

/// Diff a to-many by-reference relationship
///
/// `prev` is the last persisted link-map (if any); `current` is the
/// candidate id set after the orchestrator's withholding rule. When
/// no ids remain, the whole field is removed rather than written as
/// an empty map.
pub fn diff_links(prev: Option<&Value>, current: &[RecordId], field_path: &TreePath) -> Patch {
    let mut patch = Patch::new();
    let prev_keys: BTreeSet<&str> = snapshot_map(prev, field_path)
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let current_keys: BTreeSet<&str> = current.iter().map(RecordId::as_str).collect();

    if current_keys.is_empty() {
        if !prev_keys.is_empty() {
            patch.remove(field_path.clone());
        }
        return patch;
    }

    for added in current_keys.difference(&prev_keys) {
        patch.set(field_path.clone().child(*added), Value::Bool(true));
    }
    for removed in prev_keys.difference(&current_keys) {
        patch.remove(field_path.clone().child(*removed));
    }
    patch
}

/// Diff a to-one by-reference relationship
///
/// `current` is the encoded reference (`None` for null). A reference
/// that becomes null emits a removal for the field, never a written
/// null.
pub fn diff_reference(prev: Option<&Value>, current: Option<&Value>, field_path: &TreePath) -> Patch {
    let mut patch = Patch::new();
    match current {
        Some(value) => {
            if prev != Some(value) {
                patch.set(field_path.clone(), value.clone());
            }
        }
        None => {
            if prev.is_some() {
                patch.remove(field_path.clone());
            }
        }
    }
    patch
}

/// Diff an embedded relationship
///
/// `current` is the encoded id → content map (`None` when empty).
/// Embedded children have no independent save lifecycle, so a changed
/// child is a full-document replacement under its id.
pub fn diff_embedded(
    prev: Option<&Value>,
    current: Option<&Map<String, Value>>,
    field_path: &TreePath,
) -> Patch {
    let mut patch = Patch::new();
    let prev_map = snapshot_map(prev, field_path);

    let Some(current_map) = current else {
        if prev_map.is_some_and(|map| !map.is_empty()) {
            patch.remove(field_path.clone());
        }
        return patch;
    };

    for (id, content) in current_map {
        if prev_map.and_then(|map| map.get(id)) != Some(content) {
            patch.set(field_path.clone().child(id.clone()), content.clone());
        }
    }
    if let Some(prev_map) = prev_map {
        for id in prev_map.keys() {
            if !current_map.contains_key(id) {
                patch.remove(field_path.clone().child(id.clone()));
            }
        }
    }
    patch
}

/// Diff a record's scalar attributes
///
/// Attribute writes go to `recordPath/attributeName`. Attributes that
/// disappeared since the last save are removed, so an attribute set
/// to null ends up absent from the persisted node.
pub fn diff_attributes(
    prev: Option<&Map<String, Value>>,
    current: &Map<String, Value>,
    record_path: &TreePath,
) -> Patch {
    let mut patch = Patch::new();
    for (name, value) in current {
        if prev.and_then(|map| map.get(name)) != Some(value) {
            patch.set(record_path.clone().child(name.clone()), value.clone());
        }
    }
    if let Some(prev) = prev {
        for name in prev.keys() {
            if !current.contains_key(name) {
                patch.remove(record_path.clone().child(name.clone()));
            }
        }
    }
    patch
}
