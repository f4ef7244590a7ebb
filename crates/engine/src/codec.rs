//! Link codec
//!
//! Encodes and decodes a single relationship value to and from its
//! tree representation:
//!
//! - to-many by-reference → link-map `{ "<id>": true, ... }`, never an
//!   array, omitted entirely when empty;
//! - to-one by-reference → the bare id, omitted when null;
//! - embedded → `{ "<id>": { ...child attributes... } }` with the same
//!   attribute-serialization rules as top-level records.
//!
//! Encoding returns `Option`: `None` means "omit the field", which the
//! differ turns into a removal when the field was previously present.

use serde_json::{Map, Value};
use treesync_core::RecordId;

/// Serialize record attributes for persistence
///
/// Null attribute values are dropped: the tree never stores explicit
/// nulls, absence is the persisted form of null.
pub fn serialize_attributes(attributes: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Encode a to-many by-reference value as a link-map
///
/// An empty sequence encodes as `None` (omit the field), never as an
/// empty map.
pub fn encode_links(ids: &[RecordId]) -> Option<Map<String, Value>> {
    if ids.is_empty() {
        return None;
    }
    let mut map = Map::new();
    for id in ids {
        map.insert(id.as_str().to_string(), Value::Bool(true));
    }
    Some(map)
}

/// Decode a link-map into related ids
///
/// Iteration order of a link-map is not meaningful; callers must not
/// depend on it reflecting insertion order. Non-map input decodes as
/// no links.
pub fn decode_links(value: &Value) -> Vec<RecordId> {
    match value.as_object() {
        Some(map) => map.keys().map(|key| RecordId::from(key.as_str())).collect(),
        None => Vec::new(),
    }
}

/// Encode a to-one by-reference value
///
/// Null encodes as `None` (omit the field); a previously-set
/// reference that becomes null is removed by the differ, never
/// written as an explicit null.
pub fn encode_reference(id: Option<&RecordId>) -> Option<Value> {
    id.map(|id| Value::String(id.as_str().to_string()))
}

/// Decode a to-one by-reference value
///
/// Ids are strings; numeric nodes (caller-supplied number ids) decode
/// via their decimal form. Anything else decodes as null.
pub fn decode_reference(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) => Some(RecordId::from(s.as_str())),
        Value::Number(n) => Some(RecordId::from(n.to_string())),
        _ => None,
    }
}

/// Encode embedded children as id → serialized content
///
/// An empty set encodes as `None` (omit the field). Embedded children
/// carry no relationship links of their own inside the parent node.
pub fn encode_embedded<'a>(
    children: impl IntoIterator<Item = (&'a RecordId, &'a Map<String, Value>)>,
) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for (id, attributes) in children {
        map.insert(
            id.as_str().to_string(),
            Value::Object(serialize_attributes(attributes)),
        );
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
