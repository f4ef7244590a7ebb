//! Read reconstructor
//!
//! Rebuilds typed relationship values from a raw tree node:
//! by-reference to-many fields become lazy [`LinkedCollection`]s
//! (resolved against the store on demand), embedded fields are
//! materialized in full, and a missing field is an empty collection
//! or null reference, never an error.

use crate::classify::{classify, Strategy};
use crate::codec;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;
use treesync_core::{Error, RecordId, Result, SchemaRegistry, TreePath, TypeName};
use treesync_store::TreeStore;

/// A record rebuilt from its raw tree node
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedRecord {
    /// Record id (the node's key, not stored inside the node)
    pub id: RecordId,
    /// Record type
    pub type_name: TypeName,
    /// Scalar attributes
    pub attributes: Map<String, Value>,
    /// Typed relationship values, by field name
    pub relationships: BTreeMap<String, RelationshipView>,
}

impl ReconstructedRecord {
    /// Read one attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Read one relationship view
    pub fn relationship(&self, field: &str) -> Option<&RelationshipView> {
        self.relationships.get(field)
    }

    /// The to-many collection at a field (empty view if absent)
    pub fn many(&self, field: &str) -> Option<&LinkedCollection> {
        match self.relationships.get(field) {
            Some(RelationshipView::Many(collection)) => Some(collection),
            _ => None,
        }
    }

    /// The to-one reference at a field
    pub fn one(&self, field: &str) -> Option<&RecordId> {
        match self.relationships.get(field) {
            Some(RelationshipView::One(id)) => id.as_ref(),
            _ => None,
        }
    }

    /// The embedded children at a field
    pub fn embedded(&self, field: &str) -> &[ReconstructedRecord] {
        match self.relationships.get(field) {
            Some(RelationshipView::EmbeddedMany(children)) => children,
            _ => &[],
        }
    }
}

/// Typed value of one reconstructed relationship slot
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipView {
    /// by-reference to-one
    One(Option<RecordId>),
    /// by-reference to-many: ids now, records on demand
    Many(LinkedCollection),
    /// embedded to-one, fully materialized
    EmbeddedOne(Option<ReconstructedRecord>),
    /// embedded to-many, fully materialized
    EmbeddedMany(Vec<ReconstructedRecord>),
}

/// Lazy to-many collection
///
/// Holds the linked ids; each id resolves to a record only when
/// [`resolve`](LinkedCollection::resolve) fetches it. Order is
/// arbitrary: link-maps carry no insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedCollection {
    target: TypeName,
    field: String,
    ids: Vec<RecordId>,
}

impl LinkedCollection {
    /// The linked ids, in arbitrary order
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    /// Number of linked records
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether any records are linked
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the collection links the given id
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Fetch every linked record from the store
    ///
    /// Ids whose node has vanished are skipped with a warning; a
    /// store read failure propagates and no partial data is returned.
    pub fn resolve(
        &self,
        store: &dyn TreeStore,
        schema: &SchemaRegistry,
    ) -> Result<Vec<ReconstructedRecord>> {
        let model = schema.model(&self.target).ok_or_else(|| Error::SchemaMismatch {
            type_name: self.target.clone(),
            field: self.field.clone(),
        })?;
        let mut records = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            let path = TreePath::root()
                .child(model.collection())
                .child(id.as_str());
            match store.read(&path)? {
                Some(node) => records.push(reconstruct(schema, &self.target, id, &node)?),
                None => warn!(%path, "linked record missing from store; skipping"),
            }
        }
        Ok(records)
    }
}

/// Rebuild a record's typed relationship values from its raw node
///
/// `raw` is the full subtree at `collection/<id>`. Fields the schema
/// declares as relationships are decoded per their strategy; all
/// other fields are attributes.
pub fn reconstruct(
    schema: &SchemaRegistry,
    type_name: &TypeName,
    id: &RecordId,
    raw: &Value,
) -> Result<ReconstructedRecord> {
    let model = schema
        .model(type_name)
        .ok_or_else(|| Error::Configuration(format!("type {type_name} is not registered")))?;
    let node = raw.as_object().ok_or_else(|| {
        Error::Serialization(format!(
            "record node {}/{} is not a map",
            model.collection(),
            id
        ))
    })?;

    let mut attributes = Map::new();
    for (name, value) in node {
        if !model.is_relationship(name) {
            attributes.insert(name.clone(), value.clone());
        }
    }

    let mut relationships = BTreeMap::new();
    for descriptor in model.relationships() {
        let raw_field = node.get(&descriptor.name);
        let view = match classify(descriptor) {
            Strategy::ByReferenceToMany => {
                let ids = raw_field.map(codec::decode_links).unwrap_or_default();
                RelationshipView::Many(LinkedCollection {
                    target: descriptor.target.clone(),
                    field: descriptor.name.clone(),
                    ids,
                })
            }
            Strategy::ByReferenceToOne => {
                RelationshipView::One(raw_field.and_then(codec::decode_reference))
            }
            Strategy::EmbeddedToMany => RelationshipView::EmbeddedMany(reconstruct_embedded(
                schema,
                type_name,
                descriptor,
                raw_field,
            )?),
            Strategy::EmbeddedToOne => {
                let mut children =
                    reconstruct_embedded(schema, type_name, descriptor, raw_field)?;
                RelationshipView::EmbeddedOne(children.pop())
            }
        };
        relationships.insert(descriptor.name.clone(), view);
    }

    Ok(ReconstructedRecord {
        id: id.clone(),
        type_name: type_name.clone(),
        attributes,
        relationships,
    })
}

/// Materialize embedded children from an id → content map
fn reconstruct_embedded(
    schema: &SchemaRegistry,
    owner: &TypeName,
    descriptor: &treesync_core::RelationshipDescriptor,
    raw_field: Option<&Value>,
) -> Result<Vec<ReconstructedRecord>> {
    if !schema.contains(&descriptor.target) {
        return Err(Error::SchemaMismatch {
            type_name: owner.clone(),
            field: descriptor.name.clone(),
        });
    }
    let Some(map) = raw_field.and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    let mut children = Vec::with_capacity(map.len());
    for (child_id, content) in map {
        children.push(reconstruct(
            schema,
            &descriptor.target,
            &RecordId::from(child_id.as_str()),
            content,
        )?);
    }
    Ok(children)
}
