//! Schema descriptors
//!
//! Relationship metadata is declared once per model field and resolved
//! once per type at registration time. The save path never probes
//! records for relationship shape; it asks the registry.
//!
//! Malformed metadata is a configuration fault: it fails
//! [`SchemaRegistry::register`], never a save.

use crate::error::{Error, Result};
use crate::types::TypeName;
use std::collections::{BTreeMap, BTreeSet};

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// belongsTo: at most one related record
    ToOne,
    /// hasMany: a set of related records
    ToMany,
}

/// How a relationship is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representation {
    /// Normalized: link-map of related ids (to-many) or a bare id (to-one)
    #[default]
    ByReference,
    /// Denormalized: full child content nested under the parent node.
    /// Only selected when explicitly declared.
    Embedded,
}

/// Declared metadata for one relationship slot
#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    /// Field name on the owning record
    pub name: String,
    /// Cardinality
    pub kind: RelationshipKind,
    /// Persisted representation
    pub representation: Representation,
    /// Related record type
    pub target: TypeName,
    /// Inverse field name on the target type, if declared.
    /// Links are one-directional markers; the inverse is metadata only.
    pub inverse: Option<String>,
}

impl RelationshipDescriptor {
    /// A by-reference to-many relationship
    pub fn has_many(name: impl Into<String>, target: impl Into<TypeName>) -> Self {
        RelationshipDescriptor {
            name: name.into(),
            kind: RelationshipKind::ToMany,
            representation: Representation::ByReference,
            target: target.into(),
            inverse: None,
        }
    }

    /// A by-reference to-one relationship
    pub fn belongs_to(name: impl Into<String>, target: impl Into<TypeName>) -> Self {
        RelationshipDescriptor {
            name: name.into(),
            kind: RelationshipKind::ToOne,
            representation: Representation::ByReference,
            target: target.into(),
            inverse: None,
        }
    }

    /// Switch to the embedded representation (builder)
    pub fn embedded(mut self) -> Self {
        self.representation = Representation::Embedded;
        self
    }

    /// Declare the inverse field on the target type (builder)
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }
}

/// Schema for one record type
#[derive(Debug, Clone)]
pub struct ModelSchema {
    type_name: TypeName,
    collection: String,
    relationships: BTreeMap<String, RelationshipDescriptor>,
}

impl ModelSchema {
    /// Create a schema with the default collection node name
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        let type_name = type_name.into();
        let collection = type_name.default_collection();
        ModelSchema {
            type_name,
            collection,
            relationships: BTreeMap::new(),
        }
    }

    /// Override the collection node name (for irregular plurals)
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Add a relationship descriptor (builder)
    pub fn relationship(mut self, descriptor: RelationshipDescriptor) -> Self {
        self.relationships
            .insert(descriptor.name.clone(), descriptor);
        self
    }

    /// The record type this schema describes
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Collection node name records nest under
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Look up one relationship by field name
    pub fn relationship_named(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.get(name)
    }

    /// All relationships, ordered by field name
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDescriptor> {
        self.relationships.values()
    }

    /// Whether the field is a relationship slot (vs. an attribute)
    pub fn is_relationship(&self, field: &str) -> bool {
        self.relationships.contains_key(field)
    }
}

/// Registry of model schemas
///
/// Resolved once and passed explicitly into the orchestrator and
/// reconstructor. Registration validates metadata; lookups are
/// infallible reads afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    models: BTreeMap<TypeName, ModelSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Register a model schema
    ///
    /// Validates the schema's relationship metadata. Relationship
    /// targets are allowed to be registered later (mutual references),
    /// so target existence is checked at save time, not here. Embedded
    /// declarations are the exception: a registration that closes a
    /// cycle of embedded relationships is rejected.
    pub fn register(&mut self, schema: ModelSchema) -> Result<()> {
        if schema.type_name().as_str().is_empty() {
            return Err(Error::Configuration("empty type name".to_string()));
        }
        if schema.collection().is_empty() || schema.collection().contains('/') {
            return Err(Error::Configuration(format!(
                "invalid collection name {:?} for type {}",
                schema.collection(),
                schema.type_name()
            )));
        }
        for rel in schema.relationships() {
            if rel.name.is_empty() || rel.name.contains('/') {
                return Err(Error::Configuration(format!(
                    "invalid relationship field name {:?} on type {}",
                    rel.name,
                    schema.type_name()
                )));
            }
            if rel.target.as_str().is_empty() {
                return Err(Error::Configuration(format!(
                    "relationship {:?} on type {} has an empty target type",
                    rel.name,
                    schema.type_name()
                )));
            }
        }
        if self.models.contains_key(schema.type_name()) {
            return Err(Error::Configuration(format!(
                "type {} registered twice",
                schema.type_name()
            )));
        }
        if self.creates_embedded_cycle(&schema) {
            return Err(Error::Configuration(format!(
                "embedded relationships on type {} form a cycle",
                schema.type_name()
            )));
        }
        self.models.insert(schema.type_name().clone(), schema);
        Ok(())
    }

    /// Whether adding the schema would close a cycle of embedded
    /// declarations
    ///
    /// Embedded declarations must form a DAG: a record embedding
    /// itself, directly or through intermediaries, has no finite
    /// persisted form, and serializing it would take the same record
    /// lock twice. The registry was acyclic before this registration,
    /// so any new cycle passes through the new type; a walk over
    /// embedded edges from its targets suffices.
    fn creates_embedded_cycle(&self, schema: &ModelSchema) -> bool {
        let start = schema.type_name();
        let mut stack: Vec<&TypeName> = schema
            .relationships()
            .filter(|rel| rel.representation == Representation::Embedded)
            .map(|rel| &rel.target)
            .collect();
        let mut visited = BTreeSet::new();
        while let Some(type_name) = stack.pop() {
            if type_name == start {
                return true;
            }
            if !visited.insert(type_name.clone()) {
                continue;
            }
            if let Some(model) = self.models.get(type_name) {
                for rel in model.relationships() {
                    if rel.representation == Representation::Embedded {
                        stack.push(&rel.target);
                    }
                }
            }
        }
        false
    }

    /// Look up a schema by type name
    pub fn model(&self, type_name: &TypeName) -> Option<&ModelSchema> {
        self.models.get(type_name)
    }

    /// Whether the type is registered
    pub fn contains(&self, type_name: &TypeName) -> bool {
        self.models.contains_key(type_name)
    }
}
