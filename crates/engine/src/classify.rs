//! Relationship classifier
//!
//! Maps declared relationship metadata to the serialization strategy
//! the codec and differ apply. Pure function of static schema
//! metadata; malformed metadata never reaches this point because the
//! schema registry rejects it at registration time.

use treesync_core::{RelationshipDescriptor, RelationshipKind, Representation};

/// Serialization strategy for one relationship slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bare related id, field omitted when null
    ByReferenceToOne,
    /// Link-map of id → true, field omitted when empty
    ByReferenceToMany,
    /// Full child content nested under the field
    EmbeddedToOne,
    /// id → full child content nested under the field
    EmbeddedToMany,
}

/// Select the strategy for a relationship
///
/// Embedded is only selected when explicitly declared; the default
/// representation is by-reference.
pub fn classify(descriptor: &RelationshipDescriptor) -> Strategy {
    match (descriptor.kind, descriptor.representation) {
        (RelationshipKind::ToOne, Representation::ByReference) => Strategy::ByReferenceToOne,
        (RelationshipKind::ToMany, Representation::ByReference) => Strategy::ByReferenceToMany,
        (RelationshipKind::ToOne, Representation::Embedded) => Strategy::EmbeddedToOne,
        (RelationshipKind::ToMany, Representation::Embedded) => Strategy::EmbeddedToMany,
    }
}
