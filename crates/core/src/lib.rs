//! Core types for the treesync reconciliation engine
//!
//! This crate defines the vocabulary shared by the engine and the
//! store: errors, record/type identifiers, tree paths, patches, and
//! schema descriptors. It has no knowledge of the save lifecycle or
//! of any concrete store.

pub mod error;
pub mod patch;
pub mod path;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use patch::{Patch, PatchAction, PatchOp};
pub use path::{PathParseError, TreePath};
pub use schema::{
    ModelSchema, RelationshipDescriptor, RelationshipKind, Representation, SchemaRegistry,
};
pub use types::{RecordId, TypeName};
