//! treesync - Relationship reconciliation for hierarchical tree stores
//!
//! treesync persists typed records with has-many/belongs-to
//! relationships into a hierarchical key-value tree (one JSON document
//! per record under `collection/<id>`), keeping the denormalized
//! representation consistent across incremental saves.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use treesync::{Adapter, MemoryTree, ModelSchema, RelationshipDescriptor, SchemaRegistry};
//!
//! let mut schema = SchemaRegistry::new();
//! schema.register(
//!     ModelSchema::new("post")
//!         .relationship(RelationshipDescriptor::has_many("comments", "comment")),
//! )?;
//! schema.register(ModelSchema::new("comment"))?;
//!
//! let adapter = Adapter::new(Arc::new(MemoryTree::new()), schema);
//! let post = adapter.records().create("post");
//! adapter.records().set_attribute(&post, "title", "New Post".into())?;
//! adapter.save(&post)?;
//! ```
//!
//! # Architecture
//!
//! The [`Adapter`] orchestrates every save: it classifies each
//! relationship, encodes it into its persisted form, diffs against the
//! last committed snapshot, and sends one minimal patch to the
//! [`TreeStore`]. Reads go the other way through [`reconstruct`],
//! which rebuilds typed relationship values from a raw node.

pub use treesync_core::*;
pub use treesync_engine::*;
pub use treesync_store::{MemoryTree, TreeStore};
