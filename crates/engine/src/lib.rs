//! Relationship reconciliation engine
//!
//! Translates in-memory has-many/belongs-to associations into their
//! denormalized tree representation (link-maps and embedded
//! sub-documents), keeps that representation consistent across
//! incremental saves, and reconstructs typed associations on read.
//!
//! Component map:
//! - [`classify`]: relationship metadata → serialization strategy
//! - [`codec`]: encode/decode one relationship value
//! - [`diff`]: snapshot vs. current state → minimal patch
//! - [`orchestrator`]: save sequencing, snapshots, flush coalescing
//! - [`reconstruct`]: raw node → typed relationship values

pub mod classify;
pub mod codec;
pub mod config;
pub mod diff;
pub mod orchestrator;
pub mod record;
pub mod reconstruct;

pub use classify::{classify, Strategy};
pub use config::AdapterConfig;
pub use orchestrator::{Adapter, SaveOutcome, SaveReport};
pub use record::{CommittedSnapshot, Record, RecordEntry, RecordStatus, Registry, SlotValue};
pub use reconstruct::{reconstruct, LinkedCollection, ReconstructedRecord, RelationshipView};
