//! Records and the in-memory registry
//!
//! The engine consumes a minimal ORM surface: records with scalar
//! attributes and relationship slots, an identity map from id to
//! record, and per-record lifecycle status. This module provides that
//! surface.
//!
//! ## Lifecycle
//!
//! `New → Saving → Saved ⇄ Dirty` (and `Dirty → Saving` on re-save).
//! Mutating a `Saved` record marks it `Dirty`. The orchestrator owns
//! the `Saving` transitions; mutation helpers here only flip
//! `Saved → Dirty`.
//!
//! ## Thread Safety
//!
//! The registry is a `DashMap` of records, each behind its own
//! `parking_lot::Mutex`. Holding a record's mutex for the whole save
//! gives the single-logical-writer guarantee: a second save of the
//! same record waits for the first to commit or fail. Status is kept
//! in an atomic beside the mutex so the withholding check on child
//! records never takes a child's lock.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use treesync_core::{Error, RecordId, Result, TypeName};

// =============================================================================
// RecordStatus
// =============================================================================

/// Per-record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Created in memory, never persisted
    New,
    /// A save is in flight
    Saving,
    /// Last known state is persisted
    Saved,
    /// Mutated since the last successful save
    Dirty,
}

impl RecordStatus {
    fn as_u8(self) -> u8 {
        match self {
            RecordStatus::New => 0,
            RecordStatus::Saving => 1,
            RecordStatus::Saved => 2,
            RecordStatus::Dirty => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RecordStatus::New,
            1 => RecordStatus::Saving,
            2 => RecordStatus::Saved,
            _ => RecordStatus::Dirty,
        }
    }
}

// =============================================================================
// Record and SlotValue
// =============================================================================

/// Current in-memory value of one relationship slot
///
/// Slots always hold ids, including for embedded relationships; the
/// codec inlines embedded children's content at serialization time by
/// resolving the ids against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// to-one: at most one related id
    One(Option<RecordId>),
    /// to-many: ordered in memory, persisted unordered
    Many(Vec<RecordId>),
}

/// An entity instance: id, scalar attributes, relationship slots
#[derive(Debug, Clone)]
pub struct Record {
    id: RecordId,
    type_name: TypeName,
    attributes: Map<String, Value>,
    relationships: BTreeMap<String, SlotValue>,
}

impl Record {
    /// Create an empty record
    pub fn new(type_name: TypeName, id: RecordId) -> Self {
        Record {
            id,
            type_name,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Record id
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Record type
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Scalar attributes
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Read one attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Write one attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Current to-one reference, if the slot is set
    pub fn reference(&self, field: &str) -> Option<&RecordId> {
        match self.relationships.get(field) {
            Some(SlotValue::One(id)) => id.as_ref(),
            _ => None,
        }
    }

    /// Current to-many ids (empty when the slot was never touched)
    pub fn links(&self, field: &str) -> &[RecordId] {
        match self.relationships.get(field) {
            Some(SlotValue::Many(ids)) => ids,
            _ => &[],
        }
    }

    /// Set a to-one slot
    pub fn set_reference(&mut self, field: impl Into<String>, id: Option<RecordId>) {
        self.relationships.insert(field.into(), SlotValue::One(id));
    }

    /// Add an id to a to-many slot; duplicates are ignored
    pub fn push_link(&mut self, field: impl Into<String>, id: RecordId) {
        let slot = self
            .relationships
            .entry(field.into())
            .or_insert_with(|| SlotValue::Many(Vec::new()));
        match slot {
            SlotValue::Many(ids) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            SlotValue::One(_) => {
                *slot = SlotValue::Many(vec![id]);
            }
        }
    }

    /// Remove an id from a to-many slot; missing ids are ignored
    pub fn remove_link(&mut self, field: &str, id: &RecordId) {
        if let Some(SlotValue::Many(ids)) = self.relationships.get_mut(field) {
            ids.retain(|existing| existing != id);
        }
    }

    /// Replace a whole slot (used by reload)
    pub fn set_slot(&mut self, field: impl Into<String>, value: SlotValue) {
        self.relationships.insert(field.into(), value);
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Last-known-committed persisted state for one record
///
/// Values are in *persisted form* (link-maps, bare ids, embedded
/// maps), keyed by field name; a missing key means the field is
/// absent from the persisted node. Owned by the orchestrator via the
/// registry; replaced only after a successful store write.
#[derive(Debug, Clone, Default)]
pub struct CommittedSnapshot {
    /// Persisted attribute map (None until the first successful save)
    pub attributes: Option<Map<String, Value>>,
    /// Persisted relationship fields, by field name
    pub relationships: BTreeMap<String, Value>,
}

/// One registry slot: record plus its committed snapshot
#[derive(Debug)]
pub struct RecordEntry {
    /// The in-memory record
    pub record: Record,
    /// Diff baseline from the last successful save
    pub snapshot: CommittedSnapshot,
}

pub(crate) struct RecordCell {
    pub entry: Mutex<RecordEntry>,
    status: AtomicU8,
}

impl RecordCell {
    pub fn status(&self) -> RecordStatus {
        RecordStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: RecordStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }

    /// Mark a clean record dirty after mutation
    pub fn mark_mutated(&self) {
        let _ = self.status.compare_exchange(
            RecordStatus::Saved.as_u8(),
            RecordStatus::Dirty.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// Identity map: id → record, status, committed snapshot
///
/// The minimal ORM surface the orchestrator consumes. Typed mutation
/// helpers flip `Saved` records to `Dirty`; the orchestrator drives
/// the remaining transitions.
#[derive(Default)]
pub struct Registry {
    cells: DashMap<RecordId, Arc<RecordCell>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// Create a new record with a generated id
    pub fn create(&self, type_name: impl Into<TypeName>) -> RecordId {
        self.create_with_id(type_name, RecordId::generate())
    }

    /// Create a new record with a caller-supplied id
    pub fn create_with_id(&self, type_name: impl Into<TypeName>, id: RecordId) -> RecordId {
        let record = Record::new(type_name.into(), id.clone());
        self.insert(record, RecordStatus::New);
        id
    }

    /// Insert a record with an explicit status (adoption of
    /// reconstructed records uses `Saved`)
    pub fn insert(&self, record: Record, status: RecordStatus) {
        let id = record.id().clone();
        let cell = Arc::new(RecordCell {
            entry: Mutex::new(RecordEntry {
                record,
                snapshot: CommittedSnapshot::default(),
            }),
            status: AtomicU8::new(status.as_u8()),
        });
        self.cells.insert(id, cell);
    }

    pub(crate) fn cell(&self, id: &RecordId) -> Result<Arc<RecordCell>> {
        self.cells
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownRecord(id.clone()))
    }

    /// Status of a record, if known to the registry
    pub fn status(&self, id: &RecordId) -> Option<RecordStatus> {
        self.cells.get(id).map(|cell| cell.status())
    }

    /// Whether the registry has ever seen the id
    pub fn contains(&self, id: &RecordId) -> bool {
        self.cells.contains_key(id)
    }

    /// Read access to a record
    pub fn with_record<R>(&self, id: &RecordId, f: impl FnOnce(&Record) -> R) -> Result<R> {
        let cell = self.cell(id)?;
        let entry = cell.entry.lock();
        Ok(f(&entry.record))
    }

    /// Mutate a record; flips `Saved → Dirty`
    pub fn with_record_mut<R>(
        &self,
        id: &RecordId,
        f: impl FnOnce(&mut Record) -> R,
    ) -> Result<R> {
        let cell = self.cell(id)?;
        let result = {
            let mut entry = cell.entry.lock();
            f(&mut entry.record)
        };
        cell.mark_mutated();
        Ok(result)
    }

    /// Write one attribute
    pub fn set_attribute(&self, id: &RecordId, name: &str, value: Value) -> Result<()> {
        self.with_record_mut(id, |record| record.set_attribute(name, value))
    }

    /// Add a to-many link
    pub fn push_link(&self, id: &RecordId, field: &str, child: RecordId) -> Result<()> {
        self.with_record_mut(id, |record| record.push_link(field, child))
    }

    /// Remove a to-many link
    pub fn remove_link(&self, id: &RecordId, field: &str, child: &RecordId) -> Result<()> {
        self.with_record_mut(id, |record| record.remove_link(field, child))
    }

    /// Set a to-one reference
    pub fn set_reference(&self, id: &RecordId, field: &str, target: Option<RecordId>) -> Result<()> {
        self.with_record_mut(id, |record| record.set_reference(field, target))
    }
}
