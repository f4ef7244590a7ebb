//! Save orchestrator
//!
//! Sequences a record's save: serialize attributes and relationships,
//! diff against the committed snapshot, transmit the patch as one
//! atomic store update, and on success commit the snapshot taken at
//! save-start. On failure the snapshot is discarded and the record
//! reverts to `Dirty`, so a retry recomputes from current values.
//!
//! ## State machine
//!
//! `New/Dirty --save()--> Saving --success--> Saved`
//! `                      Saving --failure--> Dirty`
//!
//! A failed *first* save reverts to `New` instead of `Dirty`: the
//! record has never been persisted, so it must keep being withheld
//! from link-maps until a save succeeds.
//!
//! ## Withholding rule
//!
//! A to-many link entry referencing a child that is still `New` (or
//! mid-first-save) is excluded from both the patch and the committed
//! snapshot. No error is raised; the parent's next save emits the
//! link once the child is `Saved`. No automatic follow-up write is
//! scheduled.
//!
//! ## Concurrency
//!
//! The record's mutex is held across the whole save, so overlapping
//! saves of one record serialize; saves of distinct records proceed
//! concurrently. Child status reads are lock-free atomics, so the
//! withholding check never takes another record's lock. Embedded
//! serialization does lock each child entry; lock order follows the
//! embedding hierarchy, which the schema registry keeps acyclic.

use crate::classify::{classify, Strategy};
use crate::codec;
use crate::config::AdapterConfig;
use crate::diff;
use crate::record::{Record, RecordStatus, Registry, SlotValue};
use crate::reconstruct::{reconstruct, ReconstructedRecord, RelationshipView};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use treesync_core::{Error, Patch, RecordId, Result, SchemaRegistry, TreePath, TypeName};
use treesync_store::TreeStore;

/// What a save call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A patch was transmitted and the snapshot committed
    Written,
    /// Record already in sync; nothing was transmitted
    NoChanges,
    /// Staged in the flush window; transmission happens at flush
    Queued,
}

/// Result of one save: outcome plus relationships that were skipped
///
/// A relationship targeting an unregistered type is fatal for that
/// relationship only; the rest of the record still saves and the
/// per-field error lands here.
#[derive(Debug)]
pub struct SaveReport {
    /// What happened
    pub outcome: SaveOutcome,
    /// Per-relationship errors that did not fail the save
    pub skipped: Vec<Error>,
}

impl SaveReport {
    fn clean(outcome: SaveOutcome) -> Self {
        SaveReport {
            outcome,
            skipped: Vec::new(),
        }
    }
}

/// The adapter: registry, schema, store handle, and save sequencing
///
/// An explicit context object; nothing here is process-global. Holds
/// `Arc` handles only, so clones are cheap to hand to threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use treesync_core::{ModelSchema, RelationshipDescriptor, SchemaRegistry};
/// use treesync_engine::{Adapter, SaveOutcome};
/// use treesync_store::MemoryTree;
///
/// let mut schema = SchemaRegistry::new();
/// schema.register(
///     ModelSchema::new("post")
///         .relationship(RelationshipDescriptor::has_many("comments", "comment")),
/// ).unwrap();
/// schema.register(ModelSchema::new("comment")).unwrap();
///
/// let adapter = Adapter::new(Arc::new(MemoryTree::new()), schema);
/// let post = adapter.records().create("post");
/// adapter.records().set_attribute(&post, "title", json!("New Post")).unwrap();
///
/// let report = adapter.save(&post).unwrap();
/// assert_eq!(report.outcome, SaveOutcome::Written);
/// ```
pub struct Adapter {
    store: Arc<dyn TreeStore>,
    schema: SchemaRegistry,
    records: Registry,
    config: AdapterConfig,
    pending: Mutex<BTreeMap<RecordId, Instant>>,
}

impl Adapter {
    /// Create an adapter with immediate transmission (no flush delay)
    pub fn new(store: Arc<dyn TreeStore>, schema: SchemaRegistry) -> Self {
        Adapter::with_config(store, schema, AdapterConfig::default())
    }

    /// Create an adapter with explicit configuration
    pub fn with_config(
        store: Arc<dyn TreeStore>,
        schema: SchemaRegistry,
        config: AdapterConfig,
    ) -> Self {
        Adapter {
            store,
            schema,
            records: Registry::new(),
            config,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// The record registry (identity map and mutation helpers)
    pub fn records(&self) -> &Registry {
        &self.records
    }

    /// The schema registry
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// The underlying store handle
    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    /// Save a record
    ///
    /// With a flush delay configured the record is staged and
    /// `Queued` is returned; otherwise the patch is computed and
    /// transmitted before this call returns.
    pub fn save(&self, id: &RecordId) -> Result<SaveReport> {
        match self.config.flush_delay {
            Some(delay) => {
                // Staging requires the record to exist now, not at flush.
                let _ = self.records.cell(id)?;
                let mut pending = self.pending.lock();
                pending.insert(id.clone(), Instant::now() + delay);
                Ok(SaveReport::clean(SaveOutcome::Queued))
            }
            None => self.save_now(id),
        }
    }

    /// Transmit every staged record whose window has elapsed
    pub fn flush(&self) -> Vec<(RecordId, Result<SaveReport>)> {
        let now = Instant::now();
        self.flush_where(|deadline| deadline <= now)
    }

    /// Transmit every staged record regardless of deadline
    pub fn flush_all(&self) -> Vec<(RecordId, Result<SaveReport>)> {
        self.flush_where(|_| true)
    }

    fn flush_where(&self, due: impl Fn(Instant) -> bool) -> Vec<(RecordId, Result<SaveReport>)> {
        let drained: Vec<RecordId> = {
            let mut pending = self.pending.lock();
            let ids: Vec<RecordId> = pending
                .iter()
                .filter(|(_, deadline)| due(**deadline))
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                pending.remove(id);
            }
            ids
        };
        // Failed records stay Dirty and are not re-queued; retrying is
        // the caller's call.
        drained
            .into_iter()
            .map(|id| {
                let report = self.save_now(&id);
                (id, report)
            })
            .collect()
    }

    /// Compute, transmit, and commit one record's patch
    fn save_now(&self, id: &RecordId) -> Result<SaveReport> {
        let cell = self.records.cell(id)?;
        let mut entry = cell.entry.lock();

        let type_name = entry.record.type_name().clone();
        let model = self
            .schema
            .model(&type_name)
            .ok_or_else(|| Error::Configuration(format!("type {type_name} is not registered")))?;
        let record_path = TreePath::root()
            .child(model.collection())
            .child(id.as_str());

        let mut patch = Patch::new();
        let mut skipped = Vec::new();

        let current_attrs = codec::serialize_attributes(entry.record.attributes());
        patch.merge(diff::diff_attributes(
            entry.snapshot.attributes.as_ref(),
            &current_attrs,
            &record_path,
        ));

        // Candidate persisted form per relationship field; absent key
        // means the field is omitted. Committed as the new snapshot on
        // store ack.
        let mut candidate: BTreeMap<String, Option<Value>> = BTreeMap::new();
        let mut embedded_committed: Vec<RecordId> = Vec::new();

        for descriptor in model.relationships() {
            let field_path = record_path.clone().child(descriptor.name.clone());
            let prev = entry.snapshot.relationships.get(&descriptor.name);

            if !self.schema.contains(&descriptor.target) {
                let err = Error::SchemaMismatch {
                    type_name: type_name.clone(),
                    field: descriptor.name.clone(),
                };
                error!(record = %id, field = %descriptor.name, "{err}");
                skipped.push(err);
                continue;
            }

            match classify(descriptor) {
                Strategy::ByReferenceToMany => {
                    let current: Vec<RecordId> = entry
                        .record
                        .links(&descriptor.name)
                        .iter()
                        .filter(|child| self.is_addressable(child))
                        .cloned()
                        .collect();
                    patch.merge(diff::diff_links(prev, &current, &field_path));
                    candidate.insert(
                        descriptor.name.clone(),
                        codec::encode_links(&current).map(Value::Object),
                    );
                }
                Strategy::ByReferenceToOne => {
                    let current = codec::encode_reference(entry.record.reference(&descriptor.name));
                    patch.merge(diff::diff_reference(prev, current.as_ref(), &field_path));
                    candidate.insert(descriptor.name.clone(), current);
                }
                Strategy::EmbeddedToMany | Strategy::EmbeddedToOne => {
                    let ids: Vec<RecordId> = match classify(descriptor) {
                        Strategy::EmbeddedToOne => {
                            entry.record.reference(&descriptor.name).cloned().into_iter().collect()
                        }
                        _ => entry.record.links(&descriptor.name).to_vec(),
                    };
                    let mut children = Vec::with_capacity(ids.len());
                    for child_id in &ids {
                        match self
                            .records
                            .with_record(child_id, |child| child.attributes().clone())
                        {
                            Ok(attributes) => {
                                children.push((child_id.clone(), attributes));
                                embedded_committed.push(child_id.clone());
                            }
                            Err(err) => {
                                error!(record = %id, field = %descriptor.name, child = %child_id, "{err}");
                                skipped.push(err);
                            }
                        }
                    }
                    let encoded =
                        codec::encode_embedded(children.iter().map(|(id, attrs)| (id, attrs)));
                    patch.merge(diff::diff_embedded(prev, encoded.as_ref(), &field_path));
                    candidate.insert(descriptor.name.clone(), encoded.map(Value::Object));
                }
            }
        }

        if patch.is_empty() {
            cell.set_status(RecordStatus::Saved);
            return Ok(SaveReport {
                outcome: SaveOutcome::NoChanges,
                skipped,
            });
        }

        let prior = cell.status();
        cell.set_status(RecordStatus::Saving);
        debug!(record = %id, ops = patch.len(), "transmitting patch");

        if let Err(err) = self.store.update(&patch) {
            // Atomic store update: nothing partial was applied. The
            // in-flight snapshot is discarded by not committing it.
            // A record whose first save failed has never been
            // persisted, so it goes back to New and stays withheld
            // from link-maps.
            cell.set_status(if prior == RecordStatus::New {
                RecordStatus::New
            } else {
                RecordStatus::Dirty
            });
            return Err(err);
        }

        entry.snapshot.attributes = Some(current_attrs);
        for (field, value) in candidate {
            match value {
                Some(value) => {
                    entry.snapshot.relationships.insert(field, value);
                }
                None => {
                    entry.snapshot.relationships.remove(&field);
                }
            }
        }
        cell.set_status(RecordStatus::Saved);

        // Embedded children persist inside the parent node; they have
        // no independent save lifecycle.
        for child_id in embedded_committed {
            if let Ok(child_cell) = self.records.cell(&child_id) {
                child_cell.set_status(RecordStatus::Saved);
            }
        }

        Ok(SaveReport {
            outcome: SaveOutcome::Written,
            skipped,
        })
    }

    /// Whether a linked child may appear in a link-map yet
    ///
    /// `New` children (and children mid-first-save) are withheld.
    /// Ids the registry has never seen are presumed persisted
    /// remotely and included.
    fn is_addressable(&self, child: &RecordId) -> bool {
        !matches!(
            self.records.status(child),
            Some(RecordStatus::New) | Some(RecordStatus::Saving)
        )
    }

    /// Re-read a record's node and adopt the persisted state
    ///
    /// The registry entry's record, snapshot, and status are replaced
    /// by what the store holds. Embedded children found in the node
    /// are adopted into the registry as `Saved`.
    pub fn reload(&self, id: &RecordId) -> Result<ReconstructedRecord> {
        let cell = self.records.cell(id)?;
        let mut entry = cell.entry.lock();

        let type_name = entry.record.type_name().clone();
        let model = self
            .schema
            .model(&type_name)
            .ok_or_else(|| Error::Configuration(format!("type {type_name} is not registered")))?;
        let record_path = TreePath::root()
            .child(model.collection())
            .child(id.as_str());

        let raw = self
            .store
            .read(&record_path)?
            .ok_or_else(|| Error::UnknownRecord(id.clone()))?;
        let view = reconstruct(&self.schema, &type_name, id, &raw)?;

        entry.record = record_from_view(&view);
        entry.snapshot.attributes = Some(view.attributes.clone());
        entry.snapshot.relationships.clear();
        if let Some(node) = raw.as_object() {
            for descriptor in model.relationships() {
                if let Some(value) = node.get(&descriptor.name) {
                    entry.snapshot.relationships.insert(
                        descriptor.name.clone(),
                        value.clone(),
                    );
                }
            }
        }
        cell.set_status(RecordStatus::Saved);

        for child in embedded_children(&view) {
            if !self.records.contains(&child.id) {
                self.records
                    .insert(record_from_view(child), RecordStatus::Saved);
            }
        }

        Ok(view)
    }

    /// Read and reconstruct a record without touching the registry
    pub fn fetch(&self, type_name: &TypeName, id: &RecordId) -> Result<Option<ReconstructedRecord>> {
        let model = self
            .schema
            .model(type_name)
            .ok_or_else(|| Error::Configuration(format!("type {type_name} is not registered")))?;
        let record_path = TreePath::root()
            .child(model.collection())
            .child(id.as_str());
        match self.store.read(&record_path)? {
            Some(raw) => Ok(Some(reconstruct(&self.schema, type_name, id, &raw)?)),
            None => Ok(None),
        }
    }
}

/// Build an in-memory record from a reconstructed view
fn record_from_view(view: &ReconstructedRecord) -> Record {
    let mut record = Record::new(view.type_name.clone(), view.id.clone());
    for (name, value) in &view.attributes {
        record.set_attribute(name.clone(), value.clone());
    }
    for (field, relationship) in &view.relationships {
        let slot = match relationship {
            RelationshipView::One(id) => SlotValue::One(id.clone()),
            RelationshipView::Many(collection) => SlotValue::Many(collection.ids().to_vec()),
            RelationshipView::EmbeddedOne(child) => {
                SlotValue::One(child.as_ref().map(|c| c.id.clone()))
            }
            RelationshipView::EmbeddedMany(children) => {
                SlotValue::Many(children.iter().map(|c| c.id.clone()).collect())
            }
        };
        record.set_slot(field.clone(), slot);
    }
    record
}

/// All embedded children in a reconstructed view
fn embedded_children(view: &ReconstructedRecord) -> Vec<&ReconstructedRecord> {
    let mut children = Vec::new();
    for relationship in view.relationships.values() {
        match relationship {
            RelationshipView::EmbeddedOne(Some(child)) => children.push(child),
            RelationshipView::EmbeddedMany(embedded) => children.extend(embedded.iter()),
            _ => {}
        }
    }
    children
}
