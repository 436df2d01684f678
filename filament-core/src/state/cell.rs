//! Value Cell Implementation
//!
//! A cell is the fundamental reactive primitive. It holds one value and
//! tracks which consumers read it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read inside an observer scope (an effect, a derived
//!    accessor), the cell registers the current consumer as a dependent.
//!
//! 2. When a cell's value changes, all registered consumers are invoked
//!    synchronously, in first-registration order.
//!
//! 3. Composite values (objects and arrays) store one slot per key. A
//!    slot starts out as a raw value; the first per-field read promotes
//!    it to a nested cell, so writes can notify at per-field granularity.
//!
//! # Snapshots
//!
//! Whole-cell reads hand back a freshly built plain `Value`: nested cells
//! are dereferenced recursively, and the result is not reactive. Only
//! reading through a `StateReader` re-establishes tracking.
//!
//! # Notification
//!
//! A write finishes all structural mutation before any consumer runs.
//! Notifications collect into a queue while cell locks are held (nested
//! cells first, then the written cell) and fire after every lock is
//! released, so consumers are free to read and write cells reentrantly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::consumer::{Consumer, ConsumerId};
use super::error::{BoxError, StateError};
use super::resolve;
use super::scope::ObserverScope;
use super::tracker;
use super::update::{Prev, Update};
use super::value::Value;

/// Counter for generating unique cell identities.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity token for a cell.
///
/// Consumers record the identities of the cells they have registered
/// with, which is what makes repeated reads idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Queue of consumers awaiting notification for one write.
pub(crate) type NotifyQueue = SmallVec<[Consumer; 8]>;

/// Per-key storage of a composite cell: either a raw value or the nested
/// cell it was promoted to on first per-field read. Never both.
pub(crate) enum Slot {
    Raw(Value),
    Cell(Cell),
}

impl Slot {
    fn snapshot(&self) -> Value {
        match self {
            Slot::Raw(value) => value.clone(),
            Slot::Cell(cell) => cell.get_untracked(),
        }
    }
}

/// The payload of a cell.
enum Stored {
    /// The cell has been unset.
    Missing,
    /// A non-composite value.
    Leaf(Value),
    /// An object, one slot per key, in insertion order.
    Object(IndexMap<String, Slot>),
    /// An array, one slot per index.
    Array(Vec<Slot>),
}

impl Stored {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(entries) => Stored::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Slot::Raw(value)))
                    .collect(),
            ),
            Value::Array(items) => Stored::Array(items.into_iter().map(Slot::Raw).collect()),
            other => Stored::Leaf(other),
        }
    }

    fn snapshot(&self) -> Value {
        match self {
            Stored::Missing => Value::Undefined,
            Stored::Leaf(value) => value.clone(),
            Stored::Object(slots) => Value::Object(
                slots
                    .iter()
                    .map(|(key, slot)| (key.clone(), slot.snapshot()))
                    .collect(),
            ),
            Stored::Array(slots) => Value::Array(slots.iter().map(Slot::snapshot).collect()),
        }
    }
}

struct CellState {
    stored: Stored,
    /// Distinct consumers in first-registration order.
    consumers: Vec<Consumer>,
    /// Set once the cell is unset; dead cells ignore writes.
    dead: bool,
}

struct CellInner {
    id: CellId,
    /// The cell's owning update routine, if any. Guards self-registration.
    owner: Option<ConsumerId>,
    state: RwLock<CellState>,
}

/// A reactive cell holding one dynamic value.
///
/// Clones share storage, identity, and the consumer list.
#[derive(Clone)]
pub(crate) struct Cell {
    inner: Arc<CellInner>,
}

impl Cell {
    pub(crate) fn new(value: Value, owner: Option<ConsumerId>) -> Self {
        Self {
            inner: Arc::new(CellInner {
                id: CellId::next(),
                owner,
                state: RwLock::new(CellState {
                    stored: Stored::from_value(value),
                    consumers: Vec::new(),
                    dead: false,
                }),
            }),
        }
    }

    pub(crate) fn id(&self) -> CellId {
        self.inner.id
    }

    pub(crate) fn owner(&self) -> Option<ConsumerId> {
        self.inner.owner
    }

    pub(crate) fn push_consumer(&self, consumer: Consumer) {
        self.inner.state.write().consumers.push(consumer);
    }

    pub(crate) fn consumer_count(&self) -> usize {
        self.inner.state.read().consumers.len()
    }

    fn is_dead(&self) -> bool {
        self.inner.state.read().dead
    }

    /// Register the ambient consumer against this cell.
    fn track(&self) {
        tracker::register(ObserverScope::current().as_ref(), self);
    }

    /// Current value as a plain snapshot; registers the ambient consumer.
    pub(crate) fn get(&self) -> Value {
        self.track();
        self.get_untracked()
    }

    /// Current value without establishing a dependency.
    pub(crate) fn get_untracked(&self) -> Value {
        self.inner.state.read().stored.snapshot()
    }

    /// Promote `key` to a nested cell (first access only) and return its
    /// reader/writer pair. Registers the ambient consumer against this
    /// cell; the nested cell inherits this cell's owner.
    pub(crate) fn field(&self, key: &str) -> Option<(StateReader, StateWriter)> {
        self.track();
        let owner = self.inner.owner;
        let mut state = self.inner.state.write();
        let Stored::Object(slots) = &mut state.stored else {
            return None;
        };
        let slot = slots.get_mut(key)?;
        Some(split_cell(promote(slot, owner)))
    }

    /// Array analogue of [`Cell::field`].
    pub(crate) fn index(&self, index: usize) -> Option<(StateReader, StateWriter)> {
        self.track();
        let owner = self.inner.owner;
        let mut state = self.inner.state.write();
        let Stored::Array(slots) = &mut state.stored else {
            return None;
        };
        let slot = slots.get_mut(index)?;
        Some(split_cell(promote(slot, owner)))
    }

    /// Apply an update and notify consumers.
    pub(crate) fn apply(&self, next: Update, deep: bool) {
        let mut pending = NotifyQueue::new();
        self.apply_inner(next, deep, &mut pending);

        // Locks are all released here; consumers run reentrant-safe.
        for consumer in pending {
            consumer.invoke();
        }
    }

    /// Resolve an update into storage, queueing notifications instead of
    /// firing them. Nested writes land in the same queue, ahead of this
    /// cell's own consumers.
    pub(crate) fn apply_inner(&self, next: Update, deep: bool, pending: &mut NotifyQueue) {
        let mut state = self.inner.state.write();
        if state.dead {
            debug!(cell = ?self.inner.id, "write to dead cell ignored");
            return;
        }

        match next {
            Update::Keep => {}
            Update::Unset => {
                trace!(cell = ?self.inner.id, "unsetting cell");
                let stored = std::mem::replace(&mut state.stored, Stored::Missing);
                unset_nested(stored, pending);
                state.dead = true;
                // Notify every consumer once, then detach them for good.
                pending.extend(state.consumers.drain(..));
                return;
            }
            Update::Replace(value) => self.store(&mut state, value, deep, pending),
            Update::Merge(value) => self.store(&mut state, value, true, pending),
        }

        pending.extend(state.consumers.iter().cloned());
    }

    /// Unset this cell as part of a larger write.
    pub(crate) fn unset_inner(&self, pending: &mut NotifyQueue) {
        self.apply_inner(Update::Unset, false, pending);
    }

    fn store(&self, state: &mut CellState, value: Value, deep: bool, pending: &mut NotifyQueue) {
        match (&mut state.stored, value) {
            // Same-kind composites merge in place: the cell's structure
            // keeps its identity across writes.
            (Stored::Object(slots), Value::Object(incoming)) => {
                resolve::merge_object(slots, incoming, deep, pending)
            }
            (Stored::Array(slots), Value::Array(incoming)) => {
                resolve::merge_array(slots, incoming, deep, pending)
            }
            (stored, value) => *stored = Stored::from_value(value),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("consumer_count", &self.consumer_count())
            .finish()
    }
}

fn promote(slot: &mut Slot, owner: Option<ConsumerId>) -> Cell {
    match slot {
        Slot::Cell(cell) => cell.clone(),
        Slot::Raw(value) => {
            let cell = Cell::new(std::mem::take(value), owner);
            *slot = Slot::Cell(cell.clone());
            cell
        }
    }
}

fn unset_nested(stored: Stored, pending: &mut NotifyQueue) {
    match stored {
        Stored::Object(slots) => {
            for (_, slot) in slots {
                if let Slot::Cell(cell) = slot {
                    cell.unset_inner(pending);
                }
            }
        }
        Stored::Array(slots) => {
            for slot in slots {
                if let Slot::Cell(cell) = slot {
                    cell.unset_inner(pending);
                }
            }
        }
        Stored::Missing | Stored::Leaf(_) => {}
    }
}

fn split_cell(cell: Cell) -> (StateReader, StateWriter) {
    (
        StateReader {
            source: ReadSource::Cell(cell.clone()),
        },
        StateWriter { target: Some(cell) },
    )
}

#[derive(Clone)]
enum ReadSource {
    Cell(Cell),
    /// A derived accessor standing in for a cell: the reader is the
    /// getter. Its consumer identity is skip-marked so reads performed
    /// inside the getter never register anything.
    Derived {
        consumer: Consumer,
        getter: Arc<dyn Fn() -> Value + Send + Sync>,
    },
}

/// Read half of a state cell.
///
/// Reads return plain snapshots and register the ambient consumer as a
/// dependent of the cell.
#[derive(Clone)]
pub struct StateReader {
    source: ReadSource,
}

impl StateReader {
    /// Current value. Registers the ambient consumer against the cell.
    pub fn get(&self) -> Value {
        match &self.source {
            ReadSource::Cell(cell) => cell.get(),
            ReadSource::Derived { consumer, getter } => {
                let _scope = ObserverScope::enter(consumer.clone());
                getter()
            }
        }
    }

    /// Current value without establishing a dependency.
    pub fn get_untracked(&self) -> Value {
        match &self.source {
            ReadSource::Cell(cell) => cell.get_untracked(),
            ReadSource::Derived { consumer, getter } => {
                let _scope = ObserverScope::enter(consumer.clone());
                getter()
            }
        }
    }

    /// Per-field access on an object-valued cell.
    ///
    /// Registers the ambient consumer against this cell, promotes the
    /// key's slot to a nested cell on first access, and returns the
    /// nested cell's reader/writer pair. Returns `None` for non-objects
    /// and missing keys.
    pub fn field(&self, key: &str) -> Option<(StateReader, StateWriter)> {
        match &self.source {
            ReadSource::Cell(cell) => cell.field(key),
            ReadSource::Derived { .. } => None,
        }
    }

    /// Per-index access on an array-valued cell. See [`StateReader::field`].
    pub fn index(&self, index: usize) -> Option<(StateReader, StateWriter)> {
        match &self.source {
            ReadSource::Cell(cell) => cell.index(index),
            ReadSource::Derived { .. } => None,
        }
    }

    /// Number of registered consumers.
    pub fn consumer_count(&self) -> usize {
        match &self.source {
            ReadSource::Cell(cell) => cell.consumer_count(),
            ReadSource::Derived { .. } => 0,
        }
    }
}

impl fmt::Debug for StateReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReader")
            .field("value", &self.get_untracked())
            .field("consumer_count", &self.consumer_count())
            .finish()
    }
}

/// Write half of a state cell.
///
/// Every successful write notifies the cell's registered consumers
/// exactly once each, in registration order, before returning.
#[derive(Clone)]
pub struct StateWriter {
    /// `None` for the writer paired with a derived reader; its writes
    /// are no-ops.
    target: Option<Cell>,
}

impl StateWriter {
    /// Replace the cell's value. For composites this is full-replace:
    /// keys absent from `value` are removed, and their nested cells are
    /// unset.
    pub fn set(&self, value: impl Into<Value>) {
        if let Some(cell) = &self.target {
            cell.apply(Update::Replace(value.into()), false);
        }
    }

    /// Deep-merge `value` into the cell's current value: keys absent
    /// from `value` are left untouched.
    pub fn merge(&self, value: impl Into<Value>) {
        if let Some(cell) = &self.target {
            cell.apply(Update::Merge(value.into()), false);
        }
    }

    /// Compute the next value from the previous one.
    ///
    /// The updater receives a [`Prev`] wrapping the plain snapshot taken
    /// before the write and returns the update to apply.
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(Prev) -> Update,
    {
        let Some(cell) = &self.target else {
            return;
        };
        if cell.is_dead() {
            debug!("update on dead cell ignored");
            return;
        }
        let next = updater(Prev::new(cell.get_untracked()));
        cell.apply(next, false);
    }

    /// Fallible form of [`StateWriter::update`].
    ///
    /// If the updater fails, the write is aborted before any resolution
    /// or notification and the cell keeps its prior value.
    pub fn try_update<F, E>(&self, updater: F) -> Result<(), StateError>
    where
        F: FnOnce(Prev) -> Result<Update, E>,
        E: Into<BoxError>,
    {
        let Some(cell) = &self.target else {
            return Ok(());
        };
        if cell.is_dead() {
            debug!("update on dead cell ignored");
            return Ok(());
        }
        let next =
            updater(Prev::new(cell.get_untracked())).map_err(|err| StateError::Updater(err.into()))?;
        cell.apply(next, false);
        Ok(())
    }

    /// Unset the cell: clear its value, cascade the unset through every
    /// nested cell, notify every consumer once, then detach them all.
    /// The cell is dead afterwards; further writes are ignored.
    pub fn unset(&self) {
        if let Some(cell) = &self.target {
            cell.apply(Update::Unset, false);
        }
    }
}

impl fmt::Debug for StateWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateWriter")
            .field("writable", &self.target.is_some())
            .finish()
    }
}

/// Create a reactive state cell and return its reader/writer pair.
///
/// If a consumer is currently observing (an effect is running), it
/// becomes the cell's owner: the owner is never registered as a
/// dependent of its own cell.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_state(1);
///
/// assert_eq!(count.get(), Value::from(1));
/// set_count.set(5);
/// assert_eq!(count.get(), Value::from(5));
/// ```
pub fn create_state(initial: impl Into<Value>) -> (StateReader, StateWriter) {
    let owner = ObserverScope::current().map(|consumer| consumer.id());
    state_pair(initial.into(), owner)
}

/// Create a reactive state cell with an explicit owner consumer.
pub fn create_state_with_owner(
    initial: impl Into<Value>,
    owner: ConsumerId,
) -> (StateReader, StateWriter) {
    state_pair(initial.into(), Some(owner))
}

/// Create a read-only pass-through: the reader evaluates `getter` on
/// every read, and the paired writer is a no-op.
///
/// This lets a computed accessor be passed wherever a state reader is
/// expected. The getter's consumer identity is skip-marked, so cells it
/// reads never register it as a dependent.
pub fn create_derived<F>(getter: F) -> (StateReader, StateWriter)
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    let consumer = Consumer::new(|| {});
    consumer.mark_skip();

    (
        StateReader {
            source: ReadSource::Derived {
                consumer,
                getter: Arc::new(getter),
            },
        },
        StateWriter { target: None },
    )
}

fn state_pair(value: Value, owner: Option<ConsumerId>) -> (StateReader, StateWriter) {
    split_cell(Cell::new(value, owner))
}
