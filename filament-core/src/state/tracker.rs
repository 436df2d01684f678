//! Dependency Tracker
//!
//! The tracker is the correctness backbone of the reactive system. It
//! owns the side tables that describe consumers (skip markers, handler
//! overrides, seen-cell records) and implements the registration guard
//! chain that keeps dependency tracking idempotent.
//!
//! # How Registration Works
//!
//! 1. A cell read asks the tracker to register the ambient consumer.
//!
//! 2. The tracker refuses when: there is no ambient consumer; the
//!    consumer is the cell's own update routine; the consumer is
//!    skip-marked; or the consumer has already seen this cell.
//!
//! 3. Otherwise the cell is recorded in the consumer's seen-set and the
//!    consumer is appended to the cell's list, preserving
//!    first-registration order.
//!
//! Without the guard chain, a write performed inside a read-triggered
//! consumer would re-register itself on every pass and loop forever.
//!
//! # Side Tables
//!
//! Markers are keyed by `ConsumerId` in global concurrent maps rather
//! than stored on the callbacks themselves. Disposing an effect removes
//! its entries; seen-records otherwise persist, so a consumer that
//! watched a cell through an unset never re-registers on the dead cell.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use dashmap::{DashMap, DashSet};

use super::cell::{Cell, CellId};
use super::consumer::{Consumer, ConsumerId};

type Handler = Arc<dyn Fn() + Send + Sync>;

static SKIP_MARKS: OnceLock<DashSet<ConsumerId>> = OnceLock::new();
static SEEN_CELLS: OnceLock<DashMap<ConsumerId, HashSet<CellId>>> = OnceLock::new();
static HANDLER_OVERRIDES: OnceLock<DashMap<ConsumerId, Handler>> = OnceLock::new();

fn skip_marks() -> &'static DashSet<ConsumerId> {
    SKIP_MARKS.get_or_init(DashSet::new)
}

fn seen_cells() -> &'static DashMap<ConsumerId, HashSet<CellId>> {
    SEEN_CELLS.get_or_init(DashMap::new)
}

fn handler_overrides() -> &'static DashMap<ConsumerId, Handler> {
    HANDLER_OVERRIDES.get_or_init(DashMap::new)
}

/// Mark a consumer as never-to-be-registered.
pub(crate) fn mark_skip(id: ConsumerId) {
    skip_marks().insert(id);
}

/// Whether a consumer carries the skip marker.
pub(crate) fn is_skip(id: ConsumerId) -> bool {
    skip_marks().contains(&id)
}

/// Install a handler override for a consumer.
pub(crate) fn set_handler(id: ConsumerId, handler: Handler) {
    handler_overrides().insert(id, handler);
}

/// Remove a consumer's handler override.
pub(crate) fn clear_handler(id: ConsumerId) {
    handler_overrides().remove(&id);
}

/// The handler override for a consumer, if one is installed.
pub(crate) fn handler_override(id: ConsumerId) -> Option<Handler> {
    handler_overrides().get(&id).map(|entry| entry.value().clone())
}

fn has_seen(id: ConsumerId, cell: CellId) -> bool {
    seen_cells()
        .get(&id)
        .map(|entry| entry.value().contains(&cell))
        .unwrap_or(false)
}

fn note_seen(id: ConsumerId, cell: CellId) {
    seen_cells().entry(id).or_default().insert(cell);
}

/// Drop every side-table entry for a consumer.
///
/// Called when an effect is disposed; its identity will never be invoked
/// again, so the markers have nothing left to describe.
pub(crate) fn forget_consumer(id: ConsumerId) {
    skip_marks().remove(&id);
    seen_cells().remove(&id);
    handler_overrides().remove(&id);
}

/// Register `consumer` as a dependent of `cell`.
///
/// No-op when the consumer is absent, is the cell's owning update
/// routine, is skip-marked, or has already registered with this cell.
pub(crate) fn register(consumer: Option<&Consumer>, cell: &Cell) {
    let Some(consumer) = consumer else {
        return;
    };
    if cell.owner() == Some(consumer.id()) {
        return;
    }
    if is_skip(consumer.id()) {
        return;
    }
    if has_seen(consumer.id(), cell.id()) {
        return;
    }

    note_seen(consumer.id(), cell.id());
    cell.push_consumer(consumer.clone());
}
