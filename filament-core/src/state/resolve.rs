//! Merge/Unset Resolver
//!
//! Implements the semantics of partial updates over a composite cell's
//! slot storage: shallow replace vs. deep merge, and the removal of keys
//! absent from a full replace.
//!
//! For each incoming key the resolver either delegates to the key's
//! nested cell (propagating the merge mode) or assigns the raw value.
//! On a full replace, keys present in the current structure but absent
//! from the incoming one are removed; nested cells among them are unset
//! first, so their consumers hear about the removal.

use std::collections::HashSet;

use indexmap::map::Entry;
use indexmap::IndexMap;

use super::cell::{NotifyQueue, Slot};
use super::update::Update;
use super::value::Value;

/// Merge an incoming object into a cell's slot map.
pub(crate) fn merge_object(
    slots: &mut IndexMap<String, Slot>,
    incoming: IndexMap<String, Value>,
    deep: bool,
    pending: &mut NotifyQueue,
) {
    let incoming_keys: HashSet<String> = incoming.keys().cloned().collect();

    for (key, value) in incoming {
        match slots.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Slot::Cell(cell) => cell.apply_inner(Update::Replace(value), deep, pending),
                Slot::Raw(raw) => *raw = value,
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Raw(value));
            }
        }
    }

    if !deep {
        let stale: Vec<String> = slots
            .keys()
            .filter(|key| !incoming_keys.contains(*key))
            .cloned()
            .collect();

        for key in stale {
            if let Some(Slot::Cell(cell)) = slots.shift_remove(&key) {
                cell.unset_inner(pending);
            }
        }
    }
}

/// Merge an incoming array into a cell's index slots.
///
/// Entries write per index. A full replace truncates to the incoming
/// length, unsetting any promoted cells in the removed tail; a deep
/// merge keeps the longer tail.
pub(crate) fn merge_array(
    slots: &mut Vec<Slot>,
    incoming: Vec<Value>,
    deep: bool,
    pending: &mut NotifyQueue,
) {
    let incoming_len = incoming.len();

    for (index, value) in incoming.into_iter().enumerate() {
        if index < slots.len() {
            match &mut slots[index] {
                Slot::Cell(cell) => cell.apply_inner(Update::Replace(value), deep, pending),
                Slot::Raw(raw) => *raw = value,
            }
        } else {
            slots.push(Slot::Raw(value));
        }
    }

    if !deep && incoming_len < slots.len() {
        for slot in slots.drain(incoming_len..) {
            if let Slot::Cell(cell) = slot {
                cell.unset_inner(pending);
            }
        }
    }
}
