//! Reactive State Primitives
//!
//! This module implements the reactive state container: cells, the
//! dependency tracker, the merge/unset resolver, and effects.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A cell holds one dynamic value. Reading a cell inside an observer
//! scope registers the current consumer as a dependent; writing a cell
//! synchronously notifies every registered consumer, in registration
//! order. Object- and array-valued cells lazily grow nested cells per
//! key, so a field write notifies only the consumers that read that
//! field.
//!
//! ## Consumers and scopes
//!
//! A consumer is a zero-argument callback with a stable identity. The
//! currently-running consumer is carried on a thread-local scope stack
//! rather than discovered from the call stack; an `Effect` enters its
//! scope on every run, which is how dependency tracking stays automatic
//! without a subscription API.
//!
//! ## Updates
//!
//! Writes are full-replace by default: keys missing from the new object
//! are removed. A deep merge keeps them. Updater closures receive the
//! previous snapshot and return the intent explicitly. Unset is
//! terminal: it cascades through nested cells, notifies every consumer
//! once, and detaches them all.
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::state::{create_state, run_effect};
//!
//! let (count, set_count) = create_state(0);
//!
//! let count_clone = count.clone();
//! run_effect(move || {
//!     println!("Count: {}", count_clone.get());
//! });
//!
//! set_count.set(5);
//! // Effect automatically re-runs, prints: "Count: 5"
//! ```

mod cell;
mod consumer;
mod effect;
mod error;
mod resolve;
mod scope;
mod tracker;
mod update;
mod value;

pub use cell::{
    create_derived, create_state, create_state_with_owner, CellId, StateReader, StateWriter,
};
pub use consumer::{Consumer, ConsumerId};
pub use effect::{run_effect, Effect};
pub use error::{BoxError, StateError};
pub use scope::{with_observer, ObserverScope};
pub use update::{Prev, Update};
pub use value::Value;
