//! Filament Core
//!
//! This crate provides the core runtime for the Filament single-page
//! application framework. It implements:
//!
//! - The reactive state container (cells, dependency tracking, effects)
//! - Merge/unset semantics for partial state updates
//! - The SPA router with an explicit navigation bus
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `state`: reactive cells, the dependency tracker, and effects
//! - `router`: route table, path resolution, and the navigation bus
//!
//! The two meet only at the edge: a router page is an opaque callback,
//! and wrapping one into a reactive consumer is the embedder's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::state::{create_state, run_effect};
//!
//! // Create a state cell
//! let (count, set_count) = create_state(0);
//!
//! // Create an effect; it runs now and on every change
//! let count_clone = count.clone();
//! run_effect(move || {
//!     println!("Count: {}", count_clone.get());
//! });
//!
//! // Update the cell
//! set_count.set(5);
//! // Effect automatically re-runs, prints: "Count: 5"
//! ```

pub mod router;
pub mod state;
