//! Navigation Bus
//!
//! An explicit history model: a stack of visited locations plus
//! listeners invoked on every movement. This is the component that
//! stands in for the host's history API; nothing in the crate patches
//! or observes platform navigation primitives.
//!
//! `push` appends an entry, `replace` swaps the top entry, and `back`
//! pops to the previous one (the analogue of a popstate event). All
//! three notify listeners with the new current location.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type LocationListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Explicit history stack with movement listeners.
pub struct NavigationBus {
    entries: RwLock<Vec<String>>,
    listeners: RwLock<Vec<LocationListener>>,
}

impl NavigationBus {
    /// Create an empty bus with no history.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener invoked with every new current location.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// The current location, if any navigation has happened.
    pub fn location(&self) -> Option<String> {
        self.entries.read().last().cloned()
    }

    /// Number of history entries.
    pub fn depth(&self) -> usize {
        self.entries.read().len()
    }

    /// Append a new entry and notify listeners.
    pub fn push(&self, url: &str) {
        self.entries.write().push(url.to_owned());
        self.emit(url);
    }

    /// Replace the current entry and notify listeners. With no history
    /// yet, behaves like `push`.
    pub fn replace(&self, url: &str) {
        {
            let mut entries = self.entries.write();
            match entries.last_mut() {
                Some(last) => *last = url.to_owned(),
                None => entries.push(url.to_owned()),
            }
        }
        self.emit(url);
    }

    /// Pop the current entry and notify listeners with the previous one.
    /// No-op when there is no previous entry.
    pub fn back(&self) {
        let previous = {
            let mut entries = self.entries.write();
            if entries.len() < 2 {
                return;
            }
            entries.pop();
            entries.last().cloned()
        };

        if let Some(url) = previous {
            self.emit(&url);
        }
    }

    fn emit(&self, url: &str) {
        // Snapshot so listeners can subscribe reentrantly.
        let listeners: Vec<LocationListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(url);
        }
    }
}

impl Default for NavigationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NavigationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationBus")
            .field("location", &self.location())
            .field("depth", &self.depth())
            .finish()
    }
}
