//! Consumer types for the reactive system.
//!
//! A Consumer is any zero-argument callback that reads cells and must be
//! re-invoked when a cell it read changes. Render routines, effects, and
//! router pages all end up wrapped in one.
//!
//! A consumer's markers (skip flag, handler override, seen-cell record)
//! are not stored on the consumer itself; they live in side tables owned
//! by the dependency tracker, keyed by the consumer's id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::tracker;

/// Unique identifier for a consumer.
///
/// Each consumer gets a unique id when created. The id is what cells and
/// tracker side tables key on, so a consumer can be cheaply cloned while
/// keeping one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Generate a new unique consumer id.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A zero-argument callback with a stable identity.
///
/// Cloning shares the identity and the callback; a consumer appears at
/// most once in any cell's consumer list no matter how many clones read
/// the cell.
#[derive(Clone)]
pub struct Consumer {
    id: ConsumerId,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl Consumer {
    /// Create a new consumer with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: ConsumerId::new(),
            callback: Arc::new(callback),
        }
    }

    /// Get the consumer's unique id.
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Invoke the consumer.
    ///
    /// If a handler override is installed for this consumer, the override
    /// runs instead of the original callback. This lets a caller register
    /// a stable identity while delegating execution to a wrapped function.
    pub fn invoke(&self) {
        match tracker::handler_override(self.id) {
            Some(handler) => handler(),
            None => (self.callback)(),
        }
    }

    /// Mark this consumer as skipped.
    ///
    /// A skip-marked consumer is never registered as a dependent of any
    /// cell. Internally-generated callbacks (derived accessors, update
    /// routines) are skip-marked so a write cannot re-subscribe itself
    /// as a reader.
    pub fn mark_skip(&self) {
        tracker::mark_skip(self.id);
    }

    /// Whether this consumer carries the skip marker.
    pub fn is_skip(&self) -> bool {
        tracker::is_skip(self.id)
    }

    /// Install a handler override: `invoke` will run `handler` instead of
    /// the original callback.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        tracker::set_handler(self.id, Arc::new(handler));
    }

    /// Remove the handler override, restoring the original callback.
    pub fn clear_handler(&self) {
        tracker::clear_handler(self.id);
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("skip", &self.is_skip())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn consumer_ids_are_unique() {
        let id1 = ConsumerId::new();
        let id2 = ConsumerId::new();
        let id3 = ConsumerId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn invoke_calls_callback() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let consumer = Consumer::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        consumer.invoke();
        consumer.invoke();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clone_shares_identity() {
        let consumer = Consumer::new(|| {});
        let clone = consumer.clone();

        assert_eq!(consumer.id(), clone.id());
    }

    #[test]
    fn handler_override_redirects_invoke() {
        let original = Arc::new(AtomicI32::new(0));
        let wrapped = Arc::new(AtomicI32::new(0));

        let original_clone = original.clone();
        let consumer = Consumer::new(move || {
            original_clone.fetch_add(1, Ordering::SeqCst);
        });

        let wrapped_clone = wrapped.clone();
        consumer.set_handler(move || {
            wrapped_clone.fetch_add(1, Ordering::SeqCst);
        });

        consumer.invoke();
        assert_eq!(original.load(Ordering::SeqCst), 0);
        assert_eq!(wrapped.load(Ordering::SeqCst), 1);

        consumer.clear_handler();
        consumer.invoke();
        assert_eq!(original.load(Ordering::SeqCst), 1);
        assert_eq!(wrapped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn skip_marker_is_visible_through_clones() {
        let consumer = Consumer::new(|| {});
        let clone = consumer.clone();

        assert!(!clone.is_skip());
        consumer.mark_skip();
        assert!(clone.is_skip());
    }
}
