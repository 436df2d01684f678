//! Observer Scope
//!
//! The scope tracks which consumer is currently running. This enables
//! automatic dependency tracking: when a cell is read, the current
//! consumer is registered as a dependent without the caller ever naming
//! a subscription.
//!
//! # Implementation
//!
//! A thread-local stack holds the active consumers. Entering a scope
//! (running an effect, invoking a derived accessor) pushes a consumer;
//! the guard pops it on drop. Nested scopes work the obvious way: the
//! innermost consumer is the one reads register.

use std::cell::RefCell;

use super::consumer::{Consumer, ConsumerId};

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Consumer>> = const { RefCell::new(Vec::new()) };
}

/// Guard for an active observer scope.
///
/// While the guard lives, any cell read on this thread registers the
/// entered consumer as a dependent. The scope is exited when the guard
/// is dropped, even if the observed computation panics.
pub struct ObserverScope {
    consumer_id: ConsumerId,
}

impl ObserverScope {
    /// Enter a new scope for the given consumer.
    pub fn enter(consumer: Consumer) -> Self {
        let consumer_id = consumer.id();
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(consumer);
        });

        Self { consumer_id }
    }

    /// Check if any observer scope is active on this thread.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The consumer currently observing, if any.
    pub fn current() -> Option<Consumer> {
        SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for ObserverScope {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/exit pairs early.
            if let Some(consumer) = popped {
                debug_assert_eq!(
                    consumer.id(),
                    self.consumer_id,
                    "ObserverScope mismatch: expected {:?}, got {:?}",
                    self.consumer_id,
                    consumer.id()
                );
            }
        });
    }
}

/// Run `f` with `consumer` as the current observer.
pub fn with_observer<R>(consumer: Consumer, f: impl FnOnce() -> R) -> R {
    let _scope = ObserverScope::enter(consumer);
    f()
}
