//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a
//! cell it read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately inside an
//!    observer scope, so every cell it reads registers its consumer.
//!
//! 2. When any of those cells is written, the cell invokes the consumer,
//!    which re-runs the function inside the scope again. Re-reads are
//!    idempotent: the seen-cell record keeps a consumer from registering
//!    twice with the same cell.
//!
//! 3. Registration is permanent. An effect that stops reading a cell
//!    still hears about its writes; `dispose` is the way out, turning
//!    every later invocation into a no-op.
//!
//! # Use Cases
//!
//! Effects synchronize reactive state with the outside world: rendering
//! a page when its state changes, logging, pushing updates over a
//! transport.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use super::consumer::Consumer;
use super::scope::ObserverScope;
use super::tracker;

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique effect ID.
fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct EffectState {
    /// The consumer registered with cells on behalf of this effect.
    /// Filled once during construction.
    consumer: OnceLock<Consumer>,

    /// The effect function.
    run: Box<dyn Fn() + Send + Sync>,

    /// Whether the effect has been disposed.
    disposed: AtomicBool,

    /// Number of times the effect has run.
    run_count: AtomicUsize,
}

impl EffectState {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let consumer = self
            .consumer
            .get()
            .expect("effect consumer is set during construction")
            .clone();

        // Run inside a scope so reads register this effect.
        let _scope = ObserverScope::enter(consumer);
        (self.run)();

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A side-effecting computation that re-runs when its dependencies
/// change.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_state(0);
///
/// let count_clone = count.clone();
/// let effect = Effect::new(move || {
///     println!("Count is: {}", count_clone.get());
/// });
///
/// set_count.set(5);  // Prints: "Count is: 5"
/// ```
pub struct Effect {
    /// Unique identifier for this effect.
    id: u64,

    state: Arc<EffectState>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    ///
    /// Useful when the first run should happen on an explicit trigger.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let state = Arc::new(EffectState {
            consumer: OnceLock::new(),
            run: Box::new(run),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let state_clone = Arc::clone(&state);
        let consumer = Consumer::new(move || state_clone.execute());
        let _ = state.consumer.set(consumer);

        Self {
            id: next_effect_id(),
            state,
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The consumer this effect registers with cells.
    ///
    /// Useful as the owner argument of `create_state_with_owner`.
    pub fn consumer(&self) -> Consumer {
        self.state
            .consumer
            .get()
            .expect("effect consumer is set during construction")
            .clone()
    }

    /// Run the effect function now, inside its observer scope.
    pub fn execute(&self) {
        self.state.execute();
    }

    /// Dispose of the effect.
    ///
    /// After disposal the effect never runs again, and its tracker side
    /// tables are released.
    pub fn dispose(&self) {
        self.state.disposed.store(true, Ordering::SeqCst);
        tracker::forget_consumer(self.consumer().id());
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.state.run_count.load(Ordering::SeqCst)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Arc::clone(&self.state),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` as an effect: it executes immediately, and re-executes
/// whenever a cell it read changes.
pub fn run_effect<F>(f: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(f)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cell::create_state;
    use crate::state::value::Value;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_lazy(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let (count, set_count) = create_state(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let observed_clone = observed.clone();
        let count_clone = count.clone();
        let effect = run_effect(move || {
            let value = count_clone.get().as_f64().unwrap_or(-1.0);
            observed_clone.store(value as i32, Ordering::SeqCst);
        });

        // Ran once on creation, capturing the initial value
        assert_eq!(observed.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 1);

        set_count.set(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let (count, set_count) = create_state(0);

        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();
        let count_clone = count.clone();
        let effect = Effect::new(move || {
            count_clone.get();
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        set_count.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_registers_once_despite_repeated_reads() {
        let (count, set_count) = create_state(0);

        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();
        let count_clone = count.clone();
        let _effect = Effect::new(move || {
            count_clone.get();
            count_clone.get();
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.consumer_count(), 1);

        set_count.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);
        assert_eq!(count.consumer_count(), 1);
    }

    #[test]
    fn effect_owner_guard_prevents_self_subscription() {
        // An effect that creates its own cell and writes it on every run
        // must not subscribe to it, or the first write would loop.
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = runs.clone();
        let _effect = Effect::new(move || {
            let (local, set_local) = create_state(0);
            local.get();
            set_local.set(1);
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());

        assert_eq!(effect1.run_count(), 1);
        effect1.execute();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }

    #[test]
    fn nested_state_seen_by_effect() {
        let (profile, set_profile) =
            create_state(Value::from(serde_json::json!({"name": "ada"})));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let profile_clone = profile.clone();
        let _effect = run_effect(move || {
            let name = profile_clone
                .get()
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_default();
            seen_clone.lock().push(name);
        });

        set_profile.merge(Value::from(serde_json::json!({"name": "grace"})));

        assert_eq!(*seen.lock(), vec!["ada".to_owned(), "grace".to_owned()]);
    }
}
