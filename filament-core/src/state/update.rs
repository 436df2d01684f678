//! Update Protocol
//!
//! A write resolves to one of four intents: replace the value, deep-merge
//! into it, keep it unchanged, or unset the cell. Updater closures receive
//! a `Prev` handle wrapping the previous plain snapshot and return the
//! intent through spelled-out constructors.

use super::value::Value;

/// The resolved intent of a write.
#[derive(Debug, Clone)]
pub enum Update {
    /// Replace the cell's value. For composite values this is full-replace:
    /// keys absent from the new value are removed.
    Replace(Value),
    /// Deep-merge into the current composite value: keys absent from the
    /// new value are left untouched.
    Merge(Value),
    /// Leave the value unchanged. Consumers are still notified.
    Keep,
    /// Clear the value and retire the cell.
    Unset,
}

impl Update {
    /// Full-replace with `value`.
    pub fn replace(value: impl Into<Value>) -> Self {
        Update::Replace(value.into())
    }

    /// Deep-merge `value` into the current value.
    pub fn merge(value: impl Into<Value>) -> Self {
        Update::Merge(value.into())
    }
}

/// The previous value handed to an updater closure.
///
/// Dereferences to the plain snapshot taken before the write. The
/// consuming methods build the common intents without naming `Update`.
#[derive(Debug, Clone)]
pub struct Prev {
    value: Value,
}

impl Prev {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    /// Borrow the previous snapshot.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Take ownership of the previous snapshot.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Signal "previous value unchanged".
    pub fn keep(self) -> Update {
        Update::Keep
    }

    /// Signal "deep-merge this value" rather than replace.
    pub fn merge(self, value: impl Into<Value>) -> Update {
        Update::Merge(value.into())
    }
}

impl std::ops::Deref for Prev {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prev_dereferences_to_snapshot() {
        let prev = Prev::new(Value::from(41));
        assert_eq!(prev.as_f64(), Some(41.0));
    }

    #[test]
    fn prev_builds_intents() {
        assert!(matches!(Prev::new(Value::Null).keep(), Update::Keep));
        assert!(matches!(
            Prev::new(Value::Null).merge(Value::from(1)),
            Update::Merge(Value::Number(_))
        ));
    }
}
