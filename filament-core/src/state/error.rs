//! Error types for the reactive core.
//!
//! The core is deliberately quiet: writing to a dead cell is a logged
//! no-op, not an error. The one failure that must surface is a fallible
//! updater refusing to produce a value; that aborts the write before any
//! consumer is notified, leaving the cell's prior value intact.

use thiserror::Error;

/// Boxed error type accepted from fallible updaters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by state writes.
#[derive(Debug, Error)]
pub enum StateError {
    /// An updater passed to `try_update` failed. The write was aborted
    /// before resolution and notification; the cell keeps its prior value.
    #[error("updater failed: {0}")]
    Updater(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_error_preserves_source() {
        let source: BoxError = "out of range".into();
        let err = StateError::Updater(source);

        assert_eq!(err.to_string(), "updater failed: out of range");
        assert!(std::error::Error::source(&err).is_some());
    }
}
