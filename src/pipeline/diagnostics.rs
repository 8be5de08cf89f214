//! Warning sink and cooperative cancellation
//!
//! The pipeline never logs through a process-wide logger. Stages and
//! derivation tasks push warnings into a `Diagnostics` buffer that the
//! orchestrator drains at join, so warning order is deterministic and
//! the caller decides how to render them.

use crate::types::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, polled between stages and between the
/// blur passes of long-running kernels.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Running stages exit at their next poll.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Poll point: returns `Error::Cancelled` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Buffered warning sink handed down into stages and derivation tasks.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Merge another sink's warnings (used when draining task-local sinks).
    pub fn absorb(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_diagnostics_absorb_keeps_order() {
        let mut a = Diagnostics::new();
        a.warn("first");
        let mut b = Diagnostics::new();
        b.warn("second");
        b.warn("third");
        a.absorb(b);
        assert_eq!(a.warnings(), &["first", "second", "third"]);
    }
}
