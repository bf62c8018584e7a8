//! Cooperative cancellation for a single pipeline run.

use crate::error::{MinutesError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag set when a run is abandoned.
///
/// Engines poll it between decode steps and return `Cancelled`, so a
/// blocking task outlives its caller by at most one step.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MinutesError::Cancelled)
        } else {
            Ok(())
        }
    }
}
