use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot cancellation flag shared between the check dialog and whoever
/// tears it down.
///
/// Cancellation is cooperative: in-flight requests keep running, but every
/// continuation checks [`CancellationGuard::is_cancelled`] before committing
/// and drops its result when the flag is up.
#[derive(Debug, Clone, Default)]
pub struct CancellationGuard {
    cancelled: Arc<AtomicBool>,
}

impl CancellationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("checks: cancellation raised");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
