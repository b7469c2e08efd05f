//! Cancellation and deadline signal for store operations.
//!
//! # Responsibility
//! - Let callers abort store operations that have not started executing.
//! - Carry an optional deadline alongside the explicit cancel flag.
//!
//! # Invariants
//! - Tokens are cheap to clone; all clones observe the same cancel flag.
//! - A token never un-cancels.
//! - Checks are advisory before each statement; mid-statement atomicity
//!   is whatever SQLite itself guarantees.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation handle passed into every store operation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that never expires on its own.
    pub fn none() -> Self {
        Self::with_inner(None)
    }

    /// Creates a token that reports cancelled once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self::with_inner(Some(Instant::now() + timeout))
    }

    fn with_inner(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
            }),
        }
    }

    /// Trips the cancel flag for every clone of this token.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether the token was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;
    use std::time::Duration;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::none().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::none();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn expired_deadline_reports_cancelled() {
        let token = CancelToken::with_deadline(Duration::ZERO);
        assert!(token.is_cancelled());
    }

    #[test]
    fn future_deadline_is_not_cancelled_yet() {
        let token = CancelToken::with_deadline(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
    }
}
