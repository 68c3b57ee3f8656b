//! `ShutdownCounter` - the single authoritative "seekers remaining" count.
//!
//! Seekers only ever decrement it, once each, after their last session has
//! fully completed. Reaching zero cancels the shutdown token, which is what
//! helpers and the coordinator watch to stop looping.

use crate::errors::DeskError;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Lock-guarded remaining-seeker counter with a shutdown signal.
#[derive(Debug)]
pub struct ShutdownCounter {
    remaining: Mutex<usize>,
    shutdown: CancellationToken,
}

impl ShutdownCounter {
    /// Create a counter for `seekers` seekers.
    ///
    /// A counter created at zero is already finished.
    #[must_use]
    pub fn new(seekers: usize) -> Self {
        let shutdown = CancellationToken::new();
        if seekers == 0 {
            shutdown.cancel();
        }
        Self {
            remaining: Mutex::new(seekers),
            shutdown,
        }
    }

    /// Deregister one finished seeker and return how many remain.
    ///
    /// The call that brings the count to zero cancels the shutdown token.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::CounterUnderflow`] if the count is already zero.
    pub fn complete_one(&self) -> Result<usize, DeskError> {
        let mut remaining = self.remaining.lock().unwrap_or_else(PoisonError::into_inner);
        *remaining = remaining.checked_sub(1).ok_or(DeskError::CounterUnderflow)?;
        if *remaining == 0 {
            self.shutdown.cancel();
        }
        Ok(*remaining)
    }

    /// Current number of seekers still running.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether every seeker has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Token cancelled once the count reaches zero.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
