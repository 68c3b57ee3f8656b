//! Shared simulation statistics.
//!
//! Every read-modify-write happens under one lock, separate from the wait
//! room lock and the seeker counter lock. Each update also mirrors the new
//! values into the `metrics` facade.

use crate::observability::metrics;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Snapshot of the simulation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Admission requests handled by the coordinator.
    pub total_requests: u64,
    /// Requests that seated a seeker.
    pub total_admitted: u64,
    /// Requests refused because the room was full.
    pub total_rejected: u64,
    /// Sessions started by helpers.
    pub total_sessions: u64,
    /// Sessions currently in progress.
    pub active_sessions: u64,
    /// Highest `active_sessions` observed.
    pub peak_active_sessions: u64,
}

/// Lock-guarded statistics shared by the coordinator and helpers.
#[derive(Debug, Default)]
pub struct DeskStats {
    inner: Mutex<StatsSnapshot>,
}

impl DeskStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an admitted request and return the updated snapshot.
    pub fn record_admission(&self) -> StatsSnapshot {
        let mut stats = self.lock();
        stats.total_requests += 1;
        stats.total_admitted += 1;
        metrics::record_admission();
        *stats
    }

    /// Count a refused request and return the updated snapshot.
    pub fn record_rejection(&self) -> StatsSnapshot {
        let mut stats = self.lock();
        stats.total_requests += 1;
        stats.total_rejected += 1;
        metrics::record_rejection();
        *stats
    }

    /// Count a started session; returns the number now in progress.
    pub fn session_started(&self) -> u64 {
        let mut stats = self.lock();
        stats.total_sessions += 1;
        stats.active_sessions += 1;
        stats.peak_active_sessions = stats.peak_active_sessions.max(stats.active_sessions);
        metrics::record_session_started(stats.active_sessions);
        stats.active_sessions
    }

    /// Count a finished session; returns the number still in progress.
    pub fn session_ended(&self) -> u64 {
        let mut stats = self.lock();
        stats.active_sessions = stats.active_sessions.saturating_sub(1);
        metrics::set_sessions_active(stats.active_sessions);
        stats.active_sessions
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_and_rejection_counts() {
        let stats = DeskStats::new();

        let first = stats.record_admission();
        assert_eq!(first.total_requests, 1);
        assert_eq!(first.total_admitted, 1);

        let second = stats.record_rejection();
        assert_eq!(second.total_requests, 2);
        assert_eq!(second.total_admitted, 1);
        assert_eq!(second.total_rejected, 1);
    }

    #[test]
    fn test_session_counts_track_peak() {
        let stats = DeskStats::new();

        assert_eq!(stats.session_started(), 1);
        assert_eq!(stats.session_started(), 2);
        assert_eq!(stats.session_ended(), 1);
        assert_eq!(stats.session_started(), 2);
        assert_eq!(stats.session_ended(), 1);
        assert_eq!(stats.session_ended(), 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_sessions, 3);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.peak_active_sessions, 2);
    }

    #[test]
    fn test_session_ended_never_goes_negative() {
        let stats = DeskStats::new();
        assert_eq!(stats.session_ended(), 0);
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
