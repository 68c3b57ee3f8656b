//! Metrics definitions for the help desk.
//!
//! All metrics use the `hd_` prefix, `_total` for counters. Labels are
//! bounded by `DeskError::as_label`.

use metrics::{counter, gauge};

/// Count one admitted seeker.
///
/// Metric: `hd_admissions_total`
pub fn record_admission() {
    counter!("hd_admissions_total").increment(1);
}

/// Count one refused admission.
///
/// Metric: `hd_rejections_total`
pub fn record_rejection() {
    counter!("hd_rejections_total").increment(1);
}

/// Count one started session and publish the active count.
///
/// Metrics: `hd_sessions_total`, `hd_sessions_active`
pub fn record_session_started(active: u64) {
    counter!("hd_sessions_total").increment(1);
    set_sessions_active(active);
}

/// Set the number of sessions in progress.
///
/// Metric: `hd_sessions_active`
pub fn set_sessions_active(active: u64) {
    // Session counts stay far below 2^53
    #[allow(clippy::cast_precision_loss)]
    gauge!("hd_sessions_active").set(active as f64);
}

/// Set the number of occupied chairs.
///
/// Metric: `hd_waiting_seekers`
pub fn set_waiting_seekers(waiting: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("hd_waiting_seekers").set(waiting as f64);
}

/// Set the number of seekers still running.
///
/// Metric: `hd_seekers_remaining`
pub fn set_seekers_remaining(remaining: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("hd_seekers_remaining").set(remaining as f64);
}

/// Count a fatal protocol error.
///
/// Metric: `hd_protocol_errors_total`
/// Labels: `error_type`
pub fn record_protocol_error(error_type: &'static str) {
    counter!("hd_protocol_errors_total", "error_type" => error_type).increment(1);
}
