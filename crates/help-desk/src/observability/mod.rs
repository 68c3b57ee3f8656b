//! Observability for the help desk simulation.
//!
//! Structured logs go through `tracing`; counters and gauges go through the
//! `metrics` facade. No recorder or exporter is installed by the library, so
//! every call is a no-op unless the embedding process installs one.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `hd_admissions_total` | Counter | none | Seekers seated by the coordinator |
//! | `hd_rejections_total` | Counter | none | Admission requests refused (room full) |
//! | `hd_sessions_total` | Counter | none | Sessions started by helpers |
//! | `hd_sessions_active` | Gauge | none | Sessions in progress |
//! | `hd_waiting_seekers` | Gauge | none | Occupied chairs after the last admission |
//! | `hd_seekers_remaining` | Gauge | none | Seekers that have not reached their quota |
//! | `hd_protocol_errors_total` | Counter | `error_type` | Fatal protocol errors |

pub mod metrics;
