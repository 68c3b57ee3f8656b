//! `Simulation` - wires the desk together, runs it, and joins every actor.
//!
//! # Startup
//!
//! 1. Validate the configuration (nothing is spawned on a bad config)
//! 2. Build the shared `Desk`
//! 3. Spawn the `AdmissionCoordinator`
//! 4. Spawn `helpers` `HelperActor`s, then `seekers` `SeekerActor`s
//! 5. Join every actor; the last seeker to finish stops the others
//!
//! If any actor fails fatally the abort token is cancelled, every other actor
//! unwinds with `DeskError::Aborted`, and the first fatal error is returned.

use crate::config::{Config, ConfigError};
use crate::coordinator::AdmissionCoordinator;
use crate::desk::Desk;
use crate::errors::DeskError;
use crate::events::EventSink;
use crate::helper::{HelperActor, HelperId};
use crate::observability::metrics;
use crate::seeker::{Seeker, SeekerActor, SeekerId};
use std::fmt;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, instrument};

/// Outcome of one completed simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub seekers: usize,
    pub helpers: usize,
    pub chairs: usize,
    pub quota: u32,
    pub admissions: u64,
    pub rejections: u64,
    pub sessions: u64,
    pub peak_active_sessions: u64,
    /// Sessions run per helper, in helper order.
    pub helper_sessions: Vec<(HelperId, u64)>,
    /// Requests the coordinator handled.
    pub requests_handled: u64,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seekers={} helpers={} chairs={} quota={} admissions={} rejections={} sessions={} peak_active={}",
            self.seekers,
            self.helpers,
            self.chairs,
            self.quota,
            self.admissions,
            self.rejections,
            self.sessions,
            self.peak_active_sessions,
        )
    }
}

/// How one actor task ended.
enum ActorExit {
    Helper(HelperId, Result<u64, DeskError>),
    Seeker(Result<SeekerId, DeskError>),
}

/// One configured simulation run.
#[derive(Debug)]
pub struct Simulation {
    config: Config,
    events: EventSink,
}

impl Simulation {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: EventSink::disabled(),
        }
    }

    /// Publish `DeskEvent`s to `events` while running.
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// - [`DeskError::Config`] if the configuration is invalid (no actor is started)
    /// - the first fatal error any actor reported, e.g.
    ///   [`DeskError::ProtocolInconsistency`] or [`DeskError::ActorPanicked`]
    #[instrument(
        skip_all,
        name = "hd.simulation",
        fields(
            seekers = self.config.seekers,
            helpers = self.config.helpers,
            chairs = self.config.chairs,
            quota = self.config.quota,
        )
    )]
    pub async fn run(self) -> Result<SimulationReport, DeskError> {
        let config = self.config;
        config.validate()?;

        let desk = Desk::new(config.chairs, config.seekers, self.events);
        metrics::set_seekers_remaining(config.seekers);

        info!(
            target: "hd.simulation",
            seekers = config.seekers,
            helpers = config.helpers,
            chairs = config.chairs,
            quota = config.quota,
            "Simulation starting"
        );

        let (admission, coordinator) = AdmissionCoordinator::spawn(desk.clone(), config.channel_buffer);
        let mut actors = JoinSet::new();

        for index in 0..config.helpers {
            let id = HelperId::new(actor_index(index, "helpers")?);
            let actor = HelperActor::new(id, desk.clone(), config.session_duration);
            actors.spawn(async move { ActorExit::Helper(id, actor.run().await) });
        }

        for index in 0..config.seekers {
            let seeker = Seeker::new(SeekerId::new(actor_index(index, "seekers")?));
            let actor = SeekerActor::new(
                seeker,
                config.quota,
                desk.clone(),
                admission.clone(),
                config.think_time,
                config.retry_backoff,
            );
            actors.spawn(async move { ActorExit::Seeker(actor.run().await) });
        }
        // Seekers hold the only remaining handles.
        drop(admission);

        let mut failures = Failures::new(&desk);
        let mut helper_sessions = Vec::with_capacity(config.helpers);

        while let Some(joined) = actors.join_next().await {
            match joined {
                Ok(ActorExit::Helper(id, Ok(sessions))) => helper_sessions.push((id, sessions)),
                Ok(ActorExit::Seeker(Ok(_))) => {}
                Ok(ActorExit::Helper(_, Err(e)) | ActorExit::Seeker(Err(e))) => failures.record(e),
                Err(e) => failures.record_join(&e),
            }
        }

        let requests_handled = match coordinator.await {
            Ok(Ok(handled)) => handled,
            Ok(Err(e)) => {
                failures.record(e);
                0
            }
            Err(e) => {
                failures.record_join(&e);
                0
            }
        };

        failures.into_result()?;

        helper_sessions.sort_unstable_by_key(|(id, _)| *id);
        let stats = desk.stats.snapshot();
        let report = SimulationReport {
            seekers: config.seekers,
            helpers: config.helpers,
            chairs: config.chairs,
            quota: config.quota,
            admissions: stats.total_admitted,
            rejections: stats.total_rejected,
            sessions: stats.total_sessions,
            peak_active_sessions: stats.peak_active_sessions,
            helper_sessions,
            requests_handled,
        };

        info!(
            target: "hd.simulation",
            seekers = report.seekers,
            helpers = report.helpers,
            chairs = report.chairs,
            quota = report.quota,
            admissions = report.admissions,
            rejections = report.rejections,
            sessions = report.sessions,
            peak_active = report.peak_active_sessions,
            "Simulation finished"
        );
        Ok(report)
    }
}

fn actor_index(index: usize, field: &str) -> Result<u32, ConfigError> {
    u32::try_from(index).map_err(|_| ConfigError::InvalidValue(format!("too many {field}: {index}")))
}

/// First fatal error seen while joining actors.
struct Failures<'a> {
    desk: &'a Desk,
    first: Option<DeskError>,
    aborted: bool,
}

impl<'a> Failures<'a> {
    fn new(desk: &'a Desk) -> Self {
        Self {
            desk,
            first: None,
            aborted: false,
        }
    }

    fn record(&mut self, err: DeskError) {
        if !err.is_fatal() {
            self.aborted = true;
            return;
        }

        error!(
            target: "hd.simulation",
            error = %err,
            error_type = err.as_label(),
            "Actor failed, aborting simulation"
        );
        self.desk.abort.cancel();
        if self.first.is_none() {
            self.first = Some(err);
        }
    }

    fn record_join(&mut self, err: &JoinError) {
        let err = DeskError::ActorPanicked(err.to_string());
        metrics::record_protocol_error(err.as_label());
        self.record(err);
    }

    fn into_result(self) -> Result<(), DeskError> {
        match (self.first, self.aborted) {
            (Some(err), _) => Err(err),
            (None, true) => Err(DeskError::Aborted),
            (None, false) => Ok(()),
        }
    }
}
