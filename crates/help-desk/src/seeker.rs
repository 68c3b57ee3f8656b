//! Seekers: the shared seeker record and the `SeekerActor` that drives it.
//!
//! # State machine
//!
//! ```text
//! Requesting ──admit──► Waiting ──helper takes──► BeingServed ──session ends──► Requesting
//!     │  ▲                                                                          │
//!     │  └────────────── rejected: retry after backoff ◄────────────────────────────┘
//!     └──► Done (sessions_received == quota)
//! ```
//!
//! The record is written by at most one actor at a time: the seeker itself
//! while `Requesting`, the `WaitRoom` on admission, and the one helper
//! serving it while `BeingServed`. Every write goes through a `watch`
//! channel, so the seeker waits on precise transitions instead of polling.

use crate::coordinator::AdmissionHandle;
use crate::desk::Desk;
use crate::errors::DeskError;
use crate::events::DeskEvent;
use crate::helper::HelperId;
use crate::observability::metrics;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Opaque seeker identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeekerId(u32);

impl SeekerId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SeekerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seeker-{}", self.0)
    }
}

/// Lifecycle state of a seeker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekerState {
    /// Not in the room; about to ask for (or retrying) admission.
    Requesting,
    /// Seated in the wait room.
    Waiting,
    /// Taken by a helper; session in progress.
    BeingServed,
}

impl SeekerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SeekerState::Requesting => "requesting",
            SeekerState::Waiting => "waiting",
            SeekerState::BeingServed => "being_served",
        }
    }
}

/// Point-in-time view of a seeker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekerStatus {
    pub state: SeekerState,
    /// Priority key: fewer sessions received means served first.
    pub sessions_received: u32,
    /// Helper serving (or that last served) this seeker.
    pub assigned_helper: Option<HelperId>,
}

/// Shared seeker record.
#[derive(Debug)]
pub struct Seeker {
    id: SeekerId,
    status: watch::Sender<SeekerStatus>,
}

impl Seeker {
    /// Create a fresh seeker with no sessions received.
    #[must_use]
    pub fn new(id: SeekerId) -> Arc<Self> {
        Self::with_sessions(id, 0)
    }

    /// Create a seeker that has already received `sessions` sessions.
    #[must_use]
    pub fn with_sessions(id: SeekerId, sessions: u32) -> Arc<Self> {
        let (status, _) = watch::channel(SeekerStatus {
            state: SeekerState::Requesting,
            sessions_received: sessions,
            assigned_helper: None,
        });
        Arc::new(Self { id, status })
    }

    #[must_use]
    pub fn id(&self) -> SeekerId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> SeekerStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn state(&self) -> SeekerState {
        self.status.borrow().state
    }

    #[must_use]
    pub fn sessions_received(&self) -> u32 {
        self.status.borrow().sessions_received
    }

    #[must_use]
    pub fn assigned_helper(&self) -> Option<HelperId> {
        self.status.borrow().assigned_helper
    }

    /// Subscribe to status transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SeekerStatus> {
        self.status.subscribe()
    }

    /// Requesting → Waiting. Called by the wait room under its lock.
    pub(crate) fn mark_waiting(&self) {
        self.status.send_modify(|s| s.state = SeekerState::Waiting);
    }

    /// Waiting → BeingServed, recording the helper and counting the session.
    ///
    /// Returns the new `sessions_received`.
    pub(crate) fn begin_session(&self, helper: HelperId) -> u32 {
        let mut sessions = 0;
        self.status.send_modify(|s| {
            s.state = SeekerState::BeingServed;
            s.sessions_received += 1;
            s.assigned_helper = Some(helper);
            sessions = s.sessions_received;
        });
        sessions
    }

    /// BeingServed → Requesting. The assigned helper is kept so the seeker
    /// can report who served it.
    pub(crate) fn end_session(&self) {
        self.status.send_modify(|s| s.state = SeekerState::Requesting);
    }

    /// Forget the previous helper once the seeker has acknowledged the session.
    pub(crate) fn clear_helper(&self) {
        self.status.send_modify(|s| s.assigned_helper = None);
    }
}

/// Drives one seeker until it has received `quota` sessions.
pub struct SeekerActor {
    seeker: Arc<Seeker>,
    quota: u32,
    desk: Desk,
    admission: AdmissionHandle,
    think_time: Duration,
    retry_backoff: Duration,
}

impl SeekerActor {
    #[must_use]
    pub fn new(
        seeker: Arc<Seeker>,
        quota: u32,
        desk: Desk,
        admission: AdmissionHandle,
        think_time: Duration,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            seeker,
            quota,
            desk,
            admission,
            think_time,
            retry_backoff,
        }
    }

    /// Run the seeker lifecycle.
    ///
    /// Returns the seeker's identity once it has deregistered from the
    /// shutdown counter.
    ///
    /// # Errors
    ///
    /// - [`DeskError::Aborted`] if the simulation was aborted
    /// - [`DeskError::ChannelClosed`] if the coordinator or a semaphore went away
    /// - [`DeskError::CounterUnderflow`] if the seeker counter was already zero
    #[instrument(skip_all, name = "hd.actor.seeker", fields(seeker = %self.seeker.id()))]
    pub async fn run(self) -> Result<SeekerId, DeskError> {
        let id = self.seeker.id();
        let mut transitions = self.seeker.subscribe();

        debug!(target: "hd.actor.seeker", seeker = %id, quota = self.quota, "SeekerActor started");

        while self.seeker.sessions_received() < self.quota {
            let chair = self
                .until_aborted(Arc::clone(&self.desk.free_chairs).acquire_owned())
                .await?
                .map_err(|_| DeskError::ChannelClosed("free-chair permits".to_string()))?;

            let before = self.seeker.sessions_received();
            let outcome = self
                .until_aborted(self.admission.request_admission(Arc::clone(&self.seeker)))
                .await??;

            if !outcome.admitted {
                // Hand the chair permit back; nothing was seated.
                drop(chair);
                info!(
                    target: "hd.actor.seeker",
                    seeker = %id,
                    retry_in = ?self.retry_backoff,
                    "Seeker found no empty chair, will try later"
                );
                self.until_aborted(tokio::time::sleep(self.retry_backoff)).await?;
                continue;
            }

            // The helper that takes this seeker returns the chair permit.
            chair.forget();
            debug!(
                target: "hd.actor.seeker",
                seeker = %id,
                state = self.seeker.state().as_str(),
                empty_chairs = outcome.empty_chairs,
                "Seeker takes a seat"
            );

            self.until_aborted(wait_status(&mut transitions, |s| {
                s.sessions_received > before
            }))
            .await??;
            let served = self
                .until_aborted(wait_status(&mut transitions, |s| {
                    s.state != SeekerState::BeingServed
                }))
                .await??;

            info!(
                target: "hd.actor.seeker",
                seeker = %id,
                state = served.state.as_str(),
                helper = ?served.assigned_helper.map(|h| h.to_string()),
                sessions_received = served.sessions_received,
                "Seeker received help"
            );
            self.seeker.clear_helper();

            if served.sessions_received < self.quota {
                self.until_aborted(tokio::time::sleep(self.think_time)).await?;
            }
        }

        let status = self.seeker.status();
        let remaining = self.desk.counter.complete_one()?;
        metrics::set_seekers_remaining(remaining);
        self.desk.events.publish(DeskEvent::SeekerFinished {
            seeker: id,
            sessions: status.sessions_received,
            remaining,
        });
        info!(
            target: "hd.actor.seeker",
            seeker = %id,
            state = status.state.as_str(),
            sessions = status.sessions_received,
            seekers_left = remaining,
            "Seeker completed"
        );

        if remaining == 0 {
            self.desk.events.publish(DeskEvent::ShutdownStarted);
            info!(target: "hd.actor.seeker", seeker = %id, "Last seeker done, shutting down");
        }

        Ok(id)
    }

    /// Await `fut` unless the simulation is aborted first.
    async fn until_aborted<F: Future>(&self, fut: F) -> Result<F::Output, DeskError> {
        tokio::select! {
            biased;
            () = self.desk.abort.cancelled() => Err(DeskError::Aborted),
            out = fut => Ok(out),
        }
    }
}

/// Wait until the seeker status satisfies `done`, returning that status.
async fn wait_status(
    transitions: &mut watch::Receiver<SeekerStatus>,
    done: impl FnMut(&SeekerStatus) -> bool,
) -> Result<SeekerStatus, DeskError> {
    transitions
        .wait_for(done)
        .await
        .map(|status| *status)
        .map_err(|_| DeskError::ChannelClosed("seeker status".to_string()))
}
