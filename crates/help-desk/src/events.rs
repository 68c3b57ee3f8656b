//! Public simulation events.
//!
//! The core publishes one [`DeskEvent`] per admission, rejection, session
//! start, session end, seeker completion, and shutdown. Consumers (console
//! output, tests) hold the receiving end; the core never waits on them.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits.
//! - **Fire-and-forget**: events are dropped when nobody is listening.
//! - **Per-actor order**: events from one actor arrive in the order it sent them.

use crate::helper::HelperId;
use crate::seeker::SeekerId;
use tokio::sync::mpsc;

/// Observable simulation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskEvent {
    /// A seeker was seated.
    Admitted {
        seeker: SeekerId,
        /// Seekers waiting right after this admission.
        waiting: usize,
        /// Chairs still empty right after this admission.
        empty_chairs: usize,
        /// Running total of admissions.
        total_admitted: u64,
    },

    /// A seeker found the room full.
    Rejected { seeker: SeekerId },

    /// A helper took a seeker and started a session.
    SessionStarted {
        helper: HelperId,
        seeker: SeekerId,
        /// The seeker's `sessions_received` including this session.
        session: u32,
    },

    /// A helper finished a session; the seeker is released right after.
    SessionEnded { helper: HelperId, seeker: SeekerId },

    /// A seeker reached its quota and deregistered.
    SeekerFinished {
        seeker: SeekerId,
        sessions: u32,
        /// Seekers still running after this one.
        remaining: usize,
    },

    /// The last seeker finished; helpers and the coordinator stop.
    ShutdownStarted,
}

impl DeskEvent {
    /// Returns a short stable label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeskEvent::Admitted { .. } => "admitted",
            DeskEvent::Rejected { .. } => "rejected",
            DeskEvent::SessionStarted { .. } => "session_started",
            DeskEvent::SessionEnded { .. } => "session_ended",
            DeskEvent::SeekerFinished { .. } => "seeker_finished",
            DeskEvent::ShutdownStarted => "shutdown_started",
        }
    }
}

/// Cloneable publishing end of the event stream.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<DeskEvent>>,
}

impl EventSink {
    /// A sink that discards every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a connected sink and its receiver.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Publish an event; dropped if there is no receiver.
    pub fn publish(&self, event: DeskEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
