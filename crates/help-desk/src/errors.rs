//! Help desk error types.
//!
//! A full wait room is not an error: `WaitRoom::try_admit` reports it as
//! `false` and the seeker retries after a delay. Everything in [`DeskError`]
//! either stops the process before any actor starts (`Config`) or aborts a
//! running simulation.

use crate::config::ConfigError;
use crate::helper::HelperId;
use thiserror::Error;

/// Help desk error type.
#[derive(Debug, Error)]
pub enum DeskError {
    /// Simulation parameters were missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A helper held an occupied-room permit but the room had no seeker.
    ///
    /// The permit count and the occupied slot count drifted apart; the
    /// simulation cannot continue safely.
    #[error("Protocol inconsistency: helper {helper} found no seeker behind an occupied-room permit")]
    ProtocolInconsistency { helper: HelperId },

    /// `remainingSeekers` would have gone below zero.
    #[error("Seeker counter underflow")]
    CounterUnderflow,

    /// An actor mailbox or response channel closed unexpectedly.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// The simulation was aborted because another actor failed.
    #[error("Simulation aborted")]
    Aborted,

    /// An actor task panicked or was cancelled by the runtime.
    #[error("Actor panicked: {0}")]
    ActorPanicked(String),
}

impl DeskError {
    /// Returns a short stable label (snake_case) for logs and metrics.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            DeskError::Config(_) => "config",
            DeskError::ProtocolInconsistency { .. } => "protocol_inconsistency",
            DeskError::CounterUnderflow => "counter_underflow",
            DeskError::ChannelClosed(_) => "channel_closed",
            DeskError::Aborted => "aborted",
            DeskError::ActorPanicked(_) => "actor_panicked",
        }
    }

    /// Whether this error must abort a running simulation.
    ///
    /// `Aborted` is the echo of another actor's fatal error, so it is not
    /// itself the root cause.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DeskError::Aborted | DeskError::Config(_))
    }
}
