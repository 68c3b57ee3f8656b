//! `AdmissionCoordinator` - the single serialization point for admissions.
//!
//! The coordinator is the only caller of `WaitRoom::admit`. Seekers send an
//! `Arrival` over the coordinator mailbox and wait on a private oneshot for
//! the outcome; the coordinator handles one arrival to completion before it
//! receives the next, so no two seekers are ever mid-admission at once.
//!
//! Per successful admission the coordinator, in order:
//! 1. updates the admission statistics and takes a snapshot
//! 2. adds exactly one `occupied` permit (wakes one helper)
//! 3. replies to the requesting seeker
//!
//! The coordinator stops when every seeker has finished, when its mailbox
//! closes, or when the simulation is aborted.

use crate::desk::Desk;
use crate::errors::DeskError;
use crate::events::DeskEvent;
use crate::observability::metrics;
use crate::seeker::Seeker;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Messages sent to the `AdmissionCoordinator`.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// A seeker holding a free-chair permit asks to be seated.
    Arrival {
        seeker: Arc<Seeker>,
        /// Response channel for the admission outcome.
        respond_to: oneshot::Sender<AdmissionOutcome>,
    },
}

/// Result of one admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionOutcome {
    /// Whether the seeker was seated.
    pub admitted: bool,
    /// Seekers waiting right after this decision.
    pub waiting: usize,
    /// Chairs empty right after this decision.
    pub empty_chairs: usize,
    /// Running total of admissions.
    pub total_admitted: u64,
}

/// Handle to the `AdmissionCoordinator`.
#[derive(Debug, Clone)]
pub struct AdmissionHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
}

impl AdmissionHandle {
    /// Ask the coordinator to seat `seeker` and wait for its decision.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::ChannelClosed`] if the coordinator has stopped.
    pub async fn request_admission(&self, seeker: Arc<Seeker>) -> Result<AdmissionOutcome, DeskError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Arrival {
                seeker,
                respond_to: tx,
            })
            .await
            .map_err(|e| DeskError::ChannelClosed(format!("coordinator send failed: {e}")))?;

        rx.await
            .map_err(|e| DeskError::ChannelClosed(format!("admission response receive failed: {e}")))
    }
}

/// The admission coordinator actor.
pub struct AdmissionCoordinator {
    receiver: mpsc::Receiver<CoordinatorMessage>,
    desk: Desk,
}

impl AdmissionCoordinator {
    /// Spawn the coordinator and return its handle and task.
    #[must_use]
    pub fn spawn(
        desk: Desk,
        buffer: usize,
    ) -> (AdmissionHandle, JoinHandle<Result<u64, DeskError>>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let actor = Self { receiver, desk };
        let task = tokio::spawn(actor.run());
        (AdmissionHandle { sender }, task)
    }

    /// Run the coordinator loop; returns the number of requests handled.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Aborted`] if the simulation was aborted.
    #[instrument(skip_all, name = "hd.actor.coordinator")]
    async fn run(mut self) -> Result<u64, DeskError> {
        info!(target: "hd.actor.coordinator", "AdmissionCoordinator started");
        let shutdown = self.desk.counter.token();
        let mut handled: u64 = 0;

        loop {
            if self.desk.counter.is_finished() {
                break;
            }

            tokio::select! {
                biased;

                () = self.desk.abort.cancelled() => {
                    warn!(target: "hd.actor.coordinator", handled, "AdmissionCoordinator aborted");
                    return Err(DeskError::Aborted);
                }

                () = shutdown.cancelled() => {
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(CoordinatorMessage::Arrival { seeker, respond_to }) => {
                            let outcome = self.admit(&seeker);
                            handled += 1;
                            if respond_to.send(outcome).is_err() {
                                // Only reachable if the seeker was aborted mid-request.
                                debug!(
                                    target: "hd.actor.coordinator",
                                    seeker = %seeker.id(),
                                    "Seeker dropped its admission response"
                                );
                            }
                        }
                        None => {
                            info!(target: "hd.actor.coordinator", "AdmissionCoordinator channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "hd.actor.coordinator",
            requests_handled = handled,
            "AdmissionCoordinator stopped"
        );
        Ok(handled)
    }

    /// Decide one arrival.
    fn admit(&self, seeker: &Arc<Seeker>) -> AdmissionOutcome {
        let room = &self.desk.room;

        let waiting = match room.admit(seeker) {
            Ok(waiting) => waiting,
            Err(waiting) => {
                let stats = self.desk.stats.record_rejection();
                self.desk.events.publish(DeskEvent::Rejected { seeker: seeker.id() });
                info!(
                    target: "hd.actor.coordinator",
                    seeker = %seeker.id(),
                    waiting,
                    "Wait room full, admission refused"
                );
                return AdmissionOutcome {
                    admitted: false,
                    waiting,
                    empty_chairs: room.capacity().saturating_sub(waiting),
                    total_admitted: stats.total_admitted,
                };
            }
        };

        let stats = self.desk.stats.record_admission();
        let empty_chairs = room.capacity().saturating_sub(waiting);
        metrics::set_waiting_seekers(waiting);
        self.desk.events.publish(DeskEvent::Admitted {
            seeker: seeker.id(),
            waiting,
            empty_chairs,
            total_admitted: stats.total_admitted,
        });
        info!(
            target: "hd.actor.coordinator",
            seeker = %seeker.id(),
            waiting,
            empty_chairs,
            total_admitted = stats.total_admitted,
            "Seeker takes a seat"
        );

        self.desk.occupied.add_permits(1);

        AdmissionOutcome {
            admitted: true,
            waiting,
            empty_chairs,
            total_admitted: stats.total_admitted,
        }
    }
}
