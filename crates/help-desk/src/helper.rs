//! `HelperActor` - serves the highest-priority waiting seeker, one at a time.
//!
//! # Session protocol
//!
//! ```text
//! loop {
//!   ├─► stop if every seeker has finished
//!   ├─► acquire one `occupied` permit (forgotten: the admission is consumed)
//!   ├─► WaitRoom::take_highest_priority()
//!   │       └─ None ─► ProtocolInconsistency, abort the simulation
//!   ├─► stats: session started
//!   ├─► seeker: BeingServed, sessions_received += 1, assigned_helper = self
//!   ├─► release one `free_chairs` permit (the chair is vacated now)
//!   ├─► sleep(session_duration), unless the simulation is aborted
//!   ├─► stats: session ended
//!   └─► seeker: back to Requesting
//! }
//! ```

use crate::desk::Desk;
use crate::errors::DeskError;
use crate::events::DeskEvent;
use crate::observability::metrics;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Opaque helper identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HelperId(u32);

impl HelperId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "helper-{}", self.0)
    }
}

/// One helper actor.
pub struct HelperActor {
    id: HelperId,
    desk: Desk,
    session_duration: Duration,
}

impl HelperActor {
    #[must_use]
    pub fn new(id: HelperId, desk: Desk, session_duration: Duration) -> Self {
        Self {
            id,
            desk,
            session_duration,
        }
    }

    /// Spawn the helper loop.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<Result<u64, DeskError>> {
        tokio::spawn(self.run())
    }

    /// Serve seekers until every seeker has finished.
    ///
    /// Returns the number of sessions this helper ran.
    ///
    /// # Errors
    ///
    /// - [`DeskError::ProtocolInconsistency`] if a permit had no seeker behind it;
    ///   the simulation abort token is cancelled before returning
    /// - [`DeskError::Aborted`] if another actor aborted the simulation
    /// - [`DeskError::ChannelClosed`] if the occupied-room semaphore was closed
    #[instrument(skip_all, name = "hd.actor.helper", fields(helper = %self.id))]
    pub async fn run(self) -> Result<u64, DeskError> {
        let shutdown = self.desk.counter.token();
        let mut served: u64 = 0;

        debug!(target: "hd.actor.helper", helper = %self.id, "HelperActor started");

        loop {
            if self.desk.counter.is_finished() {
                break;
            }

            tokio::select! {
                biased;

                () = self.desk.abort.cancelled() => {
                    return Err(DeskError::Aborted);
                }

                () = shutdown.cancelled() => {
                    break;
                }

                permit = self.desk.occupied.acquire() => {
                    permit
                        .map_err(|_| DeskError::ChannelClosed("occupied-room permits".to_string()))?
                        .forget();
                }
            }

            self.serve_one().await?;
            served += 1;
        }

        info!(
            target: "hd.actor.helper",
            helper = %self.id,
            sessions = served,
            "HelperActor stopped"
        );
        Ok(served)
    }

    /// Take the highest-priority seeker and run one session.
    async fn serve_one(&self) -> Result<(), DeskError> {
        let Some(seeker) = self.desk.room.take_highest_priority() else {
            let err = DeskError::ProtocolInconsistency { helper: self.id };
            error!(
                target: "hd.actor.helper",
                helper = %self.id,
                occupied_permits = self.desk.occupied.available_permits(),
                occupied_slots = self.desk.room.occupied(),
                "Occupied-room permit with an empty wait room, aborting"
            );
            metrics::record_protocol_error(err.as_label());
            self.desk.abort.cancel();
            return Err(err);
        };

        let active = self.desk.stats.session_started();
        let session = seeker.begin_session(self.id);
        self.desk.free_chairs.add_permits(1);

        self.desk.events.publish(DeskEvent::SessionStarted {
            helper: self.id,
            seeker: seeker.id(),
            session,
        });
        info!(
            target: "hd.actor.helper",
            helper = %self.id,
            seeker = %seeker.id(),
            session,
            active_sessions = active,
            "Seeker served by helper"
        );

        tokio::select! {
            biased;

            () = self.desk.abort.cancelled() => {
                debug!(
                    target: "hd.actor.helper",
                    helper = %self.id,
                    seeker = %seeker.id(),
                    "Session cut short by abort"
                );
                return Err(DeskError::Aborted);
            }

            () = tokio::time::sleep(self.session_duration) => {}
        }

        self.desk.stats.session_ended();
        // Published before the seeker is released so that, per seeker,
        // SessionEnded always precedes that seeker's next SessionStarted.
        self.desk.events.publish(DeskEvent::SessionEnded {
            helper: self.id,
            seeker: seeker.id(),
        });
        seeker.end_session();

        debug!(
            target: "hd.actor.helper",
            helper = %self.id,
            seeker = %seeker.id(),
            "Session finished"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::events::EventSink;
    use crate::seeker::{Seeker, SeekerId, SeekerState};
    use std::sync::Arc;

    #[test]
    fn test_helper_id_display() {
        assert_eq!(HelperId::new(3).to_string(), "helper-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_helper_serves_seated_seeker() {
        let (events, mut rx) = EventSink::channel();
        let desk = Desk::new(1, 1, events);
        let seeker = Seeker::new(SeekerId::new(1));

        // Seat the seeker the way the coordinator does.
        desk.free_chairs.acquire().await.unwrap().forget();
        assert!(desk.room.try_admit(&seeker));
        desk.occupied.add_permits(1);

        let task = HelperActor::new(HelperId::new(0), desk.clone(), Duration::from_millis(5)).spawn();

        assert_eq!(
            rx.recv().await.unwrap(),
            DeskEvent::SessionStarted {
                helper: HelperId::new(0),
                seeker: SeekerId::new(1),
                session: 1,
            }
        );
        assert_eq!(seeker.state(), SeekerState::BeingServed);
        assert_eq!(desk.free_chairs.available_permits(), 1);
        assert_eq!(desk.room.occupied(), 0);

        assert_eq!(
            rx.recv().await.unwrap(),
            DeskEvent::SessionEnded {
                helper: HelperId::new(0),
                seeker: SeekerId::new(1),
            }
        );
        tokio::task::yield_now().await;
        assert_eq!(seeker.state(), SeekerState::Requesting);
        assert_eq!(seeker.assigned_helper(), Some(HelperId::new(0)));

        desk.counter.complete_one().unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 1);
        assert_eq!(desk.stats.snapshot().total_sessions, 1);
        assert_eq!(desk.stats.snapshot().active_sessions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_helper_picks_fewest_sessions_first() {
        let (events, mut rx) = EventSink::channel();
        let desk = Desk::new(2, 2, events);
        let veteran = Seeker::with_sessions(SeekerId::new(1), 3);
        let newcomer = Seeker::with_sessions(SeekerId::new(2), 0);

        for seeker in [&veteran, &newcomer] {
            assert!(desk.room.try_admit(seeker));
            desk.occupied.add_permits(1);
        }

        let _task = HelperActor::new(HelperId::new(0), desk.clone(), Duration::from_millis(1)).spawn();

        let started: Vec<SeekerId> = {
            let mut ids = Vec::new();
            while ids.len() < 2 {
                if let DeskEvent::SessionStarted { seeker, .. } = rx.recv().await.unwrap() {
                    ids.push(seeker);
                }
            }
            ids
        };
        assert_eq!(started, vec![SeekerId::new(2), SeekerId::new(1)]);
        desk.abort.cancel();
    }

    #[tokio::test]
    async fn test_permit_without_seeker_is_protocol_inconsistency() {
        let desk = Desk::new(1, 1, EventSink::disabled());
        desk.occupied.add_permits(1);

        let result = HelperActor::new(HelperId::new(7), desk.clone(), Duration::ZERO)
            .run()
            .await;

        assert!(matches!(
            result,
            Err(DeskError::ProtocolInconsistency { helper }) if helper == HelperId::new(7)
        ));
        assert!(desk.abort.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_interrupts_session_in_progress() {
        let (events, mut rx) = EventSink::channel();
        let desk = Desk::new(1, 1, events);
        let seeker = Seeker::new(SeekerId::new(1));
        assert!(desk.room.try_admit(&seeker));
        desk.occupied.add_permits(1);

        let session = Duration::from_secs(60);
        let started = tokio::time::Instant::now();
        let task = HelperActor::new(HelperId::new(0), desk.clone(), session).spawn();

        assert!(matches!(
            rx.recv().await.unwrap(),
            DeskEvent::SessionStarted { .. }
        ));
        desk.abort.cancel();

        assert!(matches!(task.await.unwrap(), Err(DeskError::Aborted)));
        assert!(started.elapsed() < session);
        assert_eq!(seeker.state(), SeekerState::BeingServed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_helper_stops_on_shutdown() {
        let desk = Desk::new(1, 1, EventSink::disabled());
        let task = HelperActor::new(HelperId::new(0), desk.clone(), Duration::ZERO).spawn();

        tokio::task::yield_now().await;
        desk.counter.complete_one().unwrap();

        assert_eq!(task.await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_helper_returns_aborted() {
        let desk = Desk::new(1, 1, EventSink::disabled());
        let task = HelperActor::new(HelperId::new(0), desk.clone(), Duration::ZERO).spawn();

        desk.abort.cancel();
        assert!(matches!(task.await.unwrap(), Err(DeskError::Aborted)));
    }

    #[tokio::test]
    async fn test_finished_counter_stops_before_waiting() {
        let desk = Desk::new(1, 0, EventSink::disabled());
        let served = HelperActor::new(HelperId::new(0), desk, Duration::ZERO)
            .run()
            .await
            .unwrap();
        assert_eq!(served, 0);
    }

    #[test]
    fn test_seeker_arc_is_shared_with_room() {
        let desk = Desk::new(1, 1, EventSink::disabled());
        let seeker = Seeker::new(SeekerId::new(9));
        assert!(desk.room.try_admit(&seeker));
        let taken = desk.room.take_highest_priority().unwrap();
        assert!(Arc::ptr_eq(&taken, &seeker));
    }
}
