//! `Desk` - the shared state every actor is wired to.
//!
//! ```text
//!                 free_chairs (permits = empty chairs)
//!   SeekerActor ──acquire──►  AdmissionCoordinator ──admit──► WaitRoom
//!        ▲                          │
//!        │                   occupied.add_permits(1)
//!        │                          ▼
//!        └──── watch ◄──── HelperActor ──take──► WaitRoom
//!                                   │
//!                          free_chairs.add_permits(1)
//! ```
//!
//! The `occupied` permit count never exceeds the number of occupied slots:
//! the coordinator adds a permit only after a successful admit, and a helper
//! consumes one before every take.

use crate::events::EventSink;
use crate::shutdown::ShutdownCounter;
use crate::stats::DeskStats;
use crate::wait_room::WaitRoom;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Shared handles for one simulation run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Desk {
    /// The bounded wait room.
    pub room: Arc<WaitRoom>,
    /// One permit per empty chair a seeker may claim.
    pub free_chairs: Arc<Semaphore>,
    /// One permit per seated seeker not yet taken by a helper.
    pub occupied: Arc<Semaphore>,
    /// Seekers that have not reached their quota.
    pub counter: Arc<ShutdownCounter>,
    /// Lock-guarded statistics.
    pub stats: Arc<DeskStats>,
    /// Public event stream.
    pub events: EventSink,
    /// Cancelled when any actor fails fatally.
    pub abort: CancellationToken,
}

impl Desk {
    /// Create the shared state for `chairs` chairs and `seekers` seekers.
    #[must_use]
    pub fn new(chairs: usize, seekers: usize, events: EventSink) -> Self {
        Self {
            room: Arc::new(WaitRoom::new(chairs)),
            free_chairs: Arc::new(Semaphore::new(chairs)),
            occupied: Arc::new(Semaphore::new(0)),
            counter: Arc::new(ShutdownCounter::new(seekers)),
            stats: Arc::new(DeskStats::new()),
            events,
            abort: CancellationToken::new(),
        }
    }
}
