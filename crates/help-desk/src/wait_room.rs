//! `WaitRoom` - fixed-capacity slot table of admitted seekers.
//!
//! The room owns its own lock. Nothing outside this module reads or writes
//! slot state; callers only see the two operations below plus read-only
//! counters.
//!
//! # Slot discipline
//!
//! - `admit` stores a seeker in the **first empty slot in index order**
//! - `take_highest_priority` removes the seeker with the **strictly smallest**
//!   `sessions_received`; on a tie the lowest slot index wins, because only a
//!   strictly smaller value replaces the current pick
//! - `occupied` always equals the number of non-empty slots and is only
//!   changed while the lock is held
//!
//! A seeker is marked `Waiting` inside `admit`, under the room lock, so a
//! helper can never take a seeker that has not yet reached `Waiting`.

use crate::seeker::{Seeker, SeekerId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Slot table plus its occupancy counter, guarded together.
#[derive(Debug)]
struct Slots {
    slots: Vec<Option<Arc<Seeker>>>,
    occupied: usize,
}

/// Bounded priority wait room.
#[derive(Debug)]
pub struct WaitRoom {
    capacity: usize,
    inner: Mutex<Slots>,
}

impl WaitRoom {
    /// Create an empty room with `capacity` chairs.
    ///
    /// A room with zero chairs rejects every admission.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Slots {
                slots: vec![None; capacity],
                occupied: 0,
            }),
        }
    }

    /// Try to seat `seeker` without blocking.
    ///
    /// Returns `false` when every chair is taken (or the seeker is already
    /// seated); the caller decides whether and when to retry.
    pub fn try_admit(&self, seeker: &Arc<Seeker>) -> bool {
        self.admit(seeker).is_ok()
    }

    /// Seat `seeker` and report the occupancy seen under the lock.
    ///
    /// `Ok` carries the occupancy right after the insert. `Err` means nothing
    /// changed and carries the occupancy that caused the refusal.
    pub fn admit(&self, seeker: &Arc<Seeker>) -> Result<usize, usize> {
        let mut guard = self.lock();

        if guard
            .slots
            .iter()
            .flatten()
            .any(|seated| Arc::ptr_eq(seated, seeker))
        {
            warn!(
                target: "hd.wait_room",
                seeker = %seeker.id(),
                "Seeker is already seated, refusing second slot"
            );
            return Err(guard.occupied);
        }

        let occupied = guard.occupied;
        let Some(slot) = guard.slots.iter_mut().find(|slot| slot.is_none()) else {
            return Err(occupied);
        };
        seeker.mark_waiting();
        *slot = Some(Arc::clone(seeker));
        guard.occupied += 1;
        Ok(guard.occupied)
    }

    /// Remove and return the waiting seeker with the fewest sessions received.
    ///
    /// Returns `None` if the room is empty.
    pub fn take_highest_priority(&self) -> Option<Arc<Seeker>> {
        let mut guard = self.lock();

        let mut pick: Option<(usize, u32)> = None;
        for (index, slot) in guard.slots.iter().enumerate() {
            let Some(seeker) = slot else { continue };
            let sessions = seeker.sessions_received();
            match pick {
                Some((_, best)) if sessions >= best => {}
                _ => pick = Some((index, sessions)),
            }
        }

        let (index, _) = pick?;
        let taken = guard.slots.get_mut(index).and_then(Option::take)?;
        guard.occupied -= 1;
        Some(taken)
    }

    /// Number of chairs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied chairs.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.lock().occupied
    }

    /// Number of empty chairs.
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity - self.occupied()
    }

    /// Seeker identity per slot, in slot order.
    #[must_use]
    pub fn seated(&self) -> Vec<Option<SeekerId>> {
        self.lock()
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|seeker| seeker.id()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds a consistent table.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::seeker::SeekerState;

    fn seeker(id: u32, sessions: u32) -> Arc<Seeker> {
        Seeker::with_sessions(SeekerId::new(id), sessions)
    }

    fn assert_counts_consistent(room: &WaitRoom) {
        let seated = room.seated();
        let non_empty = seated.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(room.occupied(), non_empty);
        assert!(room.occupied() <= room.capacity());
        assert_eq!(room.free(), room.capacity() - non_empty);
    }

    #[test]
    fn test_new_room_is_empty() {
        let room = WaitRoom::new(3);
        assert_eq!(room.capacity(), 3);
        assert_eq!(room.occupied(), 0);
        assert_eq!(room.free(), 3);
        assert_eq!(room.seated(), vec![None, None, None]);
        assert!(room.take_highest_priority().is_none());
    }

    #[test]
    fn test_admit_fills_first_empty_slot_then_rejects() {
        let room = WaitRoom::new(2);
        let a = seeker(1, 0);
        let b = seeker(2, 0);
        let c = seeker(3, 0);

        assert_eq!(room.admit(&a), Ok(1));
        assert_eq!(room.admit(&b), Ok(2));
        assert_eq!(room.admit(&c), Err(2));

        assert_eq!(room.seated(), vec![Some(SeekerId::new(1)), Some(SeekerId::new(2))]);
        assert_eq!(c.state(), SeekerState::Requesting);
        assert_counts_consistent(&room);
    }

    #[test]
    fn test_admit_marks_seeker_waiting() {
        let room = WaitRoom::new(1);
        let a = seeker(1, 0);
        assert_eq!(a.state(), SeekerState::Requesting);

        assert!(room.try_admit(&a));
        assert_eq!(a.state(), SeekerState::Waiting);
    }

    #[test]
    fn test_same_seeker_cannot_hold_two_slots() {
        let room = WaitRoom::new(3);
        let a = seeker(1, 0);

        assert!(room.try_admit(&a));
        assert_eq!(room.admit(&a), Err(1));
        assert_eq!(room.occupied(), 1);
        assert_counts_consistent(&room);
    }

    #[test]
    fn test_zero_capacity_room_rejects() {
        let room = WaitRoom::new(0);
        assert!(!room.try_admit(&seeker(1, 0)));
        assert_eq!(room.free(), 0);
    }

    #[test]
    fn test_take_returns_fewest_sessions() {
        let room = WaitRoom::new(4);
        for (id, sessions) in [(1, 3), (2, 1), (3, 2), (4, 5)] {
            assert!(room.try_admit(&seeker(id, sessions)));
        }

        let order: Vec<u32> = std::iter::from_fn(|| room.take_highest_priority())
            .map(|s| s.sessions_received())
            .collect();
        assert_eq!(order, vec![1, 2, 3, 5]);
        assert_eq!(room.occupied(), 0);
    }

    #[test]
    fn test_tie_breaks_on_lowest_slot_index() {
        let room = WaitRoom::new(3);
        assert!(room.try_admit(&seeker(10, 2)));
        assert!(room.try_admit(&seeker(20, 1)));
        assert!(room.try_admit(&seeker(30, 1)));

        assert_eq!(room.take_highest_priority().unwrap().id(), SeekerId::new(20));
        assert_eq!(room.take_highest_priority().unwrap().id(), SeekerId::new(30));
        assert_eq!(room.take_highest_priority().unwrap().id(), SeekerId::new(10));
    }

    #[test]
    fn test_tie_break_follows_slot_not_arrival() {
        let room = WaitRoom::new(3);
        assert!(room.try_admit(&seeker(1, 0)));
        assert!(room.try_admit(&seeker(2, 0)));
        assert!(room.try_admit(&seeker(3, 0)));

        // Free slot 0; a later arrival lands there and now wins the tie.
        assert_eq!(room.take_highest_priority().unwrap().id(), SeekerId::new(1));
        assert!(room.try_admit(&seeker(4, 0)));
        assert_eq!(room.seated()[0], Some(SeekerId::new(4)));
        assert_eq!(room.take_highest_priority().unwrap().id(), SeekerId::new(4));
        assert_counts_consistent(&room);
    }

    #[test]
    fn test_take_never_returns_same_seeker_twice() {
        let room = WaitRoom::new(2);
        let a = seeker(1, 0);
        assert!(room.try_admit(&a));

        let first = room.take_highest_priority().unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        assert!(room.take_highest_priority().is_none());

        // Re-admission makes it takeable again.
        assert!(room.try_admit(&a));
        assert!(Arc::ptr_eq(&room.take_highest_priority().unwrap(), &a));
    }

    #[test]
    fn test_priority_is_non_decreasing_with_interleaved_admits() {
        let room = WaitRoom::new(3);
        assert!(room.try_admit(&seeker(1, 4)));
        assert!(room.try_admit(&seeker(2, 2)));

        let first = room.take_highest_priority().unwrap();
        assert_eq!(first.sessions_received(), 2);

        // A lower count arriving later is still picked next.
        assert!(room.try_admit(&seeker(3, 0)));
        let second = room.take_highest_priority().unwrap();
        assert_eq!(second.sessions_received(), 0);
        let third = room.take_highest_priority().unwrap();
        assert_eq!(third.sessions_received(), 4);
        assert_counts_consistent(&room);
    }

    #[test]
    fn test_concurrent_admit_and_take_keep_counts_consistent() {
        let room = Arc::new(WaitRoom::new(4));
        let seekers: Vec<_> = (0..64).map(|id| seeker(id, id % 5)).collect();

        std::thread::scope(|scope| {
            for chunk in seekers.chunks(16) {
                let room = Arc::clone(&room);
                scope.spawn(move || {
                    for s in chunk {
                        while !room.try_admit(s) {
                            std::thread::yield_now();
                        }
                    }
                });
            }
            for _ in 0..2 {
                let room = Arc::clone(&room);
                scope.spawn(move || {
                    let mut taken = 0;
                    while taken < 32 {
                        if room.take_highest_priority().is_some() {
                            taken += 1;
                        } else {
                            std::thread::yield_now();
                        }
                    }
                });
            }
        });

        assert_eq!(room.occupied(), 0);
        assert_counts_consistent(&room);
    }
}
