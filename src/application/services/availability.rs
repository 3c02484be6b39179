//! Availability index
//!
//! The studio has one crew, so there is exactly one calendar. Every hold,
//! commit, release and sweep runs under a single mutex. The lock is never
//! held across storage I/O: the decision is made in memory, the lock is
//! dropped, then the change is persisted and undone in memory if the write
//! fails.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::booking::BookingStatus;
use crate::domain::reservation::{Reservation, ReservationState, Slot};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::SharedClock;

#[derive(Default)]
struct Calendar {
    reservations: HashMap<Uuid, Reservation>,
}

impl Calendar {
    fn evict_expired(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<Reservation> {
        let expired: Vec<Uuid> = self
            .reservations
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.booking_id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.reservations.remove(&id))
            .collect()
    }

    fn conflict(&self, slot: &Slot, now: chrono::DateTime<chrono::Utc>) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.is_live(now) && r.slot.overlaps(slot))
    }
}

enum CommitDecision {
    Missing,
    AlreadyCommitted,
    Expired(Reservation),
    Committed {
        previous: ReservationState,
        reservation: Reservation,
    },
}

pub struct AvailabilityIndex {
    calendar: Mutex<Calendar>,
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    utc_offset: FixedOffset,
}

impl AvailabilityIndex {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self {
            calendar: Mutex::new(Calendar::default()),
            repos,
            clock,
            utc_offset: Utc.fix(),
        }
    }

    /// Read slot times as wall-clock times at `offset` from UTC.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// True iff no committed or unexpired held reservation overlaps `slot`.
    pub async fn check_available(&self, slot: &Slot) -> bool {
        let now = self.clock.now();
        let calendar = self.calendar.lock().await;
        calendar.conflict(slot, now).is_none()
    }

    /// Atomically check the calendar and take a TTL-bound hold on `slot`
    /// for `booking_id`. Expired holds are evicted first.
    pub async fn hold(
        &self,
        booking_id: Uuid,
        service_offering_id: i32,
        slot: Slot,
        ttl: Duration,
    ) -> DomainResult<Reservation> {
        let now = self.clock.now();
        let (outcome, evicted) = {
            let mut calendar = self.calendar.lock().await;
            let evicted = calendar.evict_expired(now);
            let outcome = if calendar.reservations.contains_key(&booking_id) {
                Err(DomainError::invalid_state(format!(
                    "booking {} already holds a slot",
                    booking_id
                )))
            } else if let Some(existing) = calendar.conflict(&slot, now) {
                debug!(
                    %booking_id,
                    requested = %slot,
                    blocking = %existing.booking_id,
                    "Slot conflict"
                );
                Err(DomainError::SlotConflict {
                    date: slot.date,
                    start: slot.start_time,
                    end: slot.end_time(),
                })
            } else {
                let reservation =
                    Reservation::held(booking_id, service_offering_id, slot, now + ttl, now);
                calendar.reservations.insert(booking_id, reservation.clone());
                Ok(reservation)
            };
            (outcome, evicted)
        };

        self.forget(&evicted).await;
        let reservation = outcome?;

        if let Err(e) = self.repos.reservations().upsert(reservation.clone()).await {
            let mut calendar = self.calendar.lock().await;
            if calendar
                .reservations
                .get(&booking_id)
                .is_some_and(|r| !r.is_committed())
            {
                calendar.reservations.remove(&booking_id);
            }
            error!(%booking_id, error = %e, "Failed to persist hold, rolled back");
            return Err(e);
        }

        debug!(%booking_id, %slot, expires_at = %(now + ttl), "Slot held");
        Ok(reservation)
    }

    /// Convert the booking's hold into a committed reservation. No-op if
    /// already committed. A hold that has passed its TTL is evicted and
    /// reported as missing.
    pub async fn commit(&self, booking_id: Uuid) -> DomainResult<()> {
        let now = self.clock.now();
        let decision = {
            let mut calendar = self.calendar.lock().await;
            let found = calendar
                .reservations
                .get(&booking_id)
                .map(|r| (r.is_committed(), r.is_expired(now)));
            match found {
                None => CommitDecision::Missing,
                Some((true, _)) => CommitDecision::AlreadyCommitted,
                Some((false, true)) => match calendar.reservations.remove(&booking_id) {
                    Some(expired) => CommitDecision::Expired(expired),
                    None => CommitDecision::Missing,
                },
                Some((false, false)) => match calendar.reservations.get_mut(&booking_id) {
                    Some(r) => {
                        let previous = r.state;
                        r.commit();
                        CommitDecision::Committed {
                            previous,
                            reservation: r.clone(),
                        }
                    }
                    None => CommitDecision::Missing,
                },
            }
        };

        match decision {
            CommitDecision::Missing => Err(DomainError::HoldNotFound(booking_id)),
            CommitDecision::AlreadyCommitted => Ok(()),
            CommitDecision::Expired(expired) => {
                info!(%booking_id, slot = %expired.slot, "Hold expired before commit");
                self.forget(&[expired]).await;
                Err(DomainError::HoldNotFound(booking_id))
            }
            CommitDecision::Committed {
                previous,
                reservation,
            } => {
                if let Err(e) = self.repos.reservations().upsert(reservation).await {
                    let mut calendar = self.calendar.lock().await;
                    if let Some(r) = calendar.reservations.get_mut(&booking_id) {
                        r.state = previous;
                    }
                    error!(%booking_id, error = %e, "Failed to persist commit, rolled back");
                    return Err(e);
                }
                info!(%booking_id, "Reservation committed");
                Ok(())
            }
        }
    }

    /// Turn a committed reservation back into a hold expiring at
    /// `expires_at`. Used when the booking write that follows a commit
    /// fails, so a redelivered payment can still commit. A missing or
    /// already held reservation is left alone.
    pub async fn revert_commit(
        &self,
        booking_id: Uuid,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<()> {
        let reverted = {
            let mut calendar = self.calendar.lock().await;
            match calendar.reservations.get_mut(&booking_id) {
                Some(r) if r.is_committed() => {
                    r.state = ReservationState::Held { expires_at };
                    Some(r.clone())
                }
                _ => None,
            }
        };
        let Some(reservation) = reverted else {
            return Ok(());
        };

        // The in-memory hold stands even if the row stays committed;
        // `restore` keeps rows for pending bookings either way.
        if let Err(e) = self.repos.reservations().upsert(reservation).await {
            error!(%booking_id, error = %e, "Failed to persist reverted commit");
            return Err(e);
        }
        info!(%booking_id, %expires_at, "Reservation commit reverted to hold");
        Ok(())
    }

    /// Free whatever the booking holds. Releasing twice is a no-op.
    ///
    /// The in-memory slot is freed even if the delete fails; `restore`
    /// drops persisted rows whose booking is no longer live.
    pub async fn release(&self, booking_id: Uuid) -> DomainResult<()> {
        let removed = {
            let mut calendar = self.calendar.lock().await;
            calendar.reservations.remove(&booking_id)
        };
        let Some(reservation) = removed else {
            return Ok(());
        };

        if let Err(e) = self.repos.reservations().delete(booking_id).await {
            error!(%booking_id, error = %e, "Failed to delete released reservation");
            return Err(e);
        }
        debug!(%booking_id, slot = %reservation.slot, "Reservation released");
        Ok(())
    }

    /// Evict every hold past its TTL and return them so the caller can
    /// expire the owning bookings.
    pub async fn sweep_expired(&self) -> Vec<Reservation> {
        let now = self.clock.now();
        let expired = {
            let mut calendar = self.calendar.lock().await;
            calendar.evict_expired(now)
        };
        self.forget(&expired).await;
        expired
    }

    pub async fn find(&self, booking_id: Uuid) -> Option<Reservation> {
        let calendar = self.calendar.lock().await;
        calendar.reservations.get(&booking_id).cloned()
    }

    /// Live reservations touching `date`, ordered by start.
    pub async fn reservations_on(&self, date: NaiveDate) -> Vec<Reservation> {
        let now = self.clock.now();
        let day = Slot::new(date, NaiveTime::MIN, 24 * 60);
        let mut found: Vec<Reservation> = {
            let calendar = self.calendar.lock().await;
            calendar
                .reservations
                .values()
                .filter(|r| r.is_live(now) && r.slot.overlaps(&day))
                .cloned()
                .collect()
        };
        found.sort_by_key(|r| r.slot.start());
        found
    }

    /// Free start times on `date` for a session of `duration_minutes`,
    /// stepping through business hours. Starts in the past are skipped.
    pub async fn suggest_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        opening: NaiveTime,
        closing: NaiveTime,
        step_minutes: u32,
    ) -> Vec<NaiveTime> {
        if step_minutes == 0 || duration_minutes == 0 {
            return Vec::new();
        }
        let now = self.clock.now();
        let step = Duration::minutes(i64::from(step_minutes));
        let limit = date.and_time(closing);
        let mut cursor = date.and_time(opening);

        let calendar = self.calendar.lock().await;
        let mut free = Vec::new();
        while cursor.date() == date {
            let candidate = Slot::new(date, cursor.time(), duration_minutes);
            if candidate.end() > limit {
                break;
            }
            if candidate.starts_at(self.utc_offset) > now && calendar.conflict(&candidate, now).is_none() {
                free.push(cursor.time());
            }
            cursor += step;
        }
        free
    }

    /// Load persisted reservations into the calendar at startup.
    ///
    /// Rows for bookings that are no longer live are deleted. A committed
    /// reservation without a booking, or two live reservations that
    /// overlap, abort the restore.
    pub async fn restore(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let stored = self.repos.reservations().find_all().await?;

        let mut live: Vec<Reservation> = Vec::new();
        let mut stale: Vec<Reservation> = Vec::new();
        for mut reservation in stored {
            let booking = self
                .repos
                .bookings()
                .find_by_id(reservation.booking_id)
                .await?;
            match booking {
                None if reservation.is_committed() => {
                    return Err(DomainError::InvariantViolation(format!(
                        "committed reservation {} has no booking",
                        reservation.booking_id
                    )));
                }
                None => stale.push(reservation),
                Some(b) => match (b.status, reservation.is_committed()) {
                    (BookingStatus::Pending, false) if reservation.is_live(now) => {
                        live.push(reservation)
                    }
                    (BookingStatus::Confirmed | BookingStatus::Completed, true) => {
                        live.push(reservation)
                    }
                    (BookingStatus::Confirmed | BookingStatus::Completed, false) => {
                        warn!(booking_id = %b.id, "Confirmed booking had an uncommitted hold");
                        reservation.commit();
                        self.repos.reservations().upsert(reservation.clone()).await?;
                        live.push(reservation);
                    }
                    _ => stale.push(reservation),
                },
            }
        }

        for (i, a) in live.iter().enumerate() {
            if let Some(b) = live[i + 1..].iter().find(|b| a.slot.overlaps(&b.slot)) {
                return Err(DomainError::InvariantViolation(format!(
                    "reservations for {} and {} overlap",
                    a.booking_id, b.booking_id
                )));
            }
        }

        let count = live.len();
        {
            let mut calendar = self.calendar.lock().await;
            calendar.reservations = live.into_iter().map(|r| (r.booking_id, r)).collect();
        }
        self.forget(&stale).await;
        info!(restored = count, dropped = stale.len(), "Calendar restored");
        Ok(count)
    }

    /// Delete rows for reservations already removed from the calendar.
    async fn forget(&self, removed: &[Reservation]) {
        for r in removed {
            if let Err(e) = self.repos.reservations().delete(r.booking_id).await {
                warn!(booking_id = %r.booking_id, error = %e, "Failed to delete reservation row");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::{Clock, ManualClock};
    use chrono::{TimeZone, Utc};

    struct Fixture {
        index: AvailabilityIndex,
        repos: Arc<InMemoryRepositoryProvider>,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        let shared: SharedClock = Arc::new(clock.clone());
        let repos = Arc::new(InMemoryRepositoryProvider::new(shared.clone()));
        Fixture {
            index: AvailabilityIndex::new(repos.clone(), shared),
            repos,
            clock,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    }

    fn slot(h: u32, minutes: u32) -> Slot {
        Slot::new(date(), NaiveTime::from_hms_opt(h, 0, 0).unwrap(), minutes)
    }

    fn ttl() -> Duration {
        Duration::minutes(15)
    }

    #[tokio::test]
    async fn overlapping_hold_is_rejected_back_to_back_is_not() {
        let f = fixture();
        f.index.hold(Uuid::new_v4(), 1, slot(10, 60), ttl()).await.unwrap();

        let err = f.index.hold(Uuid::new_v4(), 1, slot(10, 30), ttl()).await.unwrap_err();
        assert!(matches!(err, DomainError::SlotConflict { .. }));
        assert!(f.index.hold(Uuid::new_v4(), 2, slot(11, 60), ttl()).await.is_ok());
        assert!(!f.index.check_available(&slot(9, 120)).await);
        assert!(f.index.check_available(&slot(12, 60)).await);
    }

    #[tokio::test]
    async fn expired_hold_does_not_block() {
        let f = fixture();
        let first = Uuid::new_v4();
        f.index.hold(first, 1, slot(10, 60), ttl()).await.unwrap();
        f.clock.advance(Duration::minutes(15));

        assert!(f.index.check_available(&slot(10, 60)).await);
        f.index.hold(Uuid::new_v4(), 1, slot(10, 60), ttl()).await.unwrap();
        assert!(f.index.find(first).await.is_none());
        assert!(f.repos.reservations().find_by_booking(first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_is_idempotent_and_survives_ttl() {
        let f = fixture();
        let id = Uuid::new_v4();
        f.index.hold(id, 1, slot(10, 60), ttl()).await.unwrap();
        f.index.commit(id).await.unwrap();
        f.index.commit(id).await.unwrap();

        f.clock.advance(Duration::hours(2));
        assert!(f.index.sweep_expired().await.is_empty());
        assert!(f.index.find(id).await.unwrap().is_committed());
        let stored = f.repos.reservations().find_by_booking(id).await.unwrap().unwrap();
        assert!(stored.is_committed());
    }

    #[tokio::test]
    async fn commit_after_expiry_fails_and_frees_slot() {
        let f = fixture();
        let id = Uuid::new_v4();
        f.index.hold(id, 1, slot(10, 60), ttl()).await.unwrap();
        f.clock.advance(Duration::minutes(20));

        assert!(matches!(f.index.commit(id).await, Err(DomainError::HoldNotFound(_))));
        assert!(f.index.find(id).await.is_none());
        assert!(matches!(
            f.index.commit(Uuid::new_v4()).await,
            Err(DomainError::HoldNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reverted_commit_is_a_hold_again() {
        let f = fixture();
        let id = Uuid::new_v4();
        f.index.hold(id, 1, slot(10, 60), ttl()).await.unwrap();
        let expires_at = f.index.find(id).await.unwrap().expires_at().unwrap();
        f.index.commit(id).await.unwrap();

        f.index.revert_commit(id, expires_at).await.unwrap();
        let held = f.index.find(id).await.unwrap();
        assert_eq!(held.state, ReservationState::Held { expires_at });
        let stored = f.repos.reservations().find_by_booking(id).await.unwrap().unwrap();
        assert!(!stored.is_committed());
        assert!(!f.index.check_available(&slot(10, 60)).await);

        f.index.commit(id).await.unwrap();
        assert!(f.index.find(id).await.unwrap().is_committed());
        f.index.revert_commit(Uuid::new_v4(), expires_at).await.unwrap();
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let f = fixture();
        let id = Uuid::new_v4();
        f.index.hold(id, 1, slot(10, 60), ttl()).await.unwrap();
        f.index.release(id).await.unwrap();
        f.index.release(id).await.unwrap();
        assert!(f.index.check_available(&slot(10, 60)).await);
    }

    #[tokio::test]
    async fn sweep_returns_only_expired_holds() {
        let f = fixture();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        f.index.hold(stale, 1, slot(10, 60), ttl()).await.unwrap();
        f.clock.advance(Duration::minutes(10));
        f.index.hold(fresh, 1, slot(12, 60), ttl()).await.unwrap();
        f.clock.advance(Duration::minutes(6));

        let swept = f.index.sweep_expired().await;
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].booking_id, stale);
        assert!(f.index.find(fresh).await.is_some());
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_hold() {
        let f = fixture();
        f.repos.set_unavailable(true);
        let err = f.index.hold(Uuid::new_v4(), 1, slot(10, 60), ttl()).await.unwrap_err();
        assert!(err.is_fatal());

        f.repos.set_unavailable(false);
        assert!(f.index.check_available(&slot(10, 60)).await);
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_commit() {
        let f = fixture();
        let id = Uuid::new_v4();
        f.index.hold(id, 1, slot(10, 60), ttl()).await.unwrap();
        f.repos.set_unavailable(true);
        assert!(f.index.commit(id).await.is_err());
        f.repos.set_unavailable(false);
        assert!(!f.index.find(id).await.unwrap().is_committed());
    }

    #[tokio::test]
    async fn suggestions_skip_taken_windows() {
        let f = fixture();
        f.index.hold(Uuid::new_v4(), 1, slot(10, 60), ttl()).await.unwrap();

        let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let free = f.index.suggest_slots(date(), 60, open, close, 30).await;
        let hours: Vec<String> = free.iter().map(|t| t.format("%H:%M").to_string()).collect();
        assert_eq!(hours, vec!["09:00", "11:00", "11:30", "12:00"]);
    }

    #[tokio::test]
    async fn reservations_on_lists_the_day_in_order() {
        let f = fixture();
        let late = Uuid::new_v4();
        let early = Uuid::new_v4();
        f.index.hold(late, 1, slot(15, 60), ttl()).await.unwrap();
        f.index.hold(early, 1, slot(9, 60), ttl()).await.unwrap();

        let day = f.index.reservations_on(date()).await;
        let ids: Vec<Uuid> = day.iter().map(|r| r.booking_id).collect();
        assert_eq!(ids, vec![early, late]);
        assert!(f.index.reservations_on(date().succ_opt().unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn restore_rejects_orphaned_commit() {
        let f = fixture();
        let now = f.clock.now();
        let mut orphan = Reservation::held(Uuid::new_v4(), 1, slot(10, 60), now, now);
        orphan.commit();
        f.repos.reservations().upsert(orphan).await.unwrap();

        assert!(matches!(
            f.index.restore().await,
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn restore_drops_holds_without_bookings() {
        let f = fixture();
        let now = f.clock.now();
        let id = Uuid::new_v4();
        let hold = Reservation::held(id, 1, slot(10, 60), now + ttl(), now);
        f.repos.reservations().upsert(hold).await.unwrap();

        assert_eq!(f.index.restore().await.unwrap(), 0);
        assert!(f.repos.reservations().find_by_booking(id).await.unwrap().is_none());
    }
}
