//! Slot and reservation entities

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A (date, start, duration) window on the calendar.
///
/// Windows are half-open: `[start, end)`. Back-to-back slots do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

impl Slot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, duration_minutes: u32) -> Self {
        Self {
            date,
            start_time,
            duration_minutes,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Saturates at the end of chrono's calendar instead of overflowing.
    pub fn end(&self) -> NaiveDateTime {
        self.start()
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end().time()
    }

    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Start as an instant. Slot times are studio wall-clock times at
    /// `offset` from UTC.
    pub fn starts_at(&self, offset: FixedOffset) -> DateTime<Utc> {
        local_to_utc(self.start(), offset)
    }

    pub fn ends_at(&self, offset: FixedOffset) -> DateTime<Utc> {
        local_to_utc(self.end(), offset)
    }
}

fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    match offset.from_local_datetime(&local).single() {
        Some(at) => at.with_timezone(&Utc),
        None if local.and_utc().timestamp() < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date,
            self.start_time.format("%H:%M"),
            self.end_time().format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    /// Provisional hold pending payment
    Held { expires_at: DateTime<Utc> },
    /// Paid for; only released on cancellation
    Committed,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held { .. } => "held",
            Self::Committed => "committed",
        }
    }
}

/// A held or committed occupation of a slot by one booking.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub booking_id: Uuid,
    pub service_offering_id: i32,
    pub slot: Slot,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn held(
        booking_id: Uuid,
        service_offering_id: i32,
        slot: Slot,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            booking_id,
            service_offering_id,
            slot,
            state: ReservationState::Held { expires_at },
            created_at: now,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == ReservationState::Committed
    }

    /// Held past its TTL. Committed reservations never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            ReservationState::Held { expires_at } => now >= expires_at,
            ReservationState::Committed => false,
        }
    }

    /// Whether this reservation still blocks the calendar at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ReservationState::Held { expires_at } => Some(expires_at),
            ReservationState::Committed => None,
        }
    }

    pub fn commit(&mut self) {
        self.state = ReservationState::Committed;
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(h: u32, m: u32, minutes: u32) -> Slot {
        Slot::new(
            NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            minutes,
        )
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let a = slot(10, 0, 60);
        let b = slot(11, 0, 60);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn partial_and_contained_windows_overlap() {
        let a = slot(10, 0, 60);
        assert!(a.overlaps(&slot(10, 30, 60)));
        assert!(a.overlaps(&slot(9, 30, 45)));
        assert!(a.overlaps(&slot(10, 15, 15)));
        assert!(slot(9, 0, 240).overlaps(&a));
    }

    #[test]
    fn slot_crossing_midnight_ends_next_day() {
        let late = slot(23, 0, 120);
        assert_eq!(late.end_time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        let next_morning = Slot::new(
            NaiveDate::from_ymd_opt(2024, 2, 11).unwrap(),
            NaiveTime::from_hms_opt(0, 30, 0).unwrap(),
            30,
        );
        assert!(late.overlaps(&next_morning));
    }

    #[test]
    fn end_saturates_at_calendar_limit() {
        let last = Slot::new(NaiveDate::MAX, NaiveTime::from_hms_opt(23, 30, 0).unwrap(), 120);
        assert_eq!(last.end(), NaiveDateTime::MAX);
        assert!(last.overlaps(&Slot::new(NaiveDate::MAX, NaiveTime::from_hms_opt(23, 45, 0).unwrap(), 60)));
        let _ = last.to_string();
    }

    #[test]
    fn instants_follow_studio_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let s = slot(10, 0, 60);
        assert_eq!(s.starts_at(ist), Utc.with_ymd_and_hms(2024, 2, 10, 4, 30, 0).unwrap());
        assert_eq!(s.ends_at(ist), Utc.with_ymd_and_hms(2024, 2, 10, 5, 30, 0).unwrap());
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(s.starts_at(utc), Utc.with_ymd_and_hms(2024, 2, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn display_shows_window() {
        assert_eq!(slot(10, 0, 60).to_string(), "2024-02-10 10:00-11:00");
    }

    #[test]
    fn held_reservation_expires_at_ttl() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let r = Reservation::held(Uuid::new_v4(), 1, slot(10, 0, 60), now + Duration::minutes(15), now);
        assert!(r.is_live(now));
        assert!(!r.is_expired(now + Duration::minutes(14)));
        assert!(r.is_expired(now + Duration::minutes(15)));
    }

    #[test]
    fn committed_reservation_never_expires() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let mut r = Reservation::held(Uuid::new_v4(), 1, slot(10, 0, 60), now, now);
        assert!(r.is_expired(now));
        r.commit();
        assert!(r.is_committed());
        assert!(!r.is_expired(now + Duration::days(365)));
        assert_eq!(r.expires_at(), None);
    }
}
