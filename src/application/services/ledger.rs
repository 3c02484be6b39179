//! Booking ledger
//!
//! Owns every booking and payment-intent mutation. Commands on one booking
//! are serialized by a per-booking async mutex, and every write is a
//! compare-and-swap on the booking's version, so a second process sharing
//! the database loses with `ConcurrentModification` instead of overwriting.
//!
//! Lock order is booking, then calendar. The calendar never calls back in.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::availability::AvailabilityIndex;
use super::catalog::ServiceCatalog;
use super::refunds::{RefundQueue, RefundRequest};
use crate::application::events::{
    BookingCancelledEvent, BookingCompletedEvent, BookingConfirmedEvent, BookingCreatedEvent,
    BookingExpiredEvent, Event, PaymentFailedEvent, RefundCompletedEvent, SharedEventBus,
};
use crate::application::ports::GatewayOrder;
use crate::domain::booking::{
    Booking, BookingEvent, BookingFilter, BookingStats, BookingStatus, CancelReason,
    CustomerInfo, EventDetails, PaymentStatus,
};
use crate::domain::payment::{IntentStatus, PaymentIntent};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::SharedClock;

/// Prefix of `payment_reference` for payments recorded by an administrator
pub const MANUAL_PAYMENT_PREFIX: &str = "manual:";

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub hold_ttl: Duration,
    pub currency: String,
    /// Offset of the studio's wall clock from UTC
    pub utc_offset: FixedOffset,
    /// Furthest ahead an event may start
    pub max_advance: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::minutes(15),
            currency: "INR".to_string(),
            utc_offset: Utc.fix(),
            max_advance: Duration::days(730),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_offering_id: i32,
    pub customer: CustomerInfo,
    pub event: EventDetails,
}

/// What `request_payment` found
#[derive(Debug, Clone)]
pub enum PaymentPreparation {
    /// The booking already has an open intent; reuse it.
    Existing(PaymentIntent),
    /// A gateway order must be created, then passed to `attach_intent`.
    NeedsOrder(Booking),
}

#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Confirmed(Booking),
    /// Same gateway payment seen before; nothing changed.
    AlreadyApplied(Booking),
    /// Signature did not verify; booking stays pending.
    VerificationFailed(Booking),
}

impl PaymentOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            Self::Confirmed(b) | Self::AlreadyApplied(b) | Self::VerificationFailed(b) => b,
        }
    }
}

pub struct BookingLedger {
    repos: Arc<dyn RepositoryProvider>,
    catalog: Arc<ServiceCatalog>,
    availability: Arc<AvailabilityIndex>,
    events: SharedEventBus,
    refunds: RefundQueue,
    clock: SharedClock,
    settings: LedgerSettings,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl BookingLedger {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        catalog: Arc<ServiceCatalog>,
        availability: Arc<AvailabilityIndex>,
        events: SharedEventBus,
        refunds: RefundQueue,
        clock: SharedClock,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            repos,
            catalog,
            availability,
            events,
            refunds,
            clock,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn availability(&self) -> &Arc<AvailabilityIndex> {
        &self.availability
    }

    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // ── Queries ────────────────────────────────────────────────

    pub async fn get(&self, id: Uuid) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::BookingNotFound(id))
    }

    pub async fn list(&self, filter: &BookingFilter) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_all(filter).await
    }

    pub async fn stats(&self) -> DomainResult<BookingStats> {
        let all = self.repos.bookings().find_all(&BookingFilter::default()).await?;
        let mut stats = BookingStats::default();
        for booking in &all {
            stats.record(booking);
        }
        Ok(stats)
    }

    pub async fn intents(&self, booking_id: Uuid) -> DomainResult<Vec<PaymentIntent>> {
        self.repos.payment_intents().find_by_booking(booking_id).await
    }

    // ── Commands ───────────────────────────────────────────────

    /// Hold the slot and record a pending booking. On conflict nothing is
    /// written.
    pub async fn create(&self, request: NewBooking) -> DomainResult<Booking> {
        let now = self.clock.now();
        let latest = now
            .checked_add_signed(self.settings.max_advance)
            .map(|t| t.date_naive());
        validate_new_booking(&request, latest)?;
        let service = self.catalog.get_active(request.service_offering_id).await?;

        let id = Uuid::new_v4();
        let booking = Booking::new(
            id,
            &service,
            request.customer,
            request.event,
            self.settings.currency.clone(),
            now + self.settings.hold_ttl,
            now,
        );
        if booking.slot.starts_at(self.settings.utc_offset) <= now {
            return Err(DomainError::Validation(
                "event must start in the future".into(),
            ));
        }

        match self
            .availability
            .hold(id, service.id, booking.slot, self.settings.hold_ttl)
            .await
        {
            Ok(_) => {}
            Err(e @ DomainError::SlotConflict { .. }) => {
                metrics::counter!("slot_conflicts_total").increment(1);
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.repos.bookings().insert(booking.clone()).await {
            error!(booking_id = %id, error = %e, "Failed to store booking, releasing hold");
            if let Err(release_err) = self.availability.release(id).await {
                warn!(booking_id = %id, error = %release_err, "Release after failed insert also failed");
            }
            return Err(e);
        }

        metrics::counter!("bookings_created_total").increment(1);
        info!(
            booking_id = %id,
            service = %service.name,
            slot = %booking.slot,
            amount = booking.total_amount,
            "Booking created"
        );
        self.events.publish(Event::BookingCreated(BookingCreatedEvent {
            booking_id: id,
            service_name: booking.service_name.clone(),
            customer_email: booking.customer.email.clone(),
            date: booking.event.date,
            start_time: booking.event.start_time,
            hold_expires_at: booking.hold_expires_at,
        }));
        Ok(booking)
    }

    /// Check that the booking can take a payment and return its open
    /// intent, if any. Expired holds are expired here.
    pub async fn request_payment(&self, booking_id: Uuid) -> DomainResult<PaymentPreparation> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;
        self.ensure_payable(&mut booking, now).await?;

        if let Some(intent) = self.open_intent(&booking).await? {
            debug!(%booking_id, intent_id = %intent.id, "Reusing open payment intent");
            return Ok(PaymentPreparation::Existing(intent));
        }
        Ok(PaymentPreparation::NeedsOrder(booking))
    }

    /// Record a gateway order as the booking's active intent. A failed
    /// prior intent is superseded. If another request attached an open
    /// intent meanwhile, that one is returned instead.
    pub async fn attach_intent(
        &self,
        booking_id: Uuid,
        order: GatewayOrder,
    ) -> DomainResult<PaymentIntent> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;
        self.ensure_payable(&mut booking, now).await?;

        if let Some(existing) = self.open_intent(&booking).await? {
            debug!(%booking_id, order_id = %order.order_id, "Order raced an open intent, discarding");
            return Ok(existing);
        }
        if order.amount != booking.total_amount || order.currency != booking.currency {
            return Err(DomainError::GatewayError(format!(
                "order {} is for {} {}, booking total is {} {}",
                order.order_id, order.amount, order.currency, booking.total_amount, booking.currency
            )));
        }

        let intent = PaymentIntent::new(
            booking_id,
            order.amount,
            order.currency,
            order.order_id,
            now,
        );
        self.repos.payment_intents().save(intent.clone()).await?;

        let expected = booking.version;
        let superseded = booking.active_intent_id.replace(intent.id);
        booking.touch(now);
        self.repos.bookings().update(booking, expected).await?;

        info!(
            %booking_id,
            intent_id = %intent.id,
            order_id = %intent.gateway_order_id,
            ?superseded,
            "Payment intent created"
        );
        Ok(intent)
    }

    /// Apply a gateway payment report. The only path from `pending` to
    /// `confirmed` for gateway payments.
    ///
    /// Idempotent by gateway payment id. A verified payment that arrives
    /// after the hold expired, or against a superseded intent, is recorded
    /// and refunded; the caller gets `StaleOrUnknownPayment`.
    pub async fn apply_payment_result(
        &self,
        booking_id: Uuid,
        intent_id: Uuid,
        gateway_payment_id: &str,
        verified: bool,
    ) -> DomainResult<PaymentOutcome> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;
        let mut intent = self
            .repos
            .payment_intents()
            .find_by_id(intent_id)
            .await?
            .filter(|i| i.booking_id == booking_id)
            .ok_or_else(|| {
                DomainError::stale(format!("intent {} does not belong to booking {}", intent_id, booking_id))
            })?;

        // An unverified report never reuses the outcome of a verified one.
        if !verified {
            if intent.status == IntentStatus::Failed {
                return Err(DomainError::stale(format!(
                    "intent {} already failed",
                    intent.id
                )));
            }
            if intent.status.is_open() {
                intent.mark(IntentStatus::VerificationFailed, now);
                self.repos.payment_intents().save(intent).await?;
            }
            warn!(%booking_id, payment_id = gateway_payment_id, "Payment signature did not verify");
            return Ok(PaymentOutcome::VerificationFailed(booking));
        }

        if booking.payment_reference.as_deref() == Some(gateway_payment_id) {
            debug!(%booking_id, payment_id = gateway_payment_id, "Duplicate payment report");
            return Ok(PaymentOutcome::AlreadyApplied(booking));
        }
        if intent.status == IntentStatus::Captured {
            if intent.gateway_payment_id.as_deref() == Some(gateway_payment_id) {
                return Err(DomainError::stale(format!(
                    "payment {} was already recorded as late",
                    gateway_payment_id
                )));
            }
            error!(
                %booking_id,
                order_id = %intent.gateway_order_id,
                payment_id = gateway_payment_id,
                "Second payment against a captured order, needs manual review"
            );
            return Err(DomainError::stale(format!(
                "order {} is already captured",
                intent.gateway_order_id
            )));
        }

        let is_active = booking.active_intent_id == Some(intent.id);
        if booking.is_pending() && is_active && !booking.is_hold_expired(now) {
            let reference = gateway_payment_id.to_string();
            match self.confirm_locked(&mut booking, reference, now).await {
                Ok(()) => {}
                Err(DomainError::HoldNotFound(_)) => {
                    return self
                        .absorb_late_payment(booking, intent, gateway_payment_id, true, now)
                        .await;
                }
                Err(e) => return Err(e),
            }
            intent.gateway_payment_id = Some(gateway_payment_id.to_string());
            intent.mark(IntentStatus::Captured, now);
            self.repos.payment_intents().save(intent).await?;
            return Ok(PaymentOutcome::Confirmed(booking));
        }

        self.absorb_late_payment(booking, intent, gateway_payment_id, false, now)
            .await
    }

    /// Gateway authorized (but has not yet captured) a payment.
    pub async fn record_authorization(&self, intent_id: Uuid) -> DomainResult<bool> {
        let booking_id = match self.repos.payment_intents().find_by_id(intent_id).await? {
            Some(intent) => intent.booking_id,
            None => return Err(DomainError::stale(format!("unknown intent {}", intent_id))),
        };
        let _guard = self.lock(booking_id).await;
        let Some(mut intent) = self.repos.payment_intents().find_by_id(intent_id).await? else {
            return Ok(false);
        };
        if !matches!(intent.status, IntentStatus::Created | IntentStatus::VerificationFailed) {
            return Ok(false);
        }
        intent.mark(IntentStatus::Authorized, self.clock.now());
        self.repos.payment_intents().save(intent).await?;
        debug!(%booking_id, %intent_id, "Payment authorized");
        Ok(true)
    }

    /// Mark an intent failed after the gateway reported a failed payment.
    /// Returns false if nothing changed.
    pub async fn record_payment_failure(
        &self,
        intent_id: Uuid,
        reason: Option<String>,
    ) -> DomainResult<bool> {
        let booking_id = match self.repos.payment_intents().find_by_id(intent_id).await? {
            Some(intent) => intent.booking_id,
            None => return Err(DomainError::stale(format!("unknown intent {}", intent_id))),
        };
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let Some(mut intent) = self.repos.payment_intents().find_by_id(intent_id).await? else {
            return Ok(false);
        };
        if matches!(intent.status, IntentStatus::Captured | IntentStatus::Failed) {
            return Ok(false);
        }

        intent.mark(IntentStatus::Failed, now);
        let order_id = intent.gateway_order_id.clone();
        self.repos.payment_intents().save(intent).await?;
        info!(%booking_id, %order_id, ?reason, "Payment failed");
        self.events.publish(Event::PaymentFailed(PaymentFailedEvent {
            booking_id,
            gateway_order_id: order_id,
            reason,
        }));
        Ok(true)
    }

    /// `pending → cancelled (expired)`. No-op if the booking is no longer
    /// pending.
    pub async fn expire(&self, booking_id: Uuid) -> DomainResult<bool> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;
        if !booking.is_pending() {
            return Ok(false);
        }
        self.expire_locked(&mut booking, now).await?;
        Ok(true)
    }

    /// Cancel from `pending` or `confirmed`. Always frees the slot; a paid
    /// booking moves to `refund_pending` and a refund is queued.
    pub async fn cancel(&self, booking_id: Uuid, reason: CancelReason) -> DomainResult<Booking> {
        if reason == CancelReason::Expired {
            return Err(DomainError::invalid_state(
                "expiry is not a cancellation reason callers may choose",
            ));
        }
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;

        let expected = booking.version;
        booking.apply(BookingEvent::Cancel(reason), now)?;
        self.repos.bookings().update(booking.clone(), expected).await?;

        if let Err(e) = self.availability.release(booking_id).await {
            warn!(%booking_id, error = %e, "Slot release after cancellation failed");
        }

        let refund_pending = booking.payment_status == PaymentStatus::RefundPending;
        if refund_pending {
            match self.refund_request_for(&booking).await? {
                Some(request) => self.refunds.enqueue(request),
                None => error!(%booking_id, "Paid booking has no payment to refund"),
            }
        }

        metrics::counter!("bookings_cancelled_total", "reason" => reason.as_str()).increment(1);
        info!(%booking_id, reason = reason.as_str(), refund_pending, "Booking cancelled");
        self.events.publish(Event::BookingCancelled(BookingCancelledEvent {
            booking_id,
            customer_email: booking.customer.email.clone(),
            reason: reason.as_str().to_string(),
            refund_pending,
        }));
        Ok(booking)
    }

    /// `confirmed → completed`, only once the event window has ended.
    pub async fn mark_completed(&self, booking_id: Uuid) -> DomainResult<Booking> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;

        if booking.status == BookingStatus::Confirmed && !booking.event_has_passed(now, self.settings.utc_offset) {
            return Err(DomainError::invalid_state(format!(
                "booking {} has not taken place yet",
                booking_id
            )));
        }
        let expected = booking.version;
        booking.apply(BookingEvent::Complete, now)?;
        self.repos.bookings().update(booking.clone(), expected).await?;

        info!(%booking_id, "Booking completed");
        self.events
            .publish(Event::BookingCompleted(BookingCompletedEvent { booking_id }));
        Ok(booking)
    }

    /// Record an offline (cash, bank transfer) payment. Uses the same
    /// `pending → confirmed` edge as a gateway payment.
    pub async fn confirm_manual_payment(&self, booking_id: Uuid, by: &str) -> DomainResult<Booking> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;
        self.ensure_payable(&mut booking, now).await?;

        let reference = format!("{}{}", MANUAL_PAYMENT_PREFIX, by);
        match self.confirm_locked(&mut booking, reference, now).await {
            Ok(()) => Ok(booking),
            Err(DomainError::HoldNotFound(_)) => {
                self.expire_locked(&mut booking, now).await?;
                Err(DomainError::invalid_state(format!(
                    "hold for booking {} has expired",
                    booking_id
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Administrator status override, mapped onto the legal operation for
    /// the requested status.
    pub async fn override_status(
        &self,
        booking_id: Uuid,
        target: BookingStatus,
        by: &str,
    ) -> DomainResult<Booking> {
        info!(%booking_id, target = target.as_str(), by, "Status override requested");
        match target {
            BookingStatus::Confirmed => self.confirm_manual_payment(booking_id, by).await,
            BookingStatus::Cancelled => self.cancel(booking_id, CancelReason::Admin).await,
            BookingStatus::Completed => self.mark_completed(booking_id).await,
            BookingStatus::Pending => Err(DomainError::invalid_state(
                "bookings cannot be moved back to pending",
            )),
        }
    }

    /// Replace the administrator notes on a booking.
    pub async fn annotate(&self, booking_id: Uuid, notes: Option<String>) -> DomainResult<Booking> {
        let _guard = self.lock(booking_id).await;
        let mut booking = self.get(booking_id).await?;
        let expected = booking.version;
        booking.notes = notes.filter(|n| !n.trim().is_empty());
        booking.touch(self.clock.now());
        self.repos.bookings().update(booking.clone(), expected).await?;
        Ok(booking)
    }

    /// Gateway confirmed a refund of `gateway_payment_id`. Moves the
    /// booking `refund_pending → refunded` when that payment is the one it
    /// is waiting on. Returns false for a repeated confirmation.
    pub async fn confirm_refund(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        refund_id: &str,
    ) -> DomainResult<bool> {
        let _guard = self.lock(booking_id).await;
        let now = self.clock.now();
        let mut booking = self.get(booking_id).await?;

        let intent = self
            .repos
            .payment_intents()
            .find_by_payment_id(gateway_payment_id)
            .await?
            .filter(|i| i.booking_id == booking_id);

        let mut changed = false;
        if let Some(mut intent) = intent.clone() {
            if intent.refund_id.is_none() {
                intent.refund_id = Some(refund_id.to_string());
                intent.updated_at = now;
                self.repos.payment_intents().save(intent).await?;
                changed = true;
            }
        }

        let awaited = match booking.payment_reference.as_deref() {
            Some(reference) => reference == gateway_payment_id,
            None => intent.is_some(),
        };
        if booking.payment_status == PaymentStatus::RefundPending && awaited {
            let expected = booking.version;
            booking.apply(BookingEvent::RefundConfirmed, now)?;
            self.repos.bookings().update(booking.clone(), expected).await?;
            changed = true;

            metrics::counter!("refunds_total", "outcome" => "completed").increment(1);
            info!(%booking_id, refund_id, "Refund completed");
            self.events.publish(Event::RefundCompleted(RefundCompletedEvent {
                booking_id,
                refund_id: refund_id.to_string(),
                amount: booking.total_amount,
            }));
        } else if changed {
            info!(%booking_id, refund_id, payment_id = gateway_payment_id, "Stray payment refunded");
        }
        Ok(changed)
    }

    // ── Sweeps ─────────────────────────────────────────────────

    /// Expire every pending booking whose hold deadline has passed.
    pub async fn expire_overdue(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let pending = self
            .list(&BookingFilter {
                status: Some(BookingStatus::Pending),
                ..Default::default()
            })
            .await?;

        let mut expired = 0;
        for booking in pending.iter().filter(|b| b.is_hold_expired(now)) {
            match self.expire(booking.id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!(booking_id = %booking.id, error = %e, "Failed to expire booking"),
            }
        }
        Ok(expired)
    }

    /// Complete every confirmed booking whose event window has ended.
    pub async fn complete_past(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let confirmed = self
            .list(&BookingFilter {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            })
            .await?;

        let mut completed = 0;
        for booking in confirmed.iter().filter(|b| b.event_has_passed(now, self.settings.utc_offset)) {
            match self.mark_completed(booking.id).await {
                Ok(_) => completed += 1,
                Err(e) => warn!(booking_id = %booking.id, error = %e, "Failed to complete booking"),
            }
        }
        Ok(completed)
    }

    /// Refunds owed for bookings left in `refund_pending`, e.g. after a
    /// restart with a non-empty queue.
    pub async fn pending_refunds(&self) -> DomainResult<Vec<RefundRequest>> {
        let waiting = self
            .list(&BookingFilter {
                payment_status: Some(PaymentStatus::RefundPending),
                ..Default::default()
            })
            .await?;
        let mut requests = Vec::with_capacity(waiting.len());
        for booking in &waiting {
            if let Some(request) = self.refund_request_for(booking).await? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Drop per-booking locks nobody is holding or waiting on.
    pub fn prune_locks(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    // ── Internals ──────────────────────────────────────────────

    async fn lock(&self, booking_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(booking_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Pending with an unexpired hold. An expired hold is expired on the
    /// spot and reported as `InvalidState`.
    async fn ensure_payable(&self, booking: &mut Booking, now: DateTime<Utc>) -> DomainResult<()> {
        if !booking.is_pending() {
            return Err(DomainError::invalid_state(format!(
                "booking {} is {}, not pending",
                booking.id, booking.status
            )));
        }
        if booking.is_hold_expired(now) {
            self.expire_locked(booking, now).await?;
            return Err(DomainError::invalid_state(format!(
                "hold for booking {} has expired",
                booking.id
            )));
        }
        Ok(())
    }

    async fn open_intent(&self, booking: &Booking) -> DomainResult<Option<PaymentIntent>> {
        let Some(intent_id) = booking.active_intent_id else {
            return Ok(None);
        };
        let intent = self.repos.payment_intents().find_by_id(intent_id).await?;
        Ok(intent.filter(|i| i.status.is_open()))
    }

    /// Commit the reservation, then move the booking to `confirmed`. If
    /// the booking write fails the reservation goes back to being a hold,
    /// so the booking keeps its slot and a redelivered payment can commit.
    async fn confirm_locked(
        &self,
        booking: &mut Booking,
        reference: String,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let booking_id = booking.id;
        self.availability.commit(booking_id).await?;

        let expected = booking.version;
        let mut confirmed = booking.clone();
        confirmed.apply(BookingEvent::PaymentConfirmed, now)?;
        confirmed.payment_reference = Some(reference);
        if let Err(e) = self.repos.bookings().update(confirmed.clone(), expected).await {
            error!(%booking_id, error = %e, "Failed to confirm booking, reverting reservation to hold");
            if let Err(revert_err) = self
                .availability
                .revert_commit(booking_id, booking.hold_expires_at)
                .await
            {
                error!(%booking_id, error = %revert_err, "Reverting the reservation also failed");
            }
            return Err(e);
        }
        *booking = confirmed;

        metrics::counter!("bookings_confirmed_total").increment(1);
        info!(
            %booking_id,
            reference = booking.payment_reference.as_deref().unwrap_or_default(),
            "Booking confirmed"
        );
        self.events.publish(Event::BookingConfirmed(BookingConfirmedEvent {
            booking_id,
            customer_email: booking.customer.email.clone(),
            payment_reference: booking.payment_reference.clone().unwrap_or_default(),
            amount: booking.total_amount,
            currency: booking.currency.clone(),
        }));
        Ok(())
    }

    async fn expire_locked(&self, booking: &mut Booking, now: DateTime<Utc>) -> DomainResult<()> {
        let booking_id = booking.id;
        let expected = booking.version;
        let mut expired = booking.clone();
        expired.apply(BookingEvent::Expire, now)?;
        self.repos.bookings().update(expired.clone(), expected).await?;
        *booking = expired;

        if let Err(e) = self.availability.release(booking_id).await {
            warn!(%booking_id, error = %e, "Slot release after expiry failed");
        }

        metrics::counter!("holds_expired_total").increment(1);
        metrics::counter!("bookings_cancelled_total", "reason" => "expired").increment(1);
        info!(%booking_id, "Booking expired");
        self.events.publish(Event::BookingExpired(BookingExpiredEvent {
            booking_id,
            customer_email: booking.customer.email.clone(),
        }));
        Ok(())
    }

    /// Expiry wins over a late payment: the money is recorded against the
    /// intent and queued for refund, the booking stays cancelled.
    /// `hold_lost` expires a pending booking whose calendar hold is gone
    /// even if its own deadline has not passed.
    async fn absorb_late_payment(
        &self,
        mut booking: Booking,
        mut intent: PaymentIntent,
        gateway_payment_id: &str,
        hold_lost: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<PaymentOutcome> {
        let booking_id = booking.id;
        intent.gateway_payment_id = Some(gateway_payment_id.to_string());
        intent.mark(IntentStatus::Captured, now);
        self.repos.payment_intents().save(intent.clone()).await?;

        if booking.is_pending() && (hold_lost || booking.is_hold_expired(now)) {
            self.expire_locked(&mut booking, now).await?;
        }

        if booking.state().apply(BookingEvent::LatePaymentCaptured).is_ok() {
            let expected = booking.version;
            booking.apply(BookingEvent::LatePaymentCaptured, now)?;
            self.repos.bookings().update(booking.clone(), expected).await?;
        }

        self.refunds.enqueue(RefundRequest {
            booking_id,
            gateway_payment_id: gateway_payment_id.to_string(),
            amount: intent.amount,
        });

        warn!(
            %booking_id,
            payment_id = gateway_payment_id,
            status = booking.status.as_str(),
            "Late payment captured, refund queued"
        );
        Err(DomainError::stale(format!(
            "payment {} arrived after booking {} stopped accepting payment",
            gateway_payment_id, booking_id
        )))
    }

    /// The payment a refund for this booking should reverse.
    async fn refund_request_for(&self, booking: &Booking) -> DomainResult<Option<RefundRequest>> {
        if let Some(reference) = &booking.payment_reference {
            return Ok(Some(RefundRequest {
                booking_id: booking.id,
                gateway_payment_id: reference.clone(),
                amount: booking.total_amount,
            }));
        }
        let intents = self.repos.payment_intents().find_by_booking(booking.id).await?;
        Ok(intents
            .into_iter()
            .rev()
            .find(|i| i.status == IntentStatus::Captured && i.refund_id.is_none())
            .and_then(|i| {
                i.gateway_payment_id.map(|payment_id| RefundRequest {
                    booking_id: booking.id,
                    gateway_payment_id: payment_id,
                    amount: i.amount,
                })
            }))
    }
}

/// `latest` is the last event date the booking horizon allows.
fn validate_new_booking(request: &NewBooking, latest: Option<NaiveDate>) -> DomainResult<()> {
    let c = &request.customer;
    if c.name.trim().is_empty() {
        return Err(DomainError::Validation("customer name is required".into()));
    }
    if !c.email.contains('@') {
        return Err(DomainError::Validation(format!("invalid email: {}", c.email)));
    }
    if c.phone.trim().is_empty() {
        return Err(DomainError::Validation("phone number is required".into()));
    }
    if request.event.location.trim().is_empty() {
        return Err(DomainError::Validation("event location is required".into()));
    }
    if let Some(latest) = latest {
        if request.event.date > latest {
            return Err(DomainError::Validation(format!(
                "event date {} is beyond the booking horizon ({})",
                request.event.date, latest
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::{create_event_bus, EventSubscriber};
    use crate::domain::reservation::ReservationState;
    use crate::domain::service::{NewServiceOffering, ServiceCategory};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::shared::{Clock, ManualClock};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use crate::domain::booking::BookingRepository;
    use crate::domain::payment::PaymentIntentRepository;
    use crate::domain::reservation::ReservationRepository;
    use crate::domain::service::ServiceRepository;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        ledger: BookingLedger,
        repos: Arc<InMemoryRepositoryProvider>,
        clock: ManualClock,
        refunds: UnboundedReceiver<RefundRequest>,
        events: EventSubscriber,
        service_id: i32,
    }

    async fn fixture() -> Fixture {
        fixture_with(|repos| -> Arc<dyn RepositoryProvider> { repos }, LedgerSettings::default()).await
    }

    /// Fixture whose services see storage through `wrap`.
    async fn fixture_with<F>(wrap: F, settings: LedgerSettings) -> Fixture
    where
        F: FnOnce(Arc<InMemoryRepositoryProvider>) -> Arc<dyn RepositoryProvider>,
    {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        let shared: SharedClock = Arc::new(clock.clone());
        let repos = Arc::new(InMemoryRepositoryProvider::new(shared.clone()));
        let provider = wrap(repos.clone());
        let catalog = Arc::new(ServiceCatalog::new(provider.clone(), shared.clone()));
        let availability = Arc::new(
            AvailabilityIndex::new(provider.clone(), shared.clone())
                .with_utc_offset(settings.utc_offset),
        );
        let bus = create_event_bus();
        let events = bus.subscribe();
        let (queue, refunds) = RefundQueue::new();

        let service = catalog
            .create(NewServiceOffering {
                name: "Portrait Photography".into(),
                description: "Studio portraits".into(),
                category: ServiceCategory::Photography,
                price: 800_000,
                duration_minutes: 120,
                features: vec![],
                is_popular: false,
            })
            .await
            .unwrap();

        let ledger = BookingLedger::new(
            provider,
            catalog,
            availability,
            bus,
            queue,
            shared,
            settings,
        );
        Fixture {
            ledger,
            repos,
            clock,
            refunds,
            events,
            service_id: service.id,
        }
    }

    fn request(service_id: i32, hour: u32) -> NewBooking {
        NewBooking {
            service_offering_id: service_id,
            customer: CustomerInfo {
                name: "Asha Rao".into(),
                email: "asha@example.com".into(),
                phone: "+919800000000".into(),
            },
            event: EventDetails {
                date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                location: "Pune".into(),
                event_type: None,
                guest_count: None,
                special_requests: None,
            },
        }
    }

    /// Create a booking and attach a gateway order to it.
    async fn booking_with_intent(f: &Fixture, hour: u32, order: &str) -> (Booking, PaymentIntent) {
        let booking = f.ledger.create(request(f.service_id, hour)).await.unwrap();
        let intent = f
            .ledger
            .attach_intent(
                booking.id,
                GatewayOrder {
                    order_id: order.into(),
                    amount: booking.total_amount,
                    currency: booking.currency.clone(),
                },
            )
            .await
            .unwrap();
        (booking, intent)
    }

    async fn pay(f: &Fixture, booking: &Booking, intent: &PaymentIntent, payment_id: &str) -> DomainResult<PaymentOutcome> {
        f.ledger
            .apply_payment_result(booking.id, intent.id, payment_id, true)
            .await
    }

    #[tokio::test]
    async fn create_snapshots_price_and_holds_slot() {
        let mut f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
        assert_eq!(booking.total_amount, 800_000);
        assert_eq!(booking.hold_expires_at, f.clock.now() + Duration::minutes(15));
        let held = f.ledger.availability().find(booking.id).await.unwrap();
        assert!(matches!(held.state, ReservationState::Held { .. }));

        let message = f.events.try_recv().unwrap();
        assert_eq!(message.event.event_type(), "booking_created");
    }

    #[tokio::test]
    async fn overlapping_create_is_rejected_without_writing() {
        let f = fixture().await;
        f.ledger.create(request(f.service_id, 10)).await.unwrap();

        let err = f.ledger.create(request(f.service_id, 11)).await.unwrap_err();
        assert!(matches!(err, DomainError::SlotConflict { .. }));
        assert_eq!(f.ledger.list(&BookingFilter::default()).await.unwrap().len(), 1);

        assert!(f.ledger.create(request(f.service_id, 12)).await.is_ok());
    }

    #[tokio::test]
    async fn create_validates_customer_and_date() {
        let f = fixture().await;

        let mut bad_email = request(f.service_id, 10);
        bad_email.customer.email = "not-an-email".into();
        assert!(matches!(
            f.ledger.create(bad_email).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut past = request(f.service_id, 10);
        past.event.date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert!(matches!(
            f.ledger.create(past).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        assert!(matches!(
            f.ledger.create(request(99, 10)).await.unwrap_err(),
            DomainError::ServiceNotFound(99)
        ));
    }

    #[tokio::test]
    async fn verified_payment_confirms_and_commits() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;

        let outcome = pay(&f, &booking, &intent, "pay_1").await.unwrap();
        let confirmed = match outcome {
            PaymentOutcome::Confirmed(b) => b,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert_eq!(confirmed.payment_reference.as_deref(), Some("pay_1"));

        let reservation = f.ledger.availability().find(booking.id).await.unwrap();
        assert_eq!(reservation.state, ReservationState::Committed);
        let intents = f.ledger.intents(booking.id).await.unwrap();
        assert_eq!(intents[0].status, IntentStatus::Captured);
    }

    #[tokio::test]
    async fn duplicate_payment_report_changes_nothing() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &booking, &intent, "pay_1").await.unwrap();
        let before = f.ledger.get(booking.id).await.unwrap();

        let again = pay(&f, &booking, &intent, "pay_1").await.unwrap();
        assert!(matches!(again, PaymentOutcome::AlreadyApplied(_)));
        assert_eq!(f.ledger.get(booking.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn unverified_payment_leaves_booking_pending_and_intent_reusable() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;

        let outcome = f
            .ledger
            .apply_payment_result(booking.id, intent.id, "pay_forged", false)
            .await
            .unwrap();
        assert!(matches!(outcome, PaymentOutcome::VerificationFailed(_)));
        assert!(f.ledger.get(booking.id).await.unwrap().is_pending());

        match f.ledger.request_payment(booking.id).await.unwrap() {
            PaymentPreparation::Existing(open) => {
                assert_eq!(open.id, intent.id);
                assert_eq!(open.status, IntentStatus::VerificationFailed);
            }
            other => panic!("expected the open intent, got {:?}", other),
        }

        assert!(matches!(
            pay(&f, &booking, &intent, "pay_real").await.unwrap(),
            PaymentOutcome::Confirmed(_)
        ));
    }

    #[tokio::test]
    async fn payment_after_expiry_is_refunded_and_booking_stays_cancelled() {
        let mut f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        f.clock.advance(Duration::minutes(16));

        let err = pay(&f, &booking, &intent, "pay_late").await.unwrap_err();
        assert!(matches!(err, DomainError::StaleOrUnknownPayment(_)));

        let stored = f.ledger.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.payment_status, PaymentStatus::RefundPending);
        assert_eq!(stored.cancel_reason, Some(CancelReason::Expired));
        assert!(stored.payment_reference.is_none());
        assert!(f.ledger.availability().find(booking.id).await.is_none());

        let refund = f.refunds.try_recv().unwrap();
        assert_eq!(refund.gateway_payment_id, "pay_late");
        assert_eq!(refund.amount, booking.total_amount);

        assert!(f
            .ledger
            .confirm_refund(booking.id, "pay_late", "rfnd_1")
            .await
            .unwrap());
        let refunded = f.ledger.get(booking.id).await.unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn expired_booking_cannot_request_payment() {
        let f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();
        f.clock.advance(Duration::minutes(15));

        let err = f.ledger.request_payment(booking.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        let stored = f.ledger.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert!(f.ledger.create(request(f.service_id, 10)).await.is_ok());
    }

    #[tokio::test]
    async fn failed_intent_is_superseded_by_a_new_order() {
        let f = fixture().await;
        let (booking, first) = booking_with_intent(&f, 10, "order_1").await;
        assert!(f
            .ledger
            .record_payment_failure(first.id, Some("card declined".into()))
            .await
            .unwrap());

        assert!(matches!(
            f.ledger.request_payment(booking.id).await.unwrap(),
            PaymentPreparation::NeedsOrder(_)
        ));
        let second = f
            .ledger
            .attach_intent(
                booking.id,
                GatewayOrder {
                    order_id: "order_2".into(),
                    amount: booking.total_amount,
                    currency: "INR".into(),
                },
            )
            .await
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(
            f.ledger.get(booking.id).await.unwrap().active_intent_id,
            Some(second.id)
        );
    }

    #[tokio::test]
    async fn payment_on_superseded_intent_is_refunded() {
        let mut f = fixture().await;
        let (booking, first) = booking_with_intent(&f, 10, "order_1").await;
        f.ledger.record_payment_failure(first.id, None).await.unwrap();
        let second = f
            .ledger
            .attach_intent(
                booking.id,
                GatewayOrder {
                    order_id: "order_2".into(),
                    amount: booking.total_amount,
                    currency: "INR".into(),
                },
            )
            .await
            .unwrap();

        pay(&f, &booking, &second, "pay_2").await.unwrap();
        let err = pay(&f, &booking, &first, "pay_1").await.unwrap_err();
        assert!(matches!(err, DomainError::StaleOrUnknownPayment(_)));

        let stored = f.ledger.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_reference.as_deref(), Some("pay_2"));
        assert_eq!(f.refunds.try_recv().unwrap().gateway_payment_id, "pay_1");
    }

    #[tokio::test]
    async fn attach_intent_rejects_amount_mismatch() {
        let f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();
        let err = f
            .ledger
            .attach_intent(
                booking.id,
                GatewayOrder {
                    order_id: "order_1".into(),
                    amount: 1,
                    currency: "INR".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::GatewayError(_)));
    }

    #[tokio::test]
    async fn cancelling_confirmed_booking_frees_slot_and_queues_refund() {
        let mut f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &booking, &intent, "pay_1").await.unwrap();

        let cancelled = f.ledger.cancel(booking.id, CancelReason::Customer).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::RefundPending);
        assert!(f.ledger.availability().find(booking.id).await.is_none());

        let refund = f.refunds.try_recv().unwrap();
        assert_eq!(refund.gateway_payment_id, "pay_1");
        assert_eq!(f.ledger.pending_refunds().await.unwrap(), vec![refund]);

        assert!(f.ledger.confirm_refund(booking.id, "pay_1", "rfnd_1").await.unwrap());
        assert!(!f.ledger.confirm_refund(booking.id, "pay_1", "rfnd_1").await.unwrap());
        assert!(f.ledger.pending_refunds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelling_pending_booking_needs_no_refund() {
        let mut f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();

        let cancelled = f.ledger.cancel(booking.id, CancelReason::Admin).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Unpaid);
        assert_eq!(cancelled.cancel_reason, Some(CancelReason::Admin));
        assert!(f.refunds.try_recv().is_err());

        let again = f.ledger.cancel(booking.id, CancelReason::Admin).await.unwrap_err();
        assert!(matches!(again, DomainError::InvalidState(_)));
        let expired = f.ledger.cancel(booking.id, CancelReason::Expired).await.unwrap_err();
        assert!(matches!(expired, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn completion_waits_for_the_event_to_end() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &booking, &intent, "pay_1").await.unwrap();

        assert!(matches!(
            f.ledger.mark_completed(booking.id).await.unwrap_err(),
            DomainError::InvalidState(_)
        ));

        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap());
        let done = f.ledger.mark_completed(booking.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert_eq!(done.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn admin_override_maps_to_legal_operations() {
        let f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();

        assert!(matches!(
            f.ledger
                .override_status(booking.id, BookingStatus::Pending, "admin")
                .await
                .unwrap_err(),
            DomainError::InvalidState(_)
        ));

        let confirmed = f
            .ledger
            .override_status(booking.id, BookingStatus::Confirmed, "admin")
            .await
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_reference.as_deref(), Some("manual:admin"));

        let cancelled = f
            .ledger
            .override_status(booking.id, BookingStatus::Cancelled, "admin")
            .await
            .unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::RefundPending);
    }

    #[tokio::test]
    async fn sweep_helpers_expire_and_complete() {
        let f = fixture().await;
        let stale = f.ledger.create(request(f.service_id, 10)).await.unwrap();
        let (paid, intent) = booking_with_intent(&f, 13, "order_2").await;
        pay(&f, &paid, &intent, "pay_2").await.unwrap();

        f.clock.advance(Duration::minutes(20));
        assert_eq!(f.ledger.expire_overdue().await.unwrap(), 1);
        assert_eq!(f.ledger.get(stale.id).await.unwrap().status, BookingStatus::Cancelled);
        assert_eq!(f.ledger.expire_overdue().await.unwrap(), 0);

        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 11, 0, 0, 0).unwrap());
        assert_eq!(f.ledger.complete_past().await.unwrap(), 1);
        assert_eq!(f.ledger.get(paid.id).await.unwrap().status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn storage_outage_during_confirmation_leaves_booking_pending() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;

        f.repos.set_unavailable(true);
        let err = pay(&f, &booking, &intent, "pay_1").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        f.repos.set_unavailable(false);

        let stored = f.ledger.get(booking.id).await.unwrap();
        assert!(stored.is_pending());
        let reservation = f.ledger.availability().find(booking.id).await.unwrap();
        assert!(!reservation.is_committed());

        assert!(matches!(
            pay(&f, &booking, &intent, "pay_1").await.unwrap(),
            PaymentOutcome::Confirmed(_)
        ));
    }

    #[tokio::test]
    async fn notes_can_be_set_in_any_state() {
        let f = fixture().await;
        let booking = f.ledger.create(request(f.service_id, 10)).await.unwrap();
        f.ledger.cancel(booking.id, CancelReason::Customer).await.unwrap();

        let noted = f
            .ledger
            .annotate(booking.id, Some("called to reschedule".into()))
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("called to reschedule"));
        let cleared = f.ledger.annotate(booking.id, Some("  ".into())).await.unwrap();
        assert!(cleared.notes.is_none());
    }

    #[tokio::test]
    async fn stats_count_statuses_and_revenue() {
        let f = fixture().await;
        let (paid, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &paid, &intent, "pay_1").await.unwrap();
        f.ledger.create(request(f.service_id, 13)).await.unwrap();

        let stats = f.ledger.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.paid_revenue, 800_000);
    }

    /// Booking storage that fails the next `update` once armed.
    struct FlakyBookings {
        inner: Arc<InMemoryRepositoryProvider>,
        fail_next_update: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl BookingRepository for FlakyBookings {
        async fn insert(&self, booking: Booking) -> DomainResult<()> {
            self.inner.bookings().insert(booking).await
        }

        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
            self.inner.bookings().find_by_id(id).await
        }

        async fn update(&self, booking: Booking, expected_version: i64) -> DomainResult<()> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(DomainError::Storage("write timed out".into()));
            }
            self.inner.bookings().update(booking, expected_version).await
        }

        async fn find_all(&self, filter: &BookingFilter) -> DomainResult<Vec<Booking>> {
            self.inner.bookings().find_all(filter).await
        }
    }

    struct FlakyRepos {
        inner: Arc<InMemoryRepositoryProvider>,
        bookings: FlakyBookings,
    }

    impl RepositoryProvider for FlakyRepos {
        fn services(&self) -> &dyn ServiceRepository {
            self.inner.services()
        }

        fn bookings(&self) -> &dyn BookingRepository {
            &self.bookings
        }

        fn reservations(&self) -> &dyn ReservationRepository {
            self.inner.reservations()
        }

        fn payment_intents(&self) -> &dyn PaymentIntentRepository {
            self.inner.payment_intents()
        }
    }

    #[tokio::test]
    async fn failed_booking_write_keeps_the_hold_for_redelivery() {
        let fail_update = Arc::new(AtomicBool::new(false));
        let armed = fail_update.clone();
        let mut f = fixture_with(
            move |repos| -> Arc<dyn RepositoryProvider> {
                Arc::new(FlakyRepos {
                    bookings: FlakyBookings {
                        inner: repos.clone(),
                        fail_next_update: armed,
                    },
                    inner: repos,
                })
            },
            LedgerSettings::default(),
        )
        .await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;

        fail_update.store(true, Ordering::SeqCst);
        let err = pay(&f, &booking, &intent, "pay_1").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        let stored = f.ledger.get(booking.id).await.unwrap();
        assert!(stored.is_pending());
        let hold = f.ledger.availability().find(booking.id).await.unwrap();
        assert_eq!(
            hold.state,
            ReservationState::Held {
                expires_at: booking.hold_expires_at
            }
        );
        assert!(matches!(
            f.ledger.create(request(f.service_id, 10)).await,
            Err(DomainError::SlotConflict { .. })
        ));

        let outcome = pay(&f, &booking, &intent, "pay_1").await.unwrap();
        let confirmed = outcome.booking();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert!(f.ledger.availability().find(booking.id).await.unwrap().is_committed());
        assert!(f.refunds.try_recv().is_err());
    }

    #[tokio::test]
    async fn unverified_report_reusing_a_confirmed_payment_id_fails_verification() {
        let f = fixture().await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &booking, &intent, "pay_1").await.unwrap();

        let outcome = f
            .ledger
            .apply_payment_result(booking.id, intent.id, "pay_1", false)
            .await
            .unwrap();
        assert!(matches!(outcome, PaymentOutcome::VerificationFailed(_)));

        let stored = f.ledger.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        let intents = f.ledger.intents(booking.id).await.unwrap();
        assert_eq!(intents[0].status, IntentStatus::Captured);

        assert!(matches!(
            pay(&f, &booking, &intent, "pay_1").await.unwrap(),
            PaymentOutcome::AlreadyApplied(_)
        ));
    }

    #[tokio::test]
    async fn event_dates_past_the_horizon_are_rejected() {
        let f = fixture().await;
        f.ledger.create(request(f.service_id, 10)).await.unwrap();

        let mut far = request(f.service_id, 10);
        far.event.date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(matches!(
            f.ledger.create(far).await,
            Err(DomainError::Validation(msg)) if msg.contains("horizon")
        ));

        let mut last = request(f.service_id, 10);
        last.event.date = NaiveDate::MAX;
        last.event.start_time = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert!(matches!(f.ledger.create(last).await, Err(DomainError::Validation(_))));
        assert_eq!(f.ledger.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn studio_offset_governs_start_and_completion() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let settings = LedgerSettings {
            utc_offset: ist,
            ..LedgerSettings::default()
        };
        let f = fixture_with(|repos| -> Arc<dyn RepositoryProvider> { repos }, settings).await;
        let (booking, intent) = booking_with_intent(&f, 10, "order_1").await;
        pay(&f, &booking, &intent, "pay_1").await.unwrap();

        // 10:00-12:00 IST is 04:30-06:30 UTC. 08:00 IST has already begun.
        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 10, 4, 45, 0).unwrap());
        assert!(matches!(
            f.ledger.create(request(f.service_id, 8)).await,
            Err(DomainError::Validation(_))
        ));

        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 10, 6, 29, 0).unwrap());
        assert!(matches!(
            f.ledger.mark_completed(booking.id).await,
            Err(DomainError::InvalidState(_))
        ));
        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 10, 6, 30, 0).unwrap());
        let done = f.ledger.mark_completed(booking.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
    }
}
