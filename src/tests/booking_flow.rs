use chrono::Duration;

use super::common::{self, payment_webhook, refund_webhook, sign_callback, sign_webhook, Harness, PRICE};
use crate::application::ports::RefundStatus;
use crate::application::{HoldSweeper, PaymentOutcome, WebhookOutcome};
use crate::domain::booking::{BookingStatus, CancelReason, PaymentStatus};
use crate::domain::{DomainError, IntentStatus};
use crate::infrastructure::MockPaymentGateway;

#[tokio::test]
async fn paid_booking_is_confirmed_and_slot_stays_taken() {
    let h = Harness::new().await;

    let booking = h.create(10).await;
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_amount, PRICE);

    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    assert_eq!(intent.amount, PRICE);
    assert_eq!(intent.status, IntentStatus::Created);

    let signature = sign_callback(&intent.gateway_order_id, "pay_A1");
    let outcome = h
        .reconciler
        .handle_callback(&intent.gateway_order_id, "pay_A1", &signature)
        .await
        .unwrap();
    let confirmed = match outcome {
        PaymentOutcome::Confirmed(b) => b,
        other => panic!("expected confirmation, got {:?}", other),
    };
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
    assert_eq!(confirmed.payment_reference.as_deref(), Some("pay_A1"));

    assert!(!h.availability.check_available(&booking.slot).await);
    let clash = h.ledger.create(common::request(h.service_id, 10)).await;
    assert!(matches!(clash, Err(DomainError::SlotConflict { .. })));

    // A committed slot outlives the hold TTL.
    h.clock.advance(Duration::hours(2));
    assert!(!h.availability.check_available(&booking.slot).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_for_one_slot_admit_exactly_one() {
    let h = Harness::new().await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ledger = h.ledger.clone();
        let service_id = h.service_id;
        tasks.push(tokio::spawn(async move {
            ledger.create(common::request(service_id, 10)).await
        }));
    }

    let mut created = Vec::new();
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(booking) => created.push(booking),
            Err(DomainError::SlotConflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(created.len(), 1);
    assert_eq!(conflicts, 7);
    assert_eq!(created[0].status, BookingStatus::Pending);
}

#[tokio::test]
async fn cancelled_paid_booking_is_refunded_and_slot_reopens() {
    let mut h = Harness::new().await;
    let booking = h.create(14).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    h.reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_C1",
            &sign_callback(&intent.gateway_order_id, "pay_C1"),
        )
        .await
        .unwrap();

    let cancelled = h.ledger.cancel(booking.id, CancelReason::Customer).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::RefundPending);
    assert!(h.availability.check_available(&booking.slot).await);

    assert_eq!(h.refund_worker.drain().await, 1);
    let refunded = h.ledger.get(booking.id).await.unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert_eq!(h.gateway.refunds().await, vec![("pay_C1".to_string(), PRICE)]);

    let rebooked = h.create(14).await;
    assert_eq!(rebooked.status, BookingStatus::Pending);
}

#[tokio::test]
async fn repeated_callback_is_a_no_op() {
    let h = Harness::new().await;
    let booking = h.create(11).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    let signature = sign_callback(&intent.gateway_order_id, "pay_D1");

    let first = h
        .reconciler
        .handle_callback(&intent.gateway_order_id, "pay_D1", &signature)
        .await
        .unwrap();
    let second = h
        .reconciler
        .handle_callback(&intent.gateway_order_id, "pay_D1", &signature)
        .await
        .unwrap();

    assert!(matches!(first, PaymentOutcome::Confirmed(_)));
    assert!(matches!(second, PaymentOutcome::AlreadyApplied(_)));
    assert_eq!(first.booking().version, second.booking().version);
    assert_eq!(second.booking().status, BookingStatus::Confirmed);

    let reservation = h.availability.find(booking.id).await.unwrap();
    assert!(reservation.is_committed());
    assert!(h.gateway.refunds().await.is_empty());
}

#[tokio::test]
async fn forged_callback_leaves_booking_pending() {
    let h = Harness::new().await;
    let booking = h.create(12).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();

    let outcome = h
        .reconciler
        .handle_callback(&intent.gateway_order_id, "pay_F1", "deadbeef")
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::VerificationFailed(_)));
    assert_eq!(h.ledger.get(booking.id).await.unwrap().status, BookingStatus::Pending);

    let unknown = h
        .reconciler
        .handle_callback("order_nope", "pay_F2", &sign_callback("order_nope", "pay_F2"))
        .await;
    assert!(matches!(unknown, Err(DomainError::StaleOrUnknownPayment(_))));
}

#[tokio::test]
async fn forged_callback_cannot_replay_a_confirmed_payment_id() {
    let h = Harness::new().await;
    let booking = h.create(13).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    let order = intent.gateway_order_id.clone();
    h.reconciler
        .handle_callback(&order, "pay_R1", &sign_callback(&order, "pay_R1"))
        .await
        .unwrap();

    let forged = h
        .reconciler
        .handle_callback(&order, "pay_R1", "deadbeef")
        .await
        .unwrap();
    assert!(matches!(forged, PaymentOutcome::VerificationFailed(_)));

    let stored = h.ledger.get(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert!(h.availability.find(booking.id).await.unwrap().is_committed());
}

#[tokio::test]
async fn payment_after_expiry_loses_and_is_refunded() {
    let mut h = Harness::new().await;
    let booking = h.create(15).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();

    h.clock.advance(Duration::minutes(16));
    let sweeper = HoldSweeper::new(h.ledger.clone());
    let report = sweeper.sweep().await.unwrap();
    assert_eq!(report.bookings_expired, 1);

    // Someone else takes the freed slot before the payment lands.
    let rival = h.create(15).await;

    let late = h
        .reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_L1",
            &sign_callback(&intent.gateway_order_id, "pay_L1"),
        )
        .await;
    assert!(matches!(late, Err(DomainError::StaleOrUnknownPayment(_))));

    let expired = h.ledger.get(booking.id).await.unwrap();
    assert_eq!(expired.status, BookingStatus::Cancelled);
    assert_eq!(expired.cancel_reason, Some(CancelReason::Expired));
    assert_eq!(expired.payment_status, PaymentStatus::RefundPending);
    assert_eq!(h.ledger.get(rival.id).await.unwrap().status, BookingStatus::Pending);

    assert_eq!(h.refund_worker.drain().await, 1);
    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().payment_status,
        PaymentStatus::Refunded
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_racing_a_late_callback_always_expires_the_booking() {
    for round in 0..10 {
        let h = Harness::new().await;
        let booking = h.create(9).await;
        let intent = h.reconciler.create_intent(booking.id).await.unwrap();
        h.clock.advance(Duration::minutes(15) + Duration::seconds(1));

        let payment_id = format!("pay_R{}", round);
        let signature = sign_callback(&intent.gateway_order_id, &payment_id);
        let sweeper = HoldSweeper::new(h.ledger.clone());
        let reconciler = h.reconciler.clone();
        let order_id = intent.gateway_order_id.clone();

        let sweep = tokio::spawn(async move { sweeper.sweep().await });
        let callback = tokio::spawn(async move {
            reconciler
                .handle_callback(&order_id, &payment_id, &signature)
                .await
        });

        sweep.await.unwrap().unwrap();
        let callback = callback.await.unwrap();
        assert!(
            matches!(callback, Err(DomainError::StaleOrUnknownPayment(_))),
            "round {}: {:?}",
            round,
            callback
        );

        let after = h.ledger.get(booking.id).await.unwrap();
        assert_eq!(after.status, BookingStatus::Cancelled);
        assert_eq!(after.payment_status, PaymentStatus::RefundPending);
        assert!(h.availability.find(booking.id).await.is_none());
    }
}

#[tokio::test]
async fn captured_webhook_confirms_once() {
    let h = Harness::new().await;
    let booking = h.create(16).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();

    let body = payment_webhook("payment.captured", &intent.gateway_order_id, "pay_W1");
    let signature = sign_webhook(&body);
    assert_eq!(
        h.reconciler.handle_webhook(&body, &signature).await.unwrap(),
        WebhookOutcome::Applied
    );
    assert_eq!(
        h.reconciler.handle_webhook(&body, &signature).await.unwrap(),
        WebhookOutcome::Duplicate
    );
    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().status,
        BookingStatus::Confirmed
    );

    // The browser callback for the same payment arrives afterwards.
    let callback = h
        .reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_W1",
            &sign_callback(&intent.gateway_order_id, "pay_W1"),
        )
        .await
        .unwrap();
    assert!(matches!(callback, PaymentOutcome::AlreadyApplied(_)));
}

#[tokio::test]
async fn webhook_signature_and_unknown_orders() {
    let h = Harness::new().await;
    let body = payment_webhook("payment.captured", "order_ghost", "pay_G1");

    let forged = h.reconciler.handle_webhook(&body, "00ff").await;
    assert!(matches!(forged, Err(DomainError::Unauthorized(_))));

    let unknown = h.reconciler.handle_webhook(&body, &sign_webhook(&body)).await;
    assert!(matches!(unknown, Err(DomainError::StaleOrUnknownPayment(_))));

    let other = br#"{"event":"dispute.created"}"#;
    assert!(matches!(
        h.reconciler.handle_webhook(other, &sign_webhook(other)).await.unwrap(),
        WebhookOutcome::Ignored(_)
    ));
}

#[tokio::test]
async fn failed_payment_lets_customer_retry_with_new_order() {
    let h = Harness::new().await;
    let booking = h.create(17).await;
    let first = h.reconciler.create_intent(booking.id).await.unwrap();

    // Asking again while the order is open returns the same intent.
    let again = h.reconciler.create_intent(booking.id).await.unwrap();
    assert_eq!(again.id, first.id);

    let body = payment_webhook("payment.failed", &first.gateway_order_id, "pay_X1");
    assert_eq!(
        h.reconciler.handle_webhook(&body, &sign_webhook(&body)).await.unwrap(),
        WebhookOutcome::Applied
    );

    let second = h.reconciler.create_intent(booking.id).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_ne!(second.gateway_order_id, first.gateway_order_id);

    let outcome = h
        .reconciler
        .handle_callback(
            &second.gateway_order_id,
            "pay_X2",
            &sign_callback(&second.gateway_order_id, "pay_X2"),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::Confirmed(_)));
}

#[tokio::test]
async fn gateway_timeout_on_order_leaves_nothing_behind() {
    let h = Harness::new().await;
    let booking = h.create(18).await;
    h.gateway.fail_next(DomainError::GatewayTimeout).await;

    let failed = h.reconciler.create_intent(booking.id).await;
    assert!(matches!(failed, Err(DomainError::GatewayTimeout)));
    assert!(h.ledger.intents(booking.id).await.unwrap().is_empty());

    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    assert_eq!(intent.booking_id, booking.id);
}

#[tokio::test]
async fn pending_refund_waits_for_gateway_webhook() {
    let gateway = MockPaymentGateway::new().with_refund_status(RefundStatus::Pending);
    let mut h = Harness::with_gateway(gateway).await;
    let booking = h.create(19).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    h.reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_P1",
            &sign_callback(&intent.gateway_order_id, "pay_P1"),
        )
        .await
        .unwrap();
    h.ledger.cancel(booking.id, CancelReason::Admin).await.unwrap();

    h.refund_worker.drain().await;
    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().payment_status,
        PaymentStatus::RefundPending
    );

    let body = refund_webhook("pay_P1", "rfnd_P1");
    assert_eq!(
        h.reconciler.handle_webhook(&body, &sign_webhook(&body)).await.unwrap(),
        WebhookOutcome::Applied
    );
    assert_eq!(
        h.reconciler.handle_webhook(&body, &sign_webhook(&body)).await.unwrap(),
        WebhookOutcome::Duplicate
    );
    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().payment_status,
        PaymentStatus::Refunded
    );
}

#[tokio::test]
async fn transient_refund_failures_are_retried() {
    let mut h = Harness::new().await;
    let booking = h.create(20).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    h.reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_T1",
            &sign_callback(&intent.gateway_order_id, "pay_T1"),
        )
        .await
        .unwrap();
    h.ledger.cancel(booking.id, CancelReason::Customer).await.unwrap();

    h.gateway.fail_next(DomainError::GatewayError("503".into())).await;
    h.refund_worker.drain().await;

    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().payment_status,
        PaymentStatus::Refunded
    );
    assert_eq!(h.gateway.refunds().await.len(), 1);
}

#[tokio::test]
async fn refunds_left_pending_are_found_again() {
    let h = Harness::new().await;
    let booking = h.create(13).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    h.reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_S1",
            &sign_callback(&intent.gateway_order_id, "pay_S1"),
        )
        .await
        .unwrap();
    h.ledger.cancel(booking.id, CancelReason::Admin).await.unwrap();

    let owed = h.ledger.pending_refunds().await.unwrap();
    assert_eq!(owed.len(), 1);
    assert_eq!(owed[0].booking_id, booking.id);
    assert_eq!(owed[0].gateway_payment_id, "pay_S1");
    assert_eq!(owed[0].amount, PRICE);
}

#[tokio::test]
async fn sweeper_completes_finished_events() {
    let h = Harness::new().await;
    let booking = h.create(10).await;
    let intent = h.reconciler.create_intent(booking.id).await.unwrap();
    h.reconciler
        .handle_callback(
            &intent.gateway_order_id,
            "pay_E1",
            &sign_callback(&intent.gateway_order_id, "pay_E1"),
        )
        .await
        .unwrap();

    let sweeper = HoldSweeper::new(h.ledger.clone());
    assert_eq!(sweeper.sweep().await.unwrap().bookings_completed, 0);

    h.clock.advance(Duration::days(10));
    let report = sweeper.sweep().await.unwrap();
    assert_eq!(report.bookings_completed, 1);
    assert_eq!(
        h.ledger.get(booking.id).await.unwrap().status,
        BookingStatus::Completed
    );
}
