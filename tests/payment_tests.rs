// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use std::sync::Barrier;
use std::thread;

use common::*;
use ebike_rental::bookings::PaymentOutcome;
use ebike_rental::context::Context;
use ebike_rental::db;
use ebike_rental::error::{Error, GatewayError};
use ebike_rental::gateway::SignatureVerifier;
use ebike_rental::models::{Booking, BookingStatus};
use ebike_rental::notify::Recipient;
use ebike_rental::payments::{self, CheckoutCallback, WebhookOutcome};
use ebike_rental::receipts;
use ebike_rental::users::Role;
use secrecy::Secret;
use serde_json::json;

fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(
        Secret::new("rzp_test_secret".to_string()),
        Secret::new("whsec_ebike".to_string()),
    )
}

/// A rider's pending 3-day booking at ₹500/day with a gateway order attached.
fn ordered(w: &mut World) -> (Booking, String) {
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    let gateway = FakeGateway::default();
    let order = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap();
    (b, order.order_id)
}

fn captured(payment_id: &str, order_id: &str, receipt: Option<&str>) -> Vec<u8> {
    let mut payload = json!({
        "payment": {"entity": {"id": payment_id, "order_id": order_id, "status": "captured"}}
    });
    if let Some(r) = receipt {
        payload["order"] = json!({"entity": {"id": order_id, "receipt": r}});
    }
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": payload
    }))
    .unwrap()
}

fn signed(v: &SignatureVerifier, body: &[u8]) -> String {
    v.webhook_signature(body).unwrap()
}

#[test]
fn order_is_opened_in_paise_and_remembered() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    let gateway = FakeGateway::default();

    let order = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap();
    assert_eq!(order.amount_minor, 150000);
    assert_eq!(order.currency, "INR");
    assert_eq!(order.order_id, format!("order_booking_{}", b.id));
    assert_eq!(gateway.calls.get(), 1);
    assert_eq!(
        w.booking(b.id).razorpay_order_id.as_deref(),
        Some(order.order_id.as_str())
    );
}

#[test]
fn asking_again_reuses_the_open_order() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    let gateway = FakeGateway::default();

    let first = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap();
    let again = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap();
    assert_eq!(again.order_id, first.order_id);
    assert_eq!(again.amount_minor, 150000);
    assert_eq!(gateway.calls.get(), 1);
}

#[test]
fn an_order_only_pays_for_its_own_booking() {
    let mut w = world();
    let cheap = w.bike("100");
    let pricey = w.bike("5000");
    let a = w.book(cheap.id, 10, 11);
    let b = w.book(pricey.id, 10, 20);
    let gateway = FakeGateway::default();
    let order_a = payments::create_order(&w.conn, &gateway, "INR", &w.rider, a.id)
        .unwrap()
        .order_id;
    payments::create_order(&w.conn, &gateway, "INR", &w.rider, a.id).unwrap();

    let v = verifier();
    let paid_for_a = CheckoutCallback {
        signature: v.payment_signature(&order_a, "pay_1").unwrap(),
        order_id: order_a.clone(),
        payment_id: "pay_1".into(),
    };
    let rider = w.rider;
    let (conn, ctx) = w.parts();

    // b has no order of its own yet
    let err = payments::verify(conn, &ctx, &v, &rider, b.id, &paid_for_a).unwrap_err();
    assert!(err.field_errors().unwrap().has("razorpay_order_id"));

    // nor once it has one
    let order_b = payments::create_order(conn, &gateway, "INR", &rider, b.id).unwrap();
    assert_ne!(order_b.order_id, order_a);
    assert_eq!(order_b.amount_minor, 5_000_000);
    let err = payments::verify(conn, &ctx, &v, &rider, b.id, &paid_for_a).unwrap_err();
    assert!(err.field_errors().unwrap().has("razorpay_order_id"));

    // a webhook naming b with a's order is refused the same way
    let body = captured("pay_1", &order_a, Some(&payments::receipt_for(b.id)));
    let sig = signed(&v, &body);
    let err = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap_err();
    assert!(err.is_validation());

    // the order still pays for a
    let outcome = payments::verify(conn, &ctx, &v, &rider, a.id, &paid_for_a).unwrap();
    assert!(matches!(outcome, PaymentOutcome::Confirmed(_)));

    let b_after = w.booking(b.id);
    assert!(!b_after.is_paid);
    assert_eq!(b_after.status, BookingStatus::Pending);
    assert_eq!(b_after.razorpay_order_id, Some(order_b.order_id));
    assert!(w.booking(a.id).is_paid);
}

#[test]
fn only_the_booking_rider_opens_an_order() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    let other = w.user("meera", Role::Rider);
    let gateway = FakeGateway::default();

    for who in [other, w.provider] {
        assert!(matches!(
            payments::create_order(&w.conn, &gateway, "INR", &who, b.id),
            Err(Error::NotPermitted)
        ));
    }
    assert_eq!(gateway.calls.get(), 0);
}

#[test]
fn gateway_outage_leaves_the_booking_alone() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    let gateway = FakeGateway {
        unavailable: true,
        ..Default::default()
    };

    let err = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap_err();
    assert!(matches!(err, Error::Gateway(GatewayError::Unavailable(_))));
    assert_eq!(
        err.user_message(),
        "payment gateway is unavailable, please try again shortly"
    );
    let after = w.booking(b.id);
    assert_eq!(after.razorpay_order_id, None);
    assert_eq!(after.status, BookingStatus::Pending);
}

#[test]
fn zero_priced_booking_never_reaches_the_gateway() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    w.conn
        .execute("UPDATE bookings SET total_price='0.00' WHERE id=?1", [b.id])
        .unwrap();
    let gateway = FakeGateway::default();

    let err = payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id).unwrap_err();
    assert!(err.field_errors().unwrap().has("total_price"));
    assert_eq!(gateway.calls.get(), 0);
}

#[test]
fn paid_bookings_get_no_new_order() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 13);
    w.pay(b.id);
    let gateway = FakeGateway::default();
    assert!(matches!(
        payments::create_order(&w.conn, &gateway, "INR", &w.rider, b.id),
        Err(Error::InvalidTransition { .. })
    ));
}

#[test]
fn bad_checkout_signature_changes_nothing() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let rider = w.rider;
    let (conn, ctx) = w.parts();

    let err = payments::verify(
        conn,
        &ctx,
        &v,
        &rider,
        b.id,
        &CheckoutCallback {
            order_id,
            payment_id: "pay_1".into(),
            signature: "invalid_signature".into(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::SignatureVerification));
    assert_eq!(err.user_message(), "payment could not be verified");

    let after = w.booking(b.id);
    assert!(!after.is_paid);
    assert_eq!(after.status, BookingStatus::Pending);
    assert_eq!(after.razorpay_payment_id, None);
}

#[test]
fn valid_checkout_pays_once() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let callback = CheckoutCallback {
        signature: v.payment_signature(&order_id, "pay_1").unwrap(),
        order_id,
        payment_id: "pay_1".into(),
    };
    let rider = w.rider;
    let (conn, ctx) = w.parts();

    let first = payments::verify(conn, &ctx, &v, &rider, b.id, &callback).unwrap();
    assert!(matches!(first, PaymentOutcome::Confirmed(_)));
    assert_eq!(first.booking().status, BookingStatus::AwaitingApproval);

    let again = payments::verify(conn, &ctx, &v, &rider, b.id, &callback).unwrap();
    assert!(matches!(again, PaymentOutcome::AlreadyPaid(_)));
    assert_eq!(w.notifier.containing("Payment received"), 1);
}

#[test]
fn payment_for_another_order_is_refused() {
    let mut w = world();
    let (b, _) = ordered(&mut w);
    let v = verifier();
    let callback = CheckoutCallback {
        signature: v.payment_signature("order_elsewhere", "pay_1").unwrap(),
        order_id: "order_elsewhere".into(),
        payment_id: "pay_1".into(),
    };
    let rider = w.rider;
    let (conn, ctx) = w.parts();
    let err = payments::verify(conn, &ctx, &v, &rider, b.id, &callback).unwrap_err();
    assert!(err.field_errors().unwrap().has("razorpay_order_id"));
    assert!(!w.booking(b.id).is_paid);
}

#[test]
fn redelivered_webhook_confirms_once() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let body = captured("pay_W", &order_id, Some(&payments::receipt_for(b.id)));
    let sig = signed(&v, &body);
    let (conn, ctx) = w.parts();

    let first = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert_eq!(first, WebhookOutcome::Confirmed { booking_id: b.id });
    let second = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert_eq!(second, WebhookOutcome::AlreadyPaid { booking_id: b.id });

    let after = w.booking(b.id);
    assert!(after.is_paid);
    assert_eq!(after.status, BookingStatus::AwaitingApproval);
    assert_eq!(after.razorpay_payment_id.as_deref(), Some("pay_W"));
    assert_eq!(w.notifier.count_for(&Recipient::Admins), 2);
    assert_eq!(w.notifier.containing("Payment received"), 1);
}

#[test]
fn webhook_after_checkout_is_a_no_op() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let callback = CheckoutCallback {
        signature: v.payment_signature(&order_id, "pay_1").unwrap(),
        order_id: order_id.clone(),
        payment_id: "pay_1".into(),
    };
    let body = captured("pay_1", &order_id, Some(&payments::receipt_for(b.id)));
    let sig = signed(&v, &body);
    let rider = w.rider;
    let (conn, ctx) = w.parts();

    payments::verify(conn, &ctx, &v, &rider, b.id, &callback).unwrap();
    let outcome = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert_eq!(outcome, WebhookOutcome::AlreadyPaid { booking_id: b.id });
    assert_eq!(w.notifier.containing("Payment received"), 1);
}

#[test]
fn checkout_and_webhook_racing_confirm_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rental.sqlite");
    let mut w = file_world(&path);
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let callback = CheckoutCallback {
        signature: v.payment_signature(&order_id, "pay_1").unwrap(),
        order_id: order_id.clone(),
        payment_id: "pay_1".into(),
    };
    let body = captured("pay_1", &order_id, Some(&payments::receipt_for(b.id)));
    let sig = signed(&v, &body);
    let (rules, rider, now) = (&w.rules, w.rider, w.now);
    let gate = Barrier::new(2);

    let (by_checkout, by_webhook) = thread::scope(|s| {
        let checkout = s.spawn(|| {
            let mut conn = db::open_or_init(Some(&path)).unwrap();
            let notifier = RecordingNotifier::default();
            let ctx = Context::new(rules, &notifier, now);
            gate.wait();
            let outcome = payments::verify(&mut conn, &ctx, &v, &rider, b.id, &callback).unwrap();
            (
                matches!(outcome, PaymentOutcome::Confirmed(_)),
                notifier.containing("Payment received"),
            )
        });
        let webhook = s.spawn(|| {
            let mut conn = db::open_or_init(Some(&path)).unwrap();
            let notifier = RecordingNotifier::default();
            let ctx = Context::new(rules, &notifier, now);
            gate.wait();
            let outcome = payments::handle_webhook(&mut conn, &ctx, &v, &body, &sig).unwrap();
            (
                outcome == WebhookOutcome::Confirmed { booking_id: b.id },
                notifier.containing("Payment received"),
            )
        });
        (checkout.join().unwrap(), webhook.join().unwrap())
    });

    // exactly one path confirms and tells the admins
    assert_ne!(by_checkout.0, by_webhook.0);
    assert_eq!(by_checkout.1 + by_webhook.1, 1);
    let after = w.booking(b.id);
    assert!(after.is_paid);
    assert_eq!(after.status, BookingStatus::AwaitingApproval);
    assert_eq!(after.razorpay_payment_id.as_deref(), Some("pay_1"));
}

#[test]
fn webhook_with_bad_signature_is_refused() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let body = captured("pay_W", &order_id, Some(&payments::receipt_for(b.id)));
    // signed with the checkout key instead of the webhook secret
    let wrong = SignatureVerifier::new(
        Secret::new("whsec_ebike".to_string()),
        Secret::new("rzp_test_secret".to_string()),
    );
    let sig = signed(&wrong, &body);
    let (conn, ctx) = w.parts();
    assert!(matches!(
        payments::handle_webhook(conn, &ctx, &v, &body, &sig),
        Err(Error::SignatureVerification)
    ));
    assert!(!w.booking(b.id).is_paid);
}

#[test]
fn other_events_are_ignored() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let body = serde_json::to_vec(&json!({
        "event": "payment.failed",
        "payload": {"payment": {"entity": {"id": "pay_F", "order_id": order_id, "status": "failed"}}}
    }))
    .unwrap();
    let sig = signed(&v, &body);
    let (conn, ctx) = w.parts();
    let outcome = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    assert!(!w.booking(b.id).is_paid);
}

#[test]
fn webhook_without_receipt_falls_back_to_order_id() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let body = captured("pay_W", &order_id, None);
    let sig = signed(&v, &body);
    let (conn, ctx) = w.parts();
    let outcome = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert_eq!(outcome, WebhookOutcome::Confirmed { booking_id: b.id });
}

#[test]
fn webhook_for_unknown_order_is_acknowledged() {
    let mut w = world();
    let v = verifier();
    let body = captured("pay_W", "order_nobody", None);
    let sig = signed(&v, &body);
    let (conn, ctx) = w.parts();
    let outcome = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));

    // a receipt naming a booking that is gone
    let body = captured("pay_W", "order_gone", Some("booking_4242"));
    let sig = signed(&v, &body);
    let outcome = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
}

#[test]
fn signed_garbage_is_a_malformed_payload() {
    let mut w = world();
    let v = verifier();
    let body = b"{\"event\": ".to_vec();
    let sig = signed(&v, &body);
    let (conn, ctx) = w.parts();
    let err = payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)));
}

#[test]
fn receipt_is_issued_after_approval() {
    let mut w = world();
    let (b, order_id) = ordered(&mut w);
    let v = verifier();
    let body = captured("pay_R", &order_id, Some(&payments::receipt_for(b.id)));
    let sig = signed(&v, &body);
    let admin = w.admin;
    let (conn, ctx) = w.parts();
    payments::handle_webhook(conn, &ctx, &v, &body, &sig).unwrap();
    assert!(matches!(
        receipts::booking(conn, &admin, b.id),
        Err(Error::InvalidTransition { .. })
    ));
    ebike_rental::bookings::approve(conn, &ctx, &admin, b.id).unwrap();

    let r = receipts::booking(&w.conn, &w.rider, b.id).unwrap();
    assert_eq!(r.receipt_no, format!("BK-{:06}", b.id));
    assert_eq!(r.days, 3);
    assert_eq!(r.total_price, money("1500.00"));
    assert_eq!(r.price_per_day, money("500.00"));
    assert_eq!(r.payment_id.as_deref(), Some("pay_R"));
    assert_eq!(r.rider, "asha");
    assert_eq!(r.provider, "ravi");
}
