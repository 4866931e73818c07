// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use anyhow::Result;
use common::*;
use ebike_rental::commands::{self, Session};
use ebike_rental::error::Error;
use ebike_rental::gateway::SignatureVerifier;
use ebike_rental::models::BookingStatus;
use ebike_rental::notify::{InAppNotifier, Notice, Notifier};
use ebike_rental::{availability, bikes, cli, db, notify, users, withdrawals};
use secrecy::Secret;

/// Parse `args` and dispatch like the binary does, against the test world.
fn run(w: &mut World, args: &[&str]) -> Result<()> {
    let mut argv = vec!["ebike-rental"];
    argv.extend_from_slice(args);
    let m = cli::build_cli().get_matches_from(argv);
    let actor = match m.get_one::<String>("as") {
        Some(name) => Some(users::find_by_username(&w.conn, name)?.unwrap().actor()),
        None => None,
    };
    let gateway = FakeGateway::default();
    let verifier = SignatureVerifier::new(
        Secret::new("rzp_test_secret".to_string()),
        Secret::new("whsec_ebike".to_string()),
    );
    let (conn, ctx) = w.parts();
    let mut s = Session {
        conn,
        ctx,
        actor,
        gateway: &gateway,
        verifier: &verifier,
        currency: "INR",
    };
    match m.subcommand() {
        Some(("user", sub)) => commands::users::handle(&mut s, sub),
        Some(("bike", sub)) => commands::bikes::handle(&mut s, sub),
        Some(("booking", sub)) => commands::bookings::handle(&mut s, sub),
        Some(("pay", sub)) => commands::payments::handle(&mut s, sub),
        Some(("withdrawal", sub)) => commands::withdrawals::handle(&mut s, sub),
        Some(("earnings", sub)) => commands::earnings::handle(&mut s, sub),
        Some(("document", sub)) => commands::documents::handle(&mut s, sub),
        Some(("notifications", sub)) => commands::notifications::handle(&mut s, sub),
        Some(("receipt", sub)) => commands::receipts::handle(&mut s, sub),
        Some(("sync-bike-availability", sub)) => commands::sync::handle(&mut s, sub),
        Some(("doctor", _)) => commands::doctor::handle(&mut s),
        _ => Ok(()),
    }
}

#[test]
fn onboarding_through_the_cli() {
    let mut w = world();
    run(&mut w, &["user", "add", "--username", "kiran", "--email", "k@example.com", "--role", "provider"]).unwrap();
    let kiran = users::find_by_username(&w.conn, "kiran").unwrap().unwrap();
    assert!(kiran.is_vehicle_provider);
    assert!(!kiran.is_verified_provider);

    let err = run(
        &mut w,
        &["bike", "add", "--as", "kiran", "--name", "Volt", "--price-per-day", "450", "--price-per-week", "2500"],
    )
    .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotPermitted)));

    run(&mut w, &["user", "verify", "--as", "admin", "--provider", "kiran"]).unwrap();
    run(
        &mut w,
        &["bike", "add", "--as", "kiran", "--name", "Volt", "--price-per-day", "450", "--price-per-week", "2500"],
    )
    .unwrap();
    let listed = bikes::list(&w.conn, Default::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].price_per_day, money("450.00"));
    run(&mut w, &["bike", "list", "--available", "--json"]).unwrap();
}

#[test]
fn booking_through_the_cli() {
    let mut w = world();
    let bike = w.bike("500");
    let id = bike.id.to_string();
    run(
        &mut w,
        &["booking", "create", "--as", "asha", "--bike", &id, "--start-date", "2025-06-10", "--end-date", "2025-06-13", "--start-time", "10:30"],
    )
    .unwrap();
    let booking = ebike_rental::bookings::list_for(&w.conn, &w.rider).unwrap().remove(0);
    assert_eq!(booking.total_price, money("1500.00"));
    assert_eq!(booking.start_time.to_string(), "10:30:00");
    assert_eq!(booking.status, BookingStatus::Pending);

    let bid = booking.id.to_string();
    let err = run(&mut w, &["booking", "approve", "--as", "admin", "--id", &bid]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidTransition { .. })
    ));
    run(&mut w, &["booking", "cancel", "--as", "asha", "--id", &bid]).unwrap();
    assert_eq!(w.booking(booking.id).status, BookingStatus::Cancelled);
    run(&mut w, &["booking", "list", "--as", "ravi", "--jsonl"]).unwrap();
}

#[test]
fn commands_that_need_an_actor_say_so() {
    let mut w = world();
    let err = run(&mut w, &["withdrawal", "list"]).unwrap_err();
    assert!(err.to_string().contains("--as"));
}

#[test]
fn small_withdrawal_is_a_validation_error() {
    let mut w = world();
    let bike = w.bike("500");
    w.approved(bike.id, 10, 11);
    let err = run(
        &mut w,
        &["withdrawal", "request", "--as", "ravi", "--amount", "150", "--transfer-type", "upi", "--upi-id", "ravi@okaxis"],
    )
    .unwrap_err();
    let e = err.downcast_ref::<Error>().unwrap();
    assert!(e.is_validation());
    assert!(e.user_message().contains("Minimum withdrawal amount is ₹200"));
    assert!(withdrawals::list_for(&w.conn, &w.admin).unwrap().is_empty());

    run(
        &mut w,
        &["withdrawal", "request", "--as", "ravi", "--amount", "250", "--transfer-type", "upi", "--upi-id", "ravi@okaxis"],
    )
    .unwrap();
    assert_eq!(withdrawals::list_for(&w.conn, &w.admin).unwrap().len(), 1);
    run(&mut w, &["earnings", "show", "--as", "ravi", "--json"]).unwrap();
}

#[test]
fn sweep_command_fixes_stale_flags() {
    let mut w = world();
    let bike = w.bike("500");
    w.approved(bike.id, 10, 12);
    w.now = at(11, 9, 0);
    assert_eq!(
        availability::divergences(&w.conn, w.now, w.rules.availability)
            .unwrap()
            .len(),
        1
    );
    run(&mut w, &["doctor"]).unwrap();
    run(&mut w, &["sync-bike-availability", "--silent"]).unwrap();
    assert!(!w.is_available(bike.id));
    assert_eq!(
        availability::last_sync_date(&w.conn).unwrap().as_deref(),
        Some("2025-06-11")
    );
}

#[test]
fn notifications_can_be_read_from_the_cli() {
    let mut w = world();
    InAppNotifier
        .notify(&w.conn, &Notice::to_user(w.rider.user_id, "Welcome aboard", "/riders/dashboard/"))
        .unwrap();
    let item = notify::list_for(&w.conn, w.rider.user_id, true).unwrap().remove(0);
    run(&mut w, &["notifications", "list", "--as", "asha", "--unread"]).unwrap();
    run(&mut w, &["notifications", "read", "--as", "asha", "--id", &item.id.to_string()]).unwrap();
    assert!(notify::list_for(&w.conn, w.rider.user_id, true).unwrap().is_empty());

    let err = run(&mut w, &["notifications", "read", "--as", "ravi", "--id", &item.id.to_string()])
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn database_file_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("rental.sqlite");
    {
        let conn = db::open_or_init(Some(&path)).unwrap();
        users::create(&conn, "asha", "asha@example.com", users::Role::Rider).unwrap();
    }
    assert!(path.exists());
    let conn = db::open_or_init(Some(&path)).unwrap();
    let asha = users::find_by_username(&conn, "asha").unwrap().unwrap();
    assert!(asha.is_rider);
    assert_eq!(db::db_path(Some(&path)).unwrap(), path);
}
