// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::*;
use ebike_rental::config::Rules;
use ebike_rental::ledger::{self, BalanceStatus, EarningEntry, PayoutEntry};
use ebike_rental::models::{BookingStatus, PayoutDestination, WithdrawalStatus};
use ebike_rental::users;
use ebike_rental::withdrawals;
use rust_decimal::Decimal;

fn upi() -> PayoutDestination {
    PayoutDestination::Upi {
        upi_id: "ravi@okaxis".into(),
    }
}

#[test]
fn earnings_cover_two_approved_rentals() {
    let mut w = world();
    let a = w.bike("500");
    let b = w.bike("600");
    w.approved(a.id, 10, 11);
    w.approved(b.id, 10, 11);

    let l = ledger::for_provider(&w.conn, w.provider.user_id, &w.rules).unwrap();
    assert_eq!(l.total_earnings, money("1100.00"));
    assert_eq!(l.platform_charges, money("110.00"));
    assert_eq!(l.net_earnings, money("990.00"));
    assert_eq!(l.available_balance, money("990.00"));
    assert_eq!(l.status, BalanceStatus::Available);

    let provider = w.provider;
    let (conn, ctx) = w.parts();
    withdrawals::request(conn, &ctx, &provider, money("500"), upi()).unwrap();
    let err = withdrawals::request(conn, &ctx, &provider, money("600"), upi()).unwrap_err();
    assert_eq!(
        err.user_message(),
        "amount: Insufficient balance. Available: ₹490.00"
    );

    let l = ledger::for_provider(&w.conn, w.provider.user_id, &w.rules).unwrap();
    assert_eq!(l.pending_withdrawal_exposure, money("500.00"));
    assert_eq!(l.available_balance, money("490.00"));
    // outstanding requests do not touch net earnings
    assert_eq!(l.net_earnings, money("990.00"));
}

#[test]
fn unapproved_bookings_earn_nothing() {
    let mut w = world();
    let bike = w.bike("500");
    let b = w.book(bike.id, 10, 12);
    w.pay(b.id);
    let l = ledger::for_provider(&w.conn, w.provider.user_id, &w.rules).unwrap();
    assert_eq!(l.total_earnings, Decimal::ZERO);
    assert_eq!(l.available_balance, Decimal::ZERO);
}

#[test]
fn balance_never_goes_negative() {
    let l = ledger::compute(
        &[EarningEntry {
            status: BookingStatus::Approved,
            total_price: money("500.00"),
        }],
        &[
            PayoutEntry {
                status: WithdrawalStatus::Completed,
                amount: money("450.00"),
            },
            PayoutEntry {
                status: WithdrawalStatus::Pending,
                amount: money("300.00"),
            },
        ],
        true,
        &Rules::default(),
    );
    assert_eq!(l.net_earnings, money("0.00"));
    assert_eq!(l.available_balance, Decimal::ZERO);
}

#[test]
fn registration_fee_is_held_back_until_paid() {
    let mut w = world();
    let kiran = w.new_provider("kiran");
    let bike = w.bike_for(&kiran, "500");
    w.approved(bike.id, 10, 11);

    let l = ledger::for_provider(&w.conn, kiran.user_id, &w.rules).unwrap();
    assert_eq!(l.net_earnings, money("450.00"));
    assert_eq!(l.registration_fee_withheld, money("100"));
    assert_eq!(l.available_balance, money("350.00"));

    let (conn, ctx) = w.parts();
    let err = withdrawals::request(conn, &ctx, &kiran, money("400"), upi()).unwrap_err();
    assert!(err.field_errors().unwrap().has("amount"));

    users::mark_registration_fee_paid(&w.conn, &w.admin, kiran.user_id, w.now).unwrap();
    let l = ledger::for_provider(&w.conn, kiran.user_id, &w.rules).unwrap();
    assert_eq!(l.available_balance, money("450.00"));
    assert_eq!(l.registration_fee_withheld, Decimal::ZERO);
}

#[test]
fn small_earnings_leave_fee_due() {
    let mut w = world();
    let kiran = w.new_provider("kiran");
    let bike = w.bike_for(&kiran, "100");
    w.approved(bike.id, 10, 11);

    let l = ledger::for_provider(&w.conn, kiran.user_id, &w.rules).unwrap();
    assert_eq!(l.status, BalanceStatus::RegistrationFeeDue);
    assert_eq!(l.available_balance, Decimal::ZERO);
    assert_eq!(l.registration_fee_withheld, money("90.00"));
}

#[test]
fn summary_lists_every_provider() {
    let mut w = world();
    let kiran = w.new_provider("kiran");
    let ours = w.bike("500");
    let theirs = w.bike_for(&kiran, "300");
    w.approved(ours.id, 10, 12);
    w.approved(theirs.id, 10, 11);

    let s = ledger::summary(&w.conn, &w.rules).unwrap();
    assert_eq!(s.providers.len(), 2);
    assert_eq!(s.total_provider_earnings, money("1300.00"));
    assert_eq!(s.total_platform_charges, money("130.00"));
    let ravi = s
        .providers
        .iter()
        .find(|p| p.username == "ravi")
        .unwrap();
    assert_eq!(ravi.ledger.net_earnings, money("900.00"));
}
