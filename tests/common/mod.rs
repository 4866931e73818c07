// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::Path;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ebike_rental::bikes::{self, NewBike};
use ebike_rental::bookings::{self, BookingRequest, PaymentReceipt, Schedule};
use ebike_rental::config::Rules;
use ebike_rental::context::Context;
use ebike_rental::db;
use ebike_rental::error::GatewayError;
use ebike_rental::gateway::{GatewayOrder, PaymentGateway};
use ebike_rental::models::{Actor, Booking, BookingStatus, EBike};
use ebike_rental::notify::{Notice, Notifier, Recipient};
use ebike_rental::payments;
use ebike_rental::users::{self, Role};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

pub fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    day(d).and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

pub fn money(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Keeps every notice it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn count_for(&self, recipient: &Recipient) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|n| &n.recipient == recipient)
            .count()
    }

    pub fn containing(&self, text: &str) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|n| n.message.contains(text))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, _conn: &Connection, notice: &Notice) -> anyhow::Result<()> {
        self.sent.borrow_mut().push(notice.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _conn: &Connection, _notice: &Notice) -> anyhow::Result<()> {
        Err(anyhow!("mail relay refused connection"))
    }
}

/// Gateway double: hands out `order_<receipt>` ids or fails on demand.
#[derive(Default)]
pub struct FakeGateway {
    pub calls: Cell<usize>,
    pub unavailable: bool,
}

impl PaymentGateway for FakeGateway {
    fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        self.calls.set(self.calls.get() + 1);
        if self.unavailable {
            return Err(GatewayError::Unavailable("operation timed out".into()));
        }
        Ok(GatewayOrder {
            id: format!("order_{}", receipt),
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".into(),
        })
    }
}

pub struct World {
    pub conn: Connection,
    pub rules: Rules,
    pub notifier: RecordingNotifier,
    pub now: NaiveDateTime,
    pub admin: Actor,
    pub rider: Actor,
    pub provider: Actor,
}

impl World {
    pub fn parts(&mut self) -> (&mut Connection, Context<'_>) {
        (
            &mut self.conn,
            Context::new(&self.rules, &self.notifier, self.now),
        )
    }

    pub fn user(&self, username: &str, role: Role) -> Actor {
        users::create(&self.conn, username, &format!("{}@example.com", username), role)
            .unwrap()
            .actor()
    }

    /// A second provider, verified but with the registration fee unpaid.
    pub fn new_provider(&self, username: &str) -> Actor {
        let p = self.user(username, Role::Provider);
        users::set_provider_verified(&self.conn, &self.notifier, &self.admin, p.user_id, true, None)
            .unwrap();
        p
    }

    pub fn bike_for(&self, owner: &Actor, per_day: &str) -> EBike {
        bikes::add(
            &self.conn,
            owner,
            NewBike {
                name: format!("Volt {}", per_day),
                description: "city e-bike".into(),
                price_per_day: money(per_day),
                price_per_week: money(per_day) * Decimal::from(6),
                image: "volt.jpg".into(),
            },
        )
        .unwrap()
    }

    pub fn bike(&self, per_day: &str) -> EBike {
        self.bike_for(&self.provider, per_day)
    }

    pub fn book(&mut self, ebike_id: i64, start: u32, end: u32) -> Booking {
        let rider = self.rider;
        let (conn, ctx) = self.parts();
        bookings::create(
            conn,
            &ctx,
            &rider,
            BookingRequest {
                ebike_id,
                schedule: Schedule {
                    start_date: day(start),
                    start_time: None,
                    end_date: day(end),
                    end_time: None,
                },
            },
        )
        .unwrap()
    }

    /// Open (or reuse) the booking's gateway order as its rider.
    pub fn order(&self, booking_id: i64) -> String {
        let booking = self.booking(booking_id);
        let rider = users::get(&self.conn, booking.rider_id).unwrap().actor();
        payments::create_order(&self.conn, &FakeGateway::default(), "INR", &rider, booking_id)
            .unwrap()
            .order_id
    }

    pub fn pay(&mut self, booking_id: i64) -> Booking {
        let order_id = self.order(booking_id);
        let (conn, ctx) = self.parts();
        bookings::confirm_payment(
            conn,
            &ctx,
            booking_id,
            &PaymentReceipt {
                order_id,
                payment_id: format!("pay_{}", booking_id),
            },
        )
        .unwrap()
        .booking()
        .clone()
    }

    /// Booked, paid and approved.
    pub fn approved(&mut self, ebike_id: i64, start: u32, end: u32) -> Booking {
        let b = self.book(ebike_id, start, end);
        self.pay(b.id);
        let admin = self.admin;
        let (conn, ctx) = self.parts();
        bookings::approve(conn, &ctx, &admin, b.id).unwrap()
    }

    pub fn booking(&self, id: i64) -> Booking {
        bookings::get_for(&self.conn, &self.admin, id).unwrap()
    }

    pub fn is_available(&self, ebike_id: i64) -> bool {
        bikes::get(&self.conn, ebike_id).unwrap().is_available
    }
}

/// Fresh database with one admin, one rider and one verified provider
/// whose registration fee is settled. The clock reads 2025-06-01 08:00.
pub fn world() -> World {
    seeded(db::open_in_memory().unwrap())
}

/// Same as [`world`], backed by a file so more connections can share it.
pub fn file_world(path: &Path) -> World {
    seeded(db::open_or_init(Some(path)).unwrap())
}

fn seeded(conn: Connection) -> World {
    let admin = users::create(&conn, "admin", "admin@example.com", Role::Admin)
        .unwrap()
        .actor();
    let rider = users::create(&conn, "asha", "asha@example.com", Role::Rider)
        .unwrap()
        .actor();
    let provider = users::create(&conn, "ravi", "ravi@example.com", Role::Provider)
        .unwrap()
        .actor();
    let now = at(1, 8, 0);
    let notifier = RecordingNotifier::default();
    users::set_provider_verified(&conn, &notifier, &admin, provider.user_id, true, None).unwrap();
    users::mark_registration_fee_paid(&conn, &admin, provider.user_id, now).unwrap();
    notifier.sent.borrow_mut().clear();
    World {
        conn,
        rules: Rules::default(),
        notifier,
        now,
        admin,
        rider,
        provider,
    }
}

/// Write a booking row directly, bypassing save-time validation. Used for
/// windows the public API would refuse, such as same-day rentals.
pub fn insert_booking(
    conn: &Connection,
    rider_id: i64,
    ebike_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    status: BookingStatus,
    paid: bool,
) -> i64 {
    conn.execute(
        "INSERT INTO bookings(rider_id, ebike_id, start_date, start_time, end_date, end_time,
                              total_price, status, is_paid, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, '500.00', ?7, ?8, ?9, ?9)",
        params![
            rider_id,
            ebike_id,
            start.date(),
            start.time(),
            end.date(),
            end.time(),
            status,
            paid,
            start
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}
