// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Booking lifecycle.
//!
//! ```text
//! pending --confirm_payment--> awaiting_approval --approve--> approved
//!    |                               |           \--reject---> rejected
//!    \------------cancel-------------+-----------------------> cancelled
//! ```
//!
//! Every mutation recomputes the bike's availability in the same
//! transaction and notifies after commit.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::availability;
use crate::bikes;
use crate::context::Context;
use crate::error::{Error, FieldErrors, Result};
use crate::models::{Actor, Booking, BookingStatus};
use crate::notify::{self, Notice};
use crate::users::require_admin;

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: NaiveDate,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy)]
pub struct BookingRequest {
    pub ebike_id: i64,
    pub schedule: Schedule,
}

/// Gateway identifiers proving the booking was paid.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub order_id: String,
    pub payment_id: String,
}

#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Confirmed(Booking),
    /// Already paid earlier; nothing changed.
    AlreadyPaid(Booking),
}

impl PaymentOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            PaymentOutcome::Confirmed(b) | PaymentOutcome::AlreadyPaid(b) => b,
        }
    }
}

struct Resolved {
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: NaiveDate,
    end_time: NaiveTime,
}

impl Resolved {
    fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Save-time checks. The past-start rule only applies when the start date
/// is new or changing, so admins can still edit historical bookings.
fn validate_schedule(
    schedule: &Schedule,
    ctx: &Context<'_>,
    start_date_changed: bool,
) -> Result<Resolved> {
    let r = Resolved {
        start_date: schedule.start_date,
        start_time: schedule.start_time.unwrap_or(ctx.rules.default_start_time),
        end_date: schedule.end_date,
        end_time: schedule.end_time.unwrap_or(ctx.rules.default_end_time),
    };
    let mut errs = FieldErrors::new();
    if r.end_date.and_time(r.end_time) < r.start_date.and_time(r.start_time) {
        errs.add("end_date", "End date must be after start date.");
    }
    if start_date_changed && r.start_date < ctx.now.date() {
        errs.add("start_date", "Start date cannot be in the past.");
    }
    errs.into_result()?;
    Ok(r)
}

fn price_for(days: i64, price_per_day: Decimal) -> Result<Decimal> {
    let total = Decimal::from(days) * price_per_day;
    if days < 1 || total <= Decimal::ZERO {
        return Err(Error::invalid(
            "end_date",
            "Please select a valid date range. Booking must be at least 1 day and total amount must be greater than ₹0.",
        ));
    }
    Ok(total.round_dp(2))
}

pub(crate) fn load(conn: &Connection, id: i64) -> Result<Booking> {
    conn.query_row(
        &format!("SELECT {} FROM bookings WHERE id=?1", Booking::COLUMNS),
        params![id],
        Booking::from_row,
    )
    .optional()?
    .ok_or(Error::NotFound {
        entity: "booking",
        id,
    })
}

pub(crate) fn find_by_order(conn: &Connection, order_id: &str) -> Result<Option<Booking>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM bookings WHERE razorpay_order_id=?1",
                Booking::COLUMNS
            ),
            params![order_id],
            Booking::from_row,
        )
        .optional()?)
}

fn provider_of(conn: &Connection, ebike_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT provider_id FROM ebikes WHERE id=?1",
        params![ebike_id],
        |r| r.get(0),
    )?)
}

fn can_view(conn: &Connection, actor: &Actor, booking: &Booking) -> Result<bool> {
    if actor.is_admin() || booking.rider_id == actor.user_id {
        return Ok(true);
    }
    Ok(actor.is_provider && provider_of(conn, booking.ebike_id)? == actor.user_id)
}

/// Booking visible to `actor`. Missing and foreign bookings look the same
/// to non-admins.
pub fn get_for(conn: &Connection, actor: &Actor, id: i64) -> Result<Booking> {
    match load(conn, id) {
        Ok(b) if can_view(conn, actor, &b)? => Ok(b),
        Ok(_) => Err(Error::NotPermitted),
        Err(Error::NotFound { .. }) if !actor.is_admin() => Err(Error::NotPermitted),
        Err(e) => Err(e),
    }
}

pub fn list_for(conn: &Connection, actor: &Actor) -> Result<Vec<Booking>> {
    let cols = Booking::COLUMNS
        .split(", ")
        .map(|c| format!("b.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let filter = if actor.is_admin() {
        None
    } else if actor.is_provider {
        Some("e.provider_id=?1")
    } else {
        Some("b.rider_id=?1")
    };
    let mut sql = format!("SELECT {cols} FROM bookings b JOIN ebikes e ON b.ebike_id=e.id");
    if let Some(f) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(f);
    }
    sql.push_str(" ORDER BY b.created_at DESC, b.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match filter {
        Some(_) => stmt.query_map(params![actor.user_id], Booking::from_row)?,
        None => stmt.query_map([], Booking::from_row)?,
    };
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

fn labels(conn: &Connection, booking: &Booking) -> Result<(String, String)> {
    Ok(conn.query_row(
        "SELECT u.username, e.name FROM users u, ebikes e WHERE u.id=?1 AND e.id=?2",
        params![booking.rider_id, booking.ebike_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?)
}

fn confirmation_link(id: i64) -> String {
    format!("/riders/booking/confirmation/{}/", id)
}

pub fn create(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    req: BookingRequest,
) -> Result<Booking> {
    if !actor.is_rider {
        return Err(Error::NotPermitted);
    }
    let resolved = validate_schedule(&req.schedule, ctx, true)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let bike = bikes::get(&tx, req.ebike_id)?;
    if !bike.is_available {
        return Err(Error::invalid("ebike", "This e-bike is not available right now."));
    }
    let total_price = price_for(resolved.days(), bike.price_per_day)?;
    tx.execute(
        "INSERT INTO bookings(rider_id, ebike_id, start_date, start_time, end_date, end_time,
                              total_price, status, is_paid, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
        params![
            actor.user_id,
            bike.id,
            resolved.start_date,
            resolved.start_time,
            resolved.end_date,
            resolved.end_time,
            total_price.to_string(),
            BookingStatus::Pending,
            ctx.now
        ],
    )?;
    let id = tx.last_insert_rowid();
    availability::recompute(&tx, bike.id, ctx.now, ctx.rules.availability)?;
    let booking = load(&tx, id)?;
    let (rider, bike_name) = labels(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(
        booking_id = id,
        ebike_id = bike.id,
        rider_id = actor.user_id,
        total = %total_price,
        "booking created"
    );
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_admins(
            format!("New booking by {} for {}.", rider, bike_name),
            "/admin-dashboard/#bookings",
        )],
    );
    Ok(booking)
}

fn set_status(
    tx: &Transaction<'_>,
    booking: &Booking,
    to: BookingStatus,
    action: &'static str,
    now: NaiveDateTime,
) -> Result<()> {
    let n = tx.execute(
        "UPDATE bookings SET status=?1, updated_at=?2 WHERE id=?3 AND status=?4",
        params![to, now, booking.id, booking.status],
    )?;
    if n == 0 {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking.id,
            state: booking.status.to_string(),
            action,
        });
    }
    Ok(())
}

/// Apply a verified payment. The payment must be for the order opened on
/// this booking. Idempotent: a booking that is already paid is returned
/// untouched.
pub fn confirm_payment(
    conn: &mut Connection,
    ctx: &Context<'_>,
    booking_id: i64,
    receipt: &PaymentReceipt,
) -> Result<PaymentOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = load(&tx, booking_id)?;
    if booking.is_paid {
        tracing::info!(booking_id, "payment already recorded, ignoring repeat confirmation");
        return Ok(PaymentOutcome::AlreadyPaid(booking));
    }
    if booking.status != BookingStatus::Pending {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking_id,
            state: booking.status.to_string(),
            action: "confirm payment for",
        });
    }
    match booking.razorpay_order_id.as_deref() {
        Some(open) if open == receipt.order_id => {}
        Some(open) => {
            tracing::warn!(
                booking_id,
                expected = open,
                got = %receipt.order_id,
                "payment for a different order"
            );
            return Err(Error::invalid(
                "razorpay_order_id",
                "Payment does not belong to this booking's order.",
            ));
        }
        None => {
            tracing::warn!(
                booking_id,
                got = %receipt.order_id,
                "payment for a booking with no order"
            );
            return Err(Error::invalid(
                "razorpay_order_id",
                "No payment order has been opened for this booking.",
            ));
        }
    }

    let n = tx.execute(
        "UPDATE bookings SET is_paid=1, status=?1, razorpay_payment_id=?2, updated_at=?3
         WHERE id=?4 AND is_paid=0 AND razorpay_order_id=?5",
        params![
            BookingStatus::AwaitingApproval,
            receipt.payment_id,
            ctx.now,
            booking_id,
            receipt.order_id
        ],
    )?;
    if n == 0 {
        let current = load(&tx, booking_id)?;
        return Ok(PaymentOutcome::AlreadyPaid(current));
    }
    availability::recompute(&tx, booking.ebike_id, ctx.now, ctx.rules.availability)?;
    let updated = load(&tx, booking_id)?;
    let (rider, bike_name) = labels(&tx, &updated)?;
    tx.commit()?;

    tracing::info!(booking_id, payment_id = %receipt.payment_id, "booking paid, awaiting approval");
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_admins(
            format!(
                "Payment received from {} for {} (booking #{}). Awaiting approval.",
                rider, bike_name, booking_id
            ),
            "/admin-dashboard/#bookings",
        )],
    );
    Ok(PaymentOutcome::Confirmed(updated))
}

fn decide(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
    to: BookingStatus,
) -> Result<Booking> {
    require_admin(actor)?;
    let action = if to == BookingStatus::Approved {
        "approve"
    } else {
        "reject"
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = load(&tx, booking_id)?;
    let allowed = booking.status == BookingStatus::AwaitingApproval
        || (ctx.rules.allow_unpaid_approval && booking.status == BookingStatus::Pending);
    if !allowed {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking_id,
            state: booking.status.to_string(),
            action,
        });
    }
    set_status(&tx, &booking, to, action, ctx.now)?;
    availability::recompute(&tx, booking.ebike_id, ctx.now, ctx.rules.availability)?;
    let updated = load(&tx, booking_id)?;
    let (_, bike_name) = labels(&tx, &updated)?;
    tx.commit()?;

    tracing::info!(booking_id, status = %to, admin_id = actor.user_id, "booking decided");
    let message = if to == BookingStatus::Approved {
        format!("Your booking for {} has been approved!", bike_name)
    } else {
        format!("Your booking for {} has been rejected.", bike_name)
    };
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_user(
            updated.rider_id,
            message,
            confirmation_link(booking_id),
        )],
    );
    Ok(updated)
}

pub fn approve(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
) -> Result<Booking> {
    decide(conn, ctx, actor, booking_id, BookingStatus::Approved)
}

pub fn reject(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
) -> Result<Booking> {
    decide(conn, ctx, actor, booking_id, BookingStatus::Rejected)
}

/// Soft cancellation by the rider who owns the booking or by an admin,
/// allowed until an admin has decided.
pub fn cancel(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
) -> Result<Booking> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = match load(&tx, booking_id) {
        Ok(b) if actor.is_admin() || b.rider_id == actor.user_id => b,
        Ok(_) => return Err(Error::NotPermitted),
        Err(Error::NotFound { .. }) if !actor.is_admin() => return Err(Error::NotPermitted),
        Err(e) => return Err(e),
    };
    if !matches!(
        booking.status,
        BookingStatus::Pending | BookingStatus::AwaitingApproval
    ) {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking_id,
            state: booking.status.to_string(),
            action: "cancel",
        });
    }
    set_status(&tx, &booking, BookingStatus::Cancelled, "cancel", ctx.now)?;
    availability::recompute(&tx, booking.ebike_id, ctx.now, ctx.rules.availability)?;
    let updated = load(&tx, booking_id)?;
    let (_, bike_name) = labels(&tx, &updated)?;
    tx.commit()?;

    tracing::info!(booking_id, by = actor.user_id, was_paid = booking.is_paid, "booking cancelled");
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_user(
            updated.rider_id,
            format!("Your booking for {} has been cancelled.", bike_name),
            confirmation_link(booking_id),
        )],
    );
    Ok(updated)
}

/// Admin hard delete from any state.
pub fn delete(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
) -> Result<()> {
    require_admin(actor)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = load(&tx, booking_id)?;
    let (_, bike_name) = labels(&tx, &booking)?;
    tx.execute("DELETE FROM bookings WHERE id=?1", params![booking_id])?;
    availability::recompute(&tx, booking.ebike_id, ctx.now, ctx.rules.availability)?;
    tx.commit()?;

    tracing::info!(booking_id, admin_id = actor.user_id, "booking deleted");
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_user(
            booking.rider_id,
            format!("Your booking for {} has been cancelled.", bike_name),
            "/riders/dashboard/",
        )],
    );
    Ok(())
}

/// Admin edit of the booking window. The price follows the new window.
pub fn reschedule(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    booking_id: i64,
    schedule: Schedule,
) -> Result<Booking> {
    require_admin(actor)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = load(&tx, booking_id)?;
    let start_changed = booking.start_date != schedule.start_date;
    let schedule = Schedule {
        start_time: schedule.start_time.or(Some(booking.start_time)),
        end_time: schedule.end_time.or(Some(booking.end_time)),
        ..schedule
    };
    let resolved = validate_schedule(&schedule, ctx, start_changed)?;
    let bike = bikes::get(&tx, booking.ebike_id)?;
    let total_price = price_for(resolved.days(), bike.price_per_day)?;
    // an unpaid order was opened for the old amount
    let drop_order = !booking.is_paid && total_price != booking.total_price;

    tx.execute(
        "UPDATE bookings SET start_date=?1, start_time=?2, end_date=?3, end_time=?4,
                             total_price=?5, updated_at=?6,
                             razorpay_order_id=CASE WHEN ?7 THEN NULL ELSE razorpay_order_id END
         WHERE id=?8",
        params![
            resolved.start_date,
            resolved.start_time,
            resolved.end_date,
            resolved.end_time,
            total_price.to_string(),
            ctx.now,
            drop_order,
            booking_id
        ],
    )?;
    availability::recompute(&tx, booking.ebike_id, ctx.now, ctx.rules.availability)?;
    let updated = load(&tx, booking_id)?;
    tx.commit()?;
    tracing::info!(
        booking_id,
        admin_id = actor.user_id,
        total = %total_price,
        order_dropped = drop_order,
        "booking rescheduled"
    );
    Ok(updated)
}
