// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only receipt views. A receipt exists only once its record has
//! reached a settled state.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::bikes;
use crate::bookings;
use crate::error::{Error, Result};
use crate::models::{Actor, BookingStatus, WithdrawalStatus};
use crate::withdrawals;

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub receipt_no: String,
    pub booking_id: i64,
    pub rider: String,
    pub ebike: String,
    pub provider: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub days: i64,
    pub price_per_day: Decimal,
    pub total_price: Decimal,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub issued_for: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalReceipt {
    pub receipt_no: String,
    pub withdrawal_id: i64,
    pub provider: String,
    pub amount: Decimal,
    pub destination: String,
    pub transaction_id: Option<String>,
    pub requested_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub processed_by: Option<String>,
}

fn username(conn: &Connection, id: i64) -> Result<String> {
    Ok(conn.query_row(
        "SELECT username FROM users WHERE id=?1",
        params![id],
        |r| r.get(0),
    )?)
}

pub fn booking(conn: &Connection, actor: &Actor, booking_id: i64) -> Result<BookingReceipt> {
    let b = bookings::get_for(conn, actor, booking_id)?;
    if b.status != BookingStatus::Approved || !b.is_paid {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking_id,
            state: b.status.to_string(),
            action: "issue a receipt for",
        });
    }
    let bike = bikes::get(conn, b.ebike_id)?;
    Ok(BookingReceipt {
        receipt_no: format!("BK-{:06}", b.id),
        booking_id: b.id,
        rider: username(conn, b.rider_id)?,
        ebike: bike.name,
        provider: username(conn, bike.provider_id)?,
        start_date: b.start_date,
        start_time: b.start_time,
        end_date: b.end_date,
        end_time: b.end_time,
        days: b.days(),
        price_per_day: bike.price_per_day,
        total_price: b.total_price,
        payment_id: b.razorpay_payment_id,
        order_id: b.razorpay_order_id,
        issued_for: b.updated_at,
    })
}

pub fn withdrawal(
    conn: &Connection,
    actor: &Actor,
    withdrawal_id: i64,
) -> Result<WithdrawalReceipt> {
    let w = withdrawals::get_for(conn, actor, withdrawal_id)?;
    if w.status != WithdrawalStatus::Completed {
        return Err(Error::InvalidTransition {
            entity: "withdrawal",
            id: withdrawal_id,
            state: w.status.to_string(),
            action: "issue a receipt for",
        });
    }
    let processed_by = match w.processed_by {
        Some(id) => Some(username(conn, id)?),
        None => None,
    };
    Ok(WithdrawalReceipt {
        receipt_no: format!("WD-{:06}", w.id),
        withdrawal_id: w.id,
        provider: username(conn, w.provider_id)?,
        amount: w.amount,
        destination: w.payout.describe(),
        transaction_id: w.transaction_id,
        requested_at: w.created_at,
        processed_at: w.processed_at,
        processed_by,
    })
}
