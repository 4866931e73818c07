// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Keeps `ebikes.is_available` equal to "no active booking right now".
//!
//! A booking is active when it is approved, paid, and its window contains
//! `now`. Booking mutations call [`recompute`] inside their own
//! transaction; [`sync_all`] sweeps the whole fleet for windows that
//! simply ran out with nothing written.

use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior, params};
use serde::Serialize;

use crate::config::Granularity;
use crate::error::Result;
use crate::models::{Booking, BookingStatus};
use crate::utils::{get_setting, set_setting};

pub const LAST_SYNC_KEY: &str = "bike_availability_last_sync_date";

/// Whether `booking` keeps its bike busy at `now`.
pub fn is_active(booking: &Booking, now: NaiveDateTime, granularity: Granularity) -> bool {
    if booking.status != BookingStatus::Approved || !booking.is_paid || booking.is_rejected() {
        return false;
    }
    match granularity {
        Granularity::Date => {
            let today = now.date();
            booking.start_date <= today && today <= booking.end_date
        }
        Granularity::DateTime => booking.start() <= now && now < booking.end(),
    }
}

fn committed_bookings(conn: &Connection, ebike_id: i64) -> Result<Vec<Booking>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM bookings WHERE ebike_id=?1 AND status='approved' AND is_paid=1",
        Booking::COLUMNS
    ))?;
    let rows = stmt.query_map(params![ebike_id], Booking::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// What the flag should be for `ebike_id` at `now`.
pub fn derived_availability(
    conn: &Connection,
    ebike_id: i64,
    now: NaiveDateTime,
    granularity: Granularity,
) -> Result<bool> {
    let busy = committed_bookings(conn, ebike_id)?
        .iter()
        .any(|b| is_active(b, now, granularity));
    Ok(!busy)
}

/// Recompute one bike and persist only on change. Returns whether a write
/// happened. Callers mutating bookings pass their open transaction.
pub fn recompute(
    conn: &Connection,
    ebike_id: i64,
    now: NaiveDateTime,
    granularity: Granularity,
) -> Result<bool> {
    let available = derived_availability(conn, ebike_id, now, granularity)?;
    let changed = conn.execute(
        "UPDATE ebikes SET is_available=?1 WHERE id=?2 AND is_available<>?1",
        params![available, ebike_id],
    )?;
    if changed > 0 {
        tracing::info!(ebike_id, available, "bike availability updated");
    }
    Ok(changed > 0)
}

/// Full fleet sweep in one transaction. Returns the number of bikes whose
/// flag changed and stamps the last-sync date.
pub fn sync_all(
    conn: &mut Connection,
    now: NaiveDateTime,
    granularity: Granularity,
) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let ids: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT id FROM ebikes ORDER BY id")?;
        let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    let mut updated = 0;
    for id in ids {
        if recompute(&tx, id, now, granularity)? {
            updated += 1;
        }
    }
    set_setting(&tx, LAST_SYNC_KEY, &now.date().to_string())?;
    tx.commit()?;
    tracing::info!(updated, "availability sweep complete");
    Ok(updated)
}

pub fn last_sync_date(conn: &Connection) -> Result<Option<String>> {
    Ok(get_setting(conn, LAST_SYNC_KEY)?)
}

/// Daily safety net run ahead of ordinary requests: sweeps at most once
/// per calendar day. Never fails; problems are logged.
pub fn sync_if_due(
    conn: &mut Connection,
    now: NaiveDateTime,
    granularity: Granularity,
) -> Option<usize> {
    let today = now.date().to_string();
    match last_sync_date(conn) {
        Ok(Some(last)) if last == today => return None,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "could not read last availability sync date");
            return None;
        }
    }
    match sync_all(conn, now, granularity) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::error!(error = %e, "daily availability sync failed");
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Divergence {
    pub ebike_id: i64,
    pub stored: bool,
    pub derived: bool,
}

/// Bikes whose stored flag disagrees with the derived truth. Read only.
pub fn divergences(
    conn: &Connection,
    now: NaiveDateTime,
    granularity: Granularity,
) -> Result<Vec<Divergence>> {
    let mut stmt = conn.prepare("SELECT id, is_available FROM ebikes ORDER BY id")?;
    let bikes: Vec<(i64, bool)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;
    let mut out = Vec::new();
    for (id, stored) in bikes {
        let derived = derived_availability(conn, id, now, granularity)?;
        if derived != stored {
            out.push(Divergence {
                ebike_id: id,
                stored,
                derived,
            });
        }
    }
    Ok(out)
}
