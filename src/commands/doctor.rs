// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::params;

use super::Session;
use crate::availability;
use crate::models::BookingStatus;
use crate::utils::pretty_table;

pub fn handle(s: &mut Session<'_>) -> Result<()> {
    let mut rows = Vec::new();

    // 1) availability flags that disagree with the bookings
    for d in availability::divergences(s.conn, s.ctx.now, s.ctx.rules.availability)? {
        rows.push(vec![
            "availability_drift".into(),
            format!(
                "e-bike #{} stored={} derived={}",
                d.ebike_id, d.stored, d.derived
            ),
        ]);
    }

    // 2) paid bookings that never left the unpaid state
    {
        let mut stmt = s
            .conn
            .prepare("SELECT id FROM bookings WHERE is_paid=1 AND status=?1 ORDER BY id")?;
        let mut cur = stmt.query(params![BookingStatus::Pending])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            rows.push(vec!["paid_but_pending".into(), format!("booking #{}", id)]);
        }
    }

    // 3) last sweep
    match availability::last_sync_date(s.conn)? {
        Some(d) if d == s.ctx.now.date().to_string() => {}
        Some(d) => rows.push(vec!["stale_sweep".into(), format!("last run {}", d)]),
        None => rows.push(vec!["stale_sweep".into(), "never run".into()]),
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
