// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{Session, id_arg, json_flags};
use crate::receipts;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("booking", sub)) => booking(s, sub)?,
        Some(("withdrawal", sub)) => withdrawal(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn booking(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let r = receipts::booking(s.conn, &s.actor()?, id_arg(sub, "id")?)?;
    if maybe_print_json(json_flag, jsonl_flag, &r)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Receipt".into(), r.receipt_no],
        vec!["Rider".into(), r.rider],
        vec!["E-bike".into(), format!("{} (provider {})", r.ebike, r.provider)],
        vec!["Pickup".into(), format!("{} {}", r.start_date, r.start_time.format("%H:%M"))],
        vec!["Return".into(), format!("{} {}", r.end_date, r.end_time.format("%H:%M"))],
        vec![
            "Rate".into(),
            format!("{} x {} day(s)", fmt_money(&r.price_per_day), r.days),
        ],
        vec!["Total paid".into(), fmt_money(&r.total_price)],
        vec!["Payment ID".into(), r.payment_id.unwrap_or_default()],
        vec!["Order ID".into(), r.order_id.unwrap_or_default()],
    ];
    println!("{}", pretty_table(&["Booking receipt", ""], rows));
    Ok(())
}

fn withdrawal(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let r = receipts::withdrawal(s.conn, &s.actor()?, id_arg(sub, "id")?)?;
    if maybe_print_json(json_flag, jsonl_flag, &r)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Receipt".into(), r.receipt_no],
        vec!["Provider".into(), r.provider],
        vec!["Amount".into(), fmt_money(&r.amount)],
        vec!["Paid to".into(), r.destination],
        vec!["Transaction ID".into(), r.transaction_id.unwrap_or_default()],
        vec![
            "Requested".into(),
            r.requested_at.format("%Y-%m-%d %H:%M").to_string(),
        ],
        vec![
            "Processed".into(),
            r.processed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        ],
        vec!["Processed by".into(), r.processed_by.unwrap_or_default()],
    ];
    println!("{}", pretty_table(&["Withdrawal receipt", ""], rows));
    Ok(())
}
