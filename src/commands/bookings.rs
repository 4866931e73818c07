// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{Session, arg, id_arg, json_flags, opt_arg};
use crate::bookings::{self, BookingRequest, Schedule};
use crate::models::Booking;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_time, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(s, sub)?,
        Some(("list", sub)) => list(s, sub)?,
        Some(("show", sub)) => show(s, sub)?,
        Some(("approve", sub)) => {
            let actor = s.actor()?;
            let b = bookings::approve(s.conn, &s.ctx, &actor, id_arg(sub, "id")?)?;
            println!("Booking #{} approved", b.id);
        }
        Some(("reject", sub)) => {
            let actor = s.actor()?;
            let b = bookings::reject(s.conn, &s.ctx, &actor, id_arg(sub, "id")?)?;
            println!("Booking #{} rejected", b.id);
        }
        Some(("cancel", sub)) => {
            let actor = s.actor()?;
            let b = bookings::cancel(s.conn, &s.ctx, &actor, id_arg(sub, "id")?)?;
            println!("Booking #{} cancelled", b.id);
        }
        Some(("delete", sub)) => {
            let (actor, id) = (s.actor()?, id_arg(sub, "id")?);
            bookings::delete(s.conn, &s.ctx, &actor, id)?;
            println!("Booking #{} deleted", id);
        }
        Some(("reschedule", sub)) => {
            let actor = s.actor()?;
            let b = bookings::reschedule(
                s.conn,
                &s.ctx,
                &actor,
                id_arg(sub, "id")?,
                schedule(sub)?,
            )?;
            println!(
                "Booking #{} moved to {} .. {}, now {}",
                b.id,
                b.start(),
                b.end(),
                fmt_money(&b.total_price)
            );
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn schedule(sub: &clap::ArgMatches) -> Result<Schedule> {
    Ok(Schedule {
        start_date: parse_date(arg(sub, "start-date")?)?,
        start_time: opt_arg(sub, "start-time").map(parse_time).transpose()?,
        end_date: parse_date(arg(sub, "end-date")?)?,
        end_time: opt_arg(sub, "end-time").map(parse_time).transpose()?,
    })
}

fn create(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let req = BookingRequest {
        ebike_id: id_arg(sub, "bike")?,
        schedule: schedule(sub)?,
    };
    let b = bookings::create(s.conn, &s.ctx, &actor, req)?;
    println!(
        "Booking #{} created for {} day(s): {} (pay to confirm)",
        b.id,
        b.days(),
        fmt_money(&b.total_price)
    );
    Ok(())
}

fn row(b: Booking) -> Vec<String> {
    vec![
        b.id.to_string(),
        b.ebike_id.to_string(),
        b.rider_id.to_string(),
        b.start().format("%Y-%m-%d %H:%M").to_string(),
        b.end().format("%Y-%m-%d %H:%M").to_string(),
        fmt_money(&b.total_price),
        b.status.to_string(),
        if b.is_paid { "paid" } else { "unpaid" }.to_string(),
    ]
}

const HEADERS: [&str; 8] = ["ID", "Bike", "Rider", "Start", "End", "Total", "Status", "Payment"];

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let all = bookings::list_for(s.conn, &s.actor()?)?;
    if !maybe_print_json(json_flag, jsonl_flag, &all)? {
        println!(
            "{}",
            pretty_table(&HEADERS, all.into_iter().map(row).collect())
        );
    }
    Ok(())
}

fn show(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let b = bookings::get_for(s.conn, &s.actor()?, id_arg(sub, "id")?)?;
    if !maybe_print_json(json_flag, jsonl_flag, &b)? {
        println!("{}", pretty_table(&HEADERS, vec![row(b)]));
    }
    Ok(())
}
