// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{Session, arg, json_flags, opt_arg};
use crate::bikes::{self, BikeFilter, NewBike};
use crate::utils::{fmt_money, id_for_user, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(s, sub)?,
        Some(("list", sub)) => list(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let bike = bikes::add(
        s.conn,
        &actor,
        NewBike {
            name: arg(sub, "name")?.to_string(),
            description: arg(sub, "description")?.to_string(),
            price_per_day: parse_decimal(arg(sub, "price-per-day")?)?,
            price_per_week: parse_decimal(arg(sub, "price-per-week")?)?,
            image: arg(sub, "image")?.to_string(),
        },
    )?;
    println!(
        "Listed '{}' (id {}) at {}/day",
        bike.name,
        bike.id,
        fmt_money(&bike.price_per_day)
    );
    Ok(())
}

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let provider_id = match opt_arg(sub, "provider") {
        Some(name) => Some(id_for_user(s.conn, name)?),
        None => None,
    };
    let all = bikes::list(
        s.conn,
        BikeFilter {
            provider_id,
            available_only: sub.get_flag("available"),
        },
    )?;
    if maybe_print_json(json_flag, jsonl_flag, &all)? {
        return Ok(());
    }
    let rows = all
        .into_iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.name,
                fmt_money(&b.price_per_day),
                fmt_money(&b.price_per_week),
                b.provider_id.to_string(),
                if b.is_available { "yes" } else { "booked" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Name", "Per day", "Per week", "Provider", "Available"],
            rows
        )
    );
    Ok(())
}
