// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};

use super::{Session, arg, json_flags, opt_arg};
use crate::users::{self, Role};
use crate::utils::{id_for_user, maybe_print_json, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(s, sub)?,
        Some(("list", sub)) => list(s, sub)?,
        Some(("verify", sub)) => verify(s, sub)?,
        Some(("fee-paid", sub)) => fee_paid(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let role: Role = arg(sub, "role")?.parse().map_err(|e: String| anyhow!(e))?;
    let user = users::create(s.conn, arg(sub, "username")?, arg(sub, "email")?, role)?;
    println!("Added {:?} '{}' (id {})", role, user.username, user.id);
    Ok(())
}

fn yes(b: bool) -> String {
    if b { "yes".into() } else { "".into() }
}

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let all = users::list(s.conn)?;
    if maybe_print_json(json_flag, jsonl_flag, &all)? {
        return Ok(());
    }
    let rows = all
        .into_iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.username,
                u.email,
                yes(u.is_rider),
                yes(u.is_vehicle_provider),
                yes(u.is_verified_provider),
                yes(u.registration_fee_paid),
                yes(u.is_staff),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Username", "Email", "Rider", "Provider", "Verified", "Fee paid", "Admin"],
            rows
        )
    );
    Ok(())
}

fn verify(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let provider_id = id_for_user(s.conn, arg(sub, "provider")?)?;
    let verified = !sub.get_flag("revoke");
    let user = users::set_provider_verified(
        s.conn,
        s.ctx.notifier,
        &actor,
        provider_id,
        verified,
        opt_arg(sub, "notes"),
    )?;
    if user.is_verified_provider {
        println!("Provider '{}' verified", user.username);
    } else {
        println!("Provider '{}' verification revoked", user.username);
    }
    Ok(())
}

fn fee_paid(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let provider_id = id_for_user(s.conn, arg(sub, "provider")?)?;
    let user = users::mark_registration_fee_paid(s.conn, &actor, provider_id, s.ctx.now)?;
    println!("Registration fee recorded for '{}'", user.username);
    Ok(())
}
