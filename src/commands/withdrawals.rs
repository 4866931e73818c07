// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{Session, arg, id_arg, json_flags, opt_arg};
use crate::models::PayoutDestination;
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use crate::withdrawals;

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("request", sub)) => request(s, sub)?,
        Some(("list", sub)) => list(s, sub)?,
        Some(("approve", sub)) => {
            let actor = s.actor()?;
            let w = withdrawals::approve(
                s.conn,
                &s.ctx,
                &actor,
                id_arg(sub, "id")?,
                opt_arg(sub, "notes"),
            )?;
            println!("Withdrawal #{} approved", w.id);
        }
        Some(("reject", sub)) => {
            let actor = s.actor()?;
            let w = withdrawals::reject(
                s.conn,
                &s.ctx,
                &actor,
                id_arg(sub, "id")?,
                opt_arg(sub, "notes"),
            )?;
            println!("Withdrawal #{} rejected", w.id);
        }
        Some(("complete", sub)) => {
            let actor = s.actor()?;
            let w = withdrawals::complete(
                s.conn,
                &s.ctx,
                &actor,
                id_arg(sub, "id")?,
                arg(sub, "transaction-id")?,
                opt_arg(sub, "notes"),
            )?;
            println!(
                "Withdrawal #{} completed ({})",
                w.id,
                w.transaction_id.unwrap_or_default()
            );
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn payout(sub: &clap::ArgMatches) -> Result<PayoutDestination> {
    let text = |name: &str| opt_arg(sub, name).unwrap_or_default().to_string();
    Ok(match arg(sub, "transfer-type")? {
        "upi" => PayoutDestination::Upi {
            upi_id: text("upi-id"),
        },
        _ => PayoutDestination::Bank {
            account_holder_name: text("account-holder-name"),
            account_number: text("account-number"),
            ifsc_code: text("ifsc-code"),
            bank_name: text("bank-name"),
        },
    })
}

fn request(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let amount = parse_decimal(arg(sub, "amount")?)?;
    let w = withdrawals::request(s.conn, &s.ctx, &actor, amount, payout(sub)?)?;
    println!(
        "Withdrawal #{} of {} requested to {}",
        w.id,
        fmt_money(&w.amount),
        w.payout.describe()
    );
    Ok(())
}

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let all = withdrawals::list_for(s.conn, &s.actor()?)?;
    if maybe_print_json(json_flag, jsonl_flag, &all)? {
        return Ok(());
    }
    let rows = all
        .into_iter()
        .map(|w| {
            vec![
                w.id.to_string(),
                w.provider_id.to_string(),
                fmt_money(&w.amount),
                w.payout.describe(),
                w.status.to_string(),
                w.created_at.format("%Y-%m-%d %H:%M").to_string(),
                w.transaction_id.unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Provider", "Amount", "Destination", "Status", "Requested", "Txn"],
            rows
        )
    );
    Ok(())
}
