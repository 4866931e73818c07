// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};

use super::{Session, json_flags, opt_arg};
use crate::ledger::{self, BalanceStatus, Ledger};
use crate::users::require_admin;
use crate::utils::{fmt_money, id_for_user, maybe_print_json, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(s, sub)?,
        Some(("summary", sub)) => summary(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn ledger_rows(l: &Ledger) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["Total earnings".into(), fmt_money(&l.total_earnings)],
        vec!["Platform charges".into(), fmt_money(&l.platform_charges)],
        vec!["Withdrawn".into(), fmt_money(&l.withdrawn_total)],
        vec!["Net earnings".into(), fmt_money(&l.net_earnings)],
        vec![
            "Pending withdrawals".into(),
            fmt_money(&l.pending_withdrawal_exposure),
        ],
    ];
    if !l.registration_fee_withheld.is_zero() || l.status == BalanceStatus::RegistrationFeeDue {
        rows.push(vec![
            "Registration fee withheld".into(),
            fmt_money(&l.registration_fee_withheld),
        ]);
    }
    rows.push(vec!["Available".into(), fmt_money(&l.available_balance)]);
    rows
}

fn show(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let actor = s.actor()?;
    let provider_id = match opt_arg(sub, "provider") {
        Some(name) => {
            require_admin(&actor)?;
            id_for_user(s.conn, name)?
        }
        None if actor.is_provider => actor.user_id,
        None => bail!("Only vehicle providers have earnings; admins pass --provider"),
    };
    let l = ledger::for_provider(s.conn, provider_id, s.ctx.rules)?;
    if maybe_print_json(json_flag, jsonl_flag, &l)? {
        return Ok(());
    }
    println!("{}", pretty_table(&["", "Amount"], ledger_rows(&l)));
    if l.status == BalanceStatus::RegistrationFeeDue {
        println!(
            "Withdrawals open once earnings cover the {} registration fee.",
            fmt_money(&s.ctx.rules.registration_fee)
        );
    }
    Ok(())
}

fn summary(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    require_admin(&s.actor()?)?;
    let report = ledger::summary(s.conn, s.ctx.rules)?;
    if maybe_print_json(json_flag, jsonl_flag, &report)? {
        return Ok(());
    }
    let mut rows: Vec<Vec<String>> = report
        .providers
        .iter()
        .map(|p| {
            vec![
                p.username.clone(),
                fmt_money(&p.ledger.total_earnings),
                fmt_money(&p.ledger.platform_charges),
                fmt_money(&p.ledger.available_balance),
            ]
        })
        .collect();
    rows.push(vec![
        "TOTAL".into(),
        fmt_money(&report.total_provider_earnings),
        fmt_money(&report.total_platform_charges),
        String::new(),
    ]);
    println!(
        "{}",
        pretty_table(&["Provider", "Earnings", "Platform", "Available"], rows)
    );
    Ok(())
}
