// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::process::ExitCode;

use anyhow::{Result, anyhow};

use ebike_rental::commands::{self, Session};
use ebike_rental::config::AppConfig;
use ebike_rental::context::Context;
use ebike_rental::gateway::{RazorpayClient, SignatureVerifier};
use ebike_rental::notify::InAppNotifier;
use ebike_rental::{Error, availability, cli, db, logging, users, utils};

fn run() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init(&config.log_filter);

    let matches = cli::build_cli().get_matches();
    let db_override = config.database_path.as_deref();
    let mut conn = db::open_or_init(db_override)?;
    let now = utils::now();

    // once-a-day safety net; never blocks the command
    availability::sync_if_due(&mut conn, now, config.rules.availability);

    let actor = match matches.get_one::<String>("as").map(|s| s.trim()) {
        Some(name) if !name.is_empty() => Some(
            users::find_by_username(&conn, name)?
                .ok_or_else(|| anyhow!("User '{}' not found", name))?
                .actor(),
        ),
        _ => None,
    };

    let notifier = InAppNotifier;
    let gateway = RazorpayClient::new(config.razorpay.clone());
    let verifier = SignatureVerifier::from_config(&config.razorpay);
    let mut session = Session {
        conn: &mut conn,
        ctx: Context::new(&config.rules, &notifier, now),
        actor,
        gateway: &gateway,
        verifier: &verifier,
        currency: &config.razorpay.currency,
    };

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path(db_override)?.display());
        }
        Some(("user", sub)) => commands::users::handle(&mut session, sub)?,
        Some(("bike", sub)) => commands::bikes::handle(&mut session, sub)?,
        Some(("booking", sub)) => commands::bookings::handle(&mut session, sub)?,
        Some(("pay", sub)) => commands::payments::handle(&mut session, sub)?,
        Some(("withdrawal", sub)) => commands::withdrawals::handle(&mut session, sub)?,
        Some(("earnings", sub)) => commands::earnings::handle(&mut session, sub)?,
        Some(("document", sub)) => commands::documents::handle(&mut session, sub)?,
        Some(("notifications", sub)) => commands::notifications::handle(&mut session, sub)?,
        Some(("receipt", sub)) => commands::receipts::handle(&mut session, sub)?,
        Some(("sync-bike-availability", sub)) => commands::sync::handle(&mut session, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&mut session)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(e) => {
                    tracing::debug!(error = ?e, "command failed");
                    eprintln!("error: {}", e.user_message());
                }
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
