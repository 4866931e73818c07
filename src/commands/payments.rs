// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;

use anyhow::{Context, Result};

use super::{Session, arg, id_arg, json_flags};
use crate::bookings::PaymentOutcome;
use crate::payments::{self, CheckoutCallback, WebhookOutcome};
use crate::utils::maybe_print_json;

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("order", sub)) => order(s, sub)?,
        Some(("verify", sub)) => verify(s, sub)?,
        Some(("webhook", sub)) => webhook(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn order(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let actor = s.actor()?;
    let order = payments::create_order(
        s.conn,
        s.gateway,
        s.currency,
        &actor,
        id_arg(sub, "booking")?,
    )?;
    if !maybe_print_json(json_flag, jsonl_flag, &order)? {
        println!(
            "Order {} for booking #{}: {} {} (minor units)",
            order.order_id, order.booking_id, order.amount_minor, order.currency
        );
    }
    Ok(())
}

fn verify(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let actor = s.actor()?;
    let callback = CheckoutCallback {
        order_id: arg(sub, "order-id")?.to_string(),
        payment_id: arg(sub, "payment-id")?.to_string(),
        signature: arg(sub, "signature")?.to_string(),
    };
    let outcome = payments::verify(
        s.conn,
        &s.ctx,
        s.verifier,
        &actor,
        id_arg(sub, "booking")?,
        &callback,
    )?;
    match outcome {
        PaymentOutcome::Confirmed(b) => {
            println!("Payment received for booking #{}; awaiting approval", b.id)
        }
        PaymentOutcome::AlreadyPaid(b) => println!("Booking #{} was already paid", b.id),
    }
    Ok(())
}

fn webhook(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let path = arg(sub, "body-file")?;
    let body = fs::read(path).with_context(|| format!("Read webhook body from {}", path))?;
    let outcome =
        payments::handle_webhook(s.conn, &s.ctx, s.verifier, &body, arg(sub, "signature")?)?;
    match outcome {
        WebhookOutcome::Confirmed { booking_id } => {
            println!("Booking #{} marked paid", booking_id)
        }
        WebhookOutcome::AlreadyPaid { booking_id } => {
            println!("Booking #{} already paid; nothing to do", booking_id)
        }
        WebhookOutcome::Ignored { reason } => println!("Ignored: {}", reason),
    }
    Ok(())
}
