// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod bikes;
pub mod bookings;
pub mod doctor;
pub mod documents;
pub mod earnings;
pub mod notifications;
pub mod payments;
pub mod receipts;
pub mod sync;
pub mod users;
pub mod withdrawals;

use anyhow::{Context as _, Result, anyhow};
use rusqlite::Connection;

use crate::context::Context;
use crate::gateway::{PaymentGateway, SignatureVerifier};
use crate::models::Actor;

/// Everything a command handler works with for one invocation.
pub struct Session<'a> {
    pub conn: &'a mut Connection,
    pub ctx: Context<'a>,
    pub actor: Option<Actor>,
    pub gateway: &'a dyn PaymentGateway,
    pub verifier: &'a SignatureVerifier,
    pub currency: &'a str,
}

impl Session<'_> {
    pub fn actor(&self) -> Result<Actor> {
        self.actor
            .ok_or_else(|| anyhow!("This command needs --as <username>"))
    }
}

pub(crate) fn arg<'m>(m: &'m clap::ArgMatches, name: &str) -> Result<&'m str> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .with_context(|| format!("Missing --{}", name))
}

pub(crate) fn opt_arg<'m>(m: &'m clap::ArgMatches, name: &str) -> Option<&'m str> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

pub(crate) fn id_arg(m: &clap::ArgMatches, name: &str) -> Result<i64> {
    let raw = arg(m, name)?;
    raw.parse()
        .with_context(|| format!("Invalid --{} '{}', expected a number", name, raw))
}

pub(crate) fn json_flags(m: &clap::ArgMatches) -> (bool, bool) {
    (m.get_flag("json"), m.get_flag("jsonl"))
}
