// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Provider earnings and withdrawable balance.
//!
//! The balance is never stored; it is derived on every call from the
//! provider's bookings and withdrawals:
//!
//! ```text
//! total_earnings   = Σ total_price of approved bookings
//! platform_charges = total_earnings × fee_rate            (2 dp, banker's rounding)
//! net_earnings     = total_earnings − platform_charges − Σ completed withdrawals
//! exposure         = Σ pending + approved withdrawals
//! available        = max(net_earnings − exposure, 0) − registration fee (if unpaid)
//! ```

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::Rules;
use crate::error::Result;
use crate::models::{BookingStatus, User, WithdrawalStatus};
use crate::users;
use crate::utils::decimal_col;

#[derive(Debug, Clone, Copy)]
pub struct EarningEntry {
    pub status: BookingStatus,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct PayoutEntry {
    pub status: WithdrawalStatus,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Available,
    /// Earnings do not yet cover the unpaid registration fee.
    RegistrationFeeDue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ledger {
    pub total_earnings: Decimal,
    pub platform_charges: Decimal,
    pub net_earnings: Decimal,
    pub withdrawn_total: Decimal,
    pub pending_withdrawal_exposure: Decimal,
    pub registration_fee_withheld: Decimal,
    pub available_balance: Decimal,
    pub status: BalanceStatus,
}

pub fn compute(
    bookings: &[EarningEntry],
    withdrawals: &[PayoutEntry],
    registration_fee_paid: bool,
    rules: &Rules,
) -> Ledger {
    let total_earnings: Decimal = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Approved)
        .map(|b| b.total_price)
        .sum();
    let platform_charges = (total_earnings * rules.platform_fee_rate).round_dp(2);

    let withdrawn_total: Decimal = withdrawals
        .iter()
        .filter(|w| w.status == WithdrawalStatus::Completed)
        .map(|w| w.amount)
        .sum();
    let pending_withdrawal_exposure: Decimal = withdrawals
        .iter()
        .filter(|w| w.status.is_outstanding())
        .map(|w| w.amount)
        .sum();

    let net_earnings = total_earnings - platform_charges - withdrawn_total;
    let free = (net_earnings - pending_withdrawal_exposure).max(Decimal::ZERO);

    let (available_balance, registration_fee_withheld, status) = if registration_fee_paid {
        (free, Decimal::ZERO, BalanceStatus::Available)
    } else if free >= rules.registration_fee {
        (
            free - rules.registration_fee,
            rules.registration_fee,
            BalanceStatus::Available,
        )
    } else {
        (Decimal::ZERO, free, BalanceStatus::RegistrationFeeDue)
    };

    Ledger {
        total_earnings,
        platform_charges,
        net_earnings,
        withdrawn_total,
        pending_withdrawal_exposure,
        registration_fee_withheld,
        available_balance,
        status,
    }
}

fn earning_entries(conn: &Connection, provider_id: i64) -> Result<Vec<EarningEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT b.status, b.total_price FROM bookings b
         JOIN ebikes e ON b.ebike_id=e.id
         WHERE e.provider_id=?1",
    )?;
    let rows = stmt.query_map(params![provider_id], |r| {
        Ok(EarningEntry {
            status: r.get(0)?,
            total_price: decimal_col(r, 1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

fn payout_entries(conn: &Connection, provider_id: i64) -> Result<Vec<PayoutEntry>> {
    let mut stmt =
        conn.prepare_cached("SELECT status, amount FROM withdrawals WHERE provider_id=?1")?;
    let rows = stmt.query_map(params![provider_id], |r| {
        Ok(PayoutEntry {
            status: r.get(0)?,
            amount: decimal_col(r, 1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Ledger for one provider from the current rows. Pass an open
/// transaction when the result guards a write.
pub fn for_provider(conn: &Connection, provider_id: i64, rules: &Rules) -> Result<Ledger> {
    let provider = users::get(conn, provider_id)?;
    let bookings = earning_entries(conn, provider_id)?;
    let withdrawals = payout_entries(conn, provider_id)?;
    Ok(compute(
        &bookings,
        &withdrawals,
        provider.registration_fee_paid,
        rules,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider_id: i64,
    pub username: String,
    pub ledger: Ledger,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformSummary {
    pub providers: Vec<ProviderSummary>,
    pub total_provider_earnings: Decimal,
    pub total_platform_charges: Decimal,
}

/// Admin dashboard view across every provider.
pub fn summary(conn: &Connection, rules: &Rules) -> Result<PlatformSummary> {
    let mut providers = Vec::new();
    let mut total_provider_earnings = Decimal::ZERO;
    let mut total_platform_charges = Decimal::ZERO;
    for User { id, username, .. } in users::providers(conn)? {
        let ledger = for_provider(conn, id, rules)?;
        total_provider_earnings += ledger.total_earnings;
        total_platform_charges += ledger.platform_charges;
        providers.push(ProviderSummary {
            provider_id: id,
            username,
            ledger,
        });
    }
    Ok(PlatformSummary {
        providers,
        total_provider_earnings,
        total_platform_charges,
    })
}
