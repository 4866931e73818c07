// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Provider payouts: `pending -> approved | rejected`, `approved -> completed`.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::context::Context;
use crate::error::{Error, FieldErrors, Result};
use crate::ledger;
use crate::models::{Actor, PayoutDestination, Withdrawal, WithdrawalStatus};
use crate::notify::{self, Notice};
use crate::users::{self, require_admin};
use crate::utils::fmt_money;

static IFSC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("IFSC pattern compiles"));
static UPI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]{2,256}@[A-Za-z][A-Za-z0-9.]{1,63}$")
        .expect("UPI pattern compiles")
});

const PROVIDER_LINK: &str = "/vehicle-providers/earnings/";
const ADMIN_LINK: &str = "/admin-dashboard/#withdrawals";

/// Trim the destination and check it matches its declared transfer type.
/// Bank details are upper-cased where the format demands it.
pub fn normalize_payout(payout: PayoutDestination) -> Result<PayoutDestination> {
    let mut errs = FieldErrors::new();
    let payout = match payout {
        PayoutDestination::Bank {
            account_holder_name,
            account_number,
            ifsc_code,
            bank_name,
        } => {
            let account_holder_name = account_holder_name.trim().to_string();
            let account_number = account_number.trim().to_string();
            let ifsc_code = ifsc_code.trim().to_ascii_uppercase();
            let bank_name = bank_name.trim().to_string();
            for (field, value) in [
                ("account_holder_name", &account_holder_name),
                ("account_number", &account_number),
                ("ifsc_code", &ifsc_code),
                ("bank_name", &bank_name),
            ] {
                if value.is_empty() {
                    errs.add(field, "This field is required for bank transfer.");
                }
            }
            if !ifsc_code.is_empty() && !IFSC.is_match(&ifsc_code) {
                errs.add("ifsc_code", "Enter a valid 11-character IFSC code.");
            }
            if !account_number.is_empty() && !account_number.chars().all(|c| c.is_ascii_digit()) {
                errs.add("account_number", "Account number must contain digits only.");
            }
            PayoutDestination::Bank {
                account_holder_name,
                account_number,
                ifsc_code,
                bank_name,
            }
        }
        PayoutDestination::Upi { upi_id } => {
            let upi_id = upi_id.trim().to_string();
            if upi_id.is_empty() {
                errs.add("upi_id", "UPI ID is required for UPI transfer.");
            } else if !UPI.is_match(&upi_id) {
                errs.add("upi_id", "Enter a valid UPI ID (e.g., name@bank).");
            }
            PayoutDestination::Upi { upi_id }
        }
    };
    errs.into_result()?;
    Ok(payout)
}

pub(crate) fn load(conn: &Connection, id: i64) -> Result<Withdrawal> {
    conn.query_row(
        &format!("SELECT {} FROM withdrawals WHERE id=?1", Withdrawal::COLUMNS),
        params![id],
        Withdrawal::from_row,
    )
    .optional()?
    .ok_or(Error::NotFound {
        entity: "withdrawal",
        id,
    })
}

/// Withdrawal visible to `actor`: their own, or any for an admin.
pub fn get_for(conn: &Connection, actor: &Actor, id: i64) -> Result<Withdrawal> {
    match load(conn, id) {
        Ok(w) if actor.is_admin() || w.provider_id == actor.user_id => Ok(w),
        Ok(_) => Err(Error::NotPermitted),
        Err(Error::NotFound { .. }) if !actor.is_admin() => Err(Error::NotPermitted),
        Err(e) => Err(e),
    }
}

pub fn list_for(conn: &Connection, actor: &Actor) -> Result<Vec<Withdrawal>> {
    let mut sql = format!("SELECT {} FROM withdrawals", Withdrawal::COLUMNS);
    if !actor.is_admin() {
        sql.push_str(" WHERE provider_id=?1");
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = if actor.is_admin() {
        stmt.query_map([], Withdrawal::from_row)?
    } else {
        stmt.query_map(params![actor.user_id], Withdrawal::from_row)?
    };
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Provider asks for a payout. The balance check and the insert share one
/// write transaction so two concurrent requests cannot both spend the
/// same balance.
pub fn request(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    amount: Decimal,
    payout: PayoutDestination,
) -> Result<Withdrawal> {
    if !actor.is_provider {
        return Err(Error::NotPermitted);
    }
    let payout = normalize_payout(payout);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let balance = ledger::for_provider(&tx, actor.user_id, ctx.rules)?;

    let mut errs = match &payout {
        Err(Error::Validation(e)) => e.clone(),
        _ => FieldErrors::new(),
    };
    if amount <= Decimal::ZERO {
        errs.add("amount", "Amount must be greater than 0");
    } else if amount.normalize().scale() > 2 {
        errs.add("amount", "Ensure that there are no more than 2 decimal places.");
    } else if amount < ctx.rules.min_withdrawal {
        errs.add(
            "amount",
            format!("Minimum withdrawal amount is {}", fmt_whole(ctx.rules.min_withdrawal)),
        );
    } else if amount > balance.available_balance {
        errs.add(
            "amount",
            format!(
                "Insufficient balance. Available: {}",
                fmt_money(&balance.available_balance)
            ),
        );
    }
    if !errs.is_empty() {
        tracing::info!(
            provider_id = actor.user_id,
            %amount,
            available = %balance.available_balance,
            "withdrawal request refused"
        );
        return Err(Error::Validation(errs));
    }
    let payout = payout?;

    let (holder, number, ifsc, bank, upi) = match &payout {
        PayoutDestination::Bank {
            account_holder_name,
            account_number,
            ifsc_code,
            bank_name,
        } => (
            Some(account_holder_name.as_str()),
            Some(account_number.as_str()),
            Some(ifsc_code.as_str()),
            Some(bank_name.as_str()),
            None,
        ),
        PayoutDestination::Upi { upi_id } => (None, None, None, None, Some(upi_id.as_str())),
    };
    tx.execute(
        "INSERT INTO withdrawals(provider_id, amount, transfer_type, account_holder_name, account_number,
                                 ifsc_code, bank_name, upi_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            actor.user_id,
            amount.to_string(),
            payout.transfer_type(),
            holder,
            number,
            ifsc,
            bank,
            upi,
            WithdrawalStatus::Pending,
            ctx.now
        ],
    )?;
    let id = tx.last_insert_rowid();
    let withdrawal = load(&tx, id)?;
    let provider = users::get(&tx, actor.user_id)?;
    tx.commit()?;

    tracing::info!(
        withdrawal_id = id,
        provider_id = actor.user_id,
        %amount,
        transfer = %payout.transfer_type(),
        "withdrawal requested"
    );
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_admins(
            format!(
                "New withdrawal request of {} from {}.",
                fmt_money(&amount),
                provider.username
            ),
            ADMIN_LINK,
        )],
    );
    Ok(withdrawal)
}

fn fmt_whole(d: Decimal) -> String {
    if d.fract().is_zero() {
        format!("₹{}", d.trunc())
    } else {
        fmt_money(&d)
    }
}

#[allow(clippy::too_many_arguments)]
fn transition(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    withdrawal_id: i64,
    from: WithdrawalStatus,
    to: WithdrawalStatus,
    action: &'static str,
    notes: Option<&str>,
    transaction_id: Option<&str>,
) -> Result<Withdrawal> {
    require_admin(actor)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = load(&tx, withdrawal_id)?;
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    let n = tx.execute(
        "UPDATE withdrawals
         SET status=?1, admin_notes=COALESCE(?2, admin_notes), processed_by=?3, processed_at=?4,
             transaction_id=COALESCE(?5, transaction_id), updated_at=?4
         WHERE id=?6 AND status=?7",
        params![to, notes, actor.user_id, ctx.now, transaction_id, withdrawal_id, from],
    )?;
    if n == 0 {
        return Err(Error::InvalidTransition {
            entity: "withdrawal",
            id: withdrawal_id,
            state: current.status.to_string(),
            action,
        });
    }
    let updated = load(&tx, withdrawal_id)?;
    tx.commit()?;

    tracing::info!(withdrawal_id, status = %to, admin_id = actor.user_id, "withdrawal processed");
    let amount = fmt_money(&updated.amount);
    let message = match to {
        WithdrawalStatus::Approved => {
            format!("Your withdrawal request of {} has been approved.", amount)
        }
        WithdrawalStatus::Rejected => match notes {
            Some(n) => format!("Your withdrawal request of {} was rejected: {}", amount, n),
            None => format!("Your withdrawal request of {} was rejected.", amount),
        },
        _ => format!(
            "Your withdrawal of {} has been completed. Transaction ID: {}",
            amount,
            updated.transaction_id.as_deref().unwrap_or_default()
        ),
    };
    notify::dispatch(
        ctx.notifier,
        conn,
        &[Notice::to_user(updated.provider_id, message, PROVIDER_LINK)],
    );
    Ok(updated)
}

pub fn approve(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    withdrawal_id: i64,
    notes: Option<&str>,
) -> Result<Withdrawal> {
    transition(
        conn,
        ctx,
        actor,
        withdrawal_id,
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        "approve",
        notes,
        None,
    )
}

pub fn reject(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    withdrawal_id: i64,
    notes: Option<&str>,
) -> Result<Withdrawal> {
    transition(
        conn,
        ctx,
        actor,
        withdrawal_id,
        WithdrawalStatus::Pending,
        WithdrawalStatus::Rejected,
        "reject",
        notes,
        None,
    )
}

/// Funds have left the platform; `transaction_id` is the bank/UPI reference.
pub fn complete(
    conn: &mut Connection,
    ctx: &Context<'_>,
    actor: &Actor,
    withdrawal_id: i64,
    transaction_id: &str,
    notes: Option<&str>,
) -> Result<Withdrawal> {
    require_admin(actor)?;
    let transaction_id = transaction_id.trim();
    if transaction_id.is_empty() {
        return Err(Error::invalid(
            "transaction_id",
            "Transaction ID is required to complete a withdrawal.",
        ));
    }
    transition(
        conn,
        ctx,
        actor,
        withdrawal_id,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Completed,
        "complete",
        notes,
        Some(transaction_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(ifsc: &str) -> PayoutDestination {
        PayoutDestination::Bank {
            account_holder_name: " Asha Rao ".into(),
            account_number: "123456789012".into(),
            ifsc_code: ifsc.into(),
            bank_name: "HDFC Bank".into(),
        }
    }

    #[test]
    fn bank_payout_requires_every_field() {
        let err = normalize_payout(PayoutDestination::Bank {
            account_holder_name: "".into(),
            account_number: "".into(),
            ifsc_code: "".into(),
            bank_name: "".into(),
        })
        .unwrap_err();
        let errs = err.field_errors().unwrap();
        for f in ["account_holder_name", "account_number", "ifsc_code", "bank_name"] {
            assert!(errs.has(f), "missing error for {}", f);
        }
    }

    #[test]
    fn ifsc_is_uppercased_and_checked() {
        match normalize_payout(bank("hdfc0001234")).unwrap() {
            PayoutDestination::Bank {
                ifsc_code,
                account_holder_name,
                ..
            } => {
                assert_eq!(ifsc_code, "HDFC0001234");
                assert_eq!(account_holder_name, "Asha Rao");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(normalize_payout(bank("HDFC1234")).is_err());
    }

    #[test]
    fn upi_requires_an_id() {
        let err = normalize_payout(PayoutDestination::Upi { upi_id: "  ".into() }).unwrap_err();
        assert!(err.field_errors().unwrap().has("upi_id"));
        assert!(normalize_payout(PayoutDestination::Upi {
            upi_id: "asha@okhdfc".into()
        })
        .is_ok());
        assert!(normalize_payout(PayoutDestination::Upi {
            upi_id: "not-an-upi".into()
        })
        .is_err());
    }

    #[test]
    fn payout_patterns_match_only_well_formed_values() {
        assert!(IFSC.is_match("SBIN0001234"));
        assert!(!IFSC.is_match("SBIN1001234"));
        assert!(!IFSC.is_match("sbin0001234"));
        assert!(UPI.is_match("ravi.k@okaxis"));
        assert!(!UPI.is_match("ravi@"));
        assert!(!UPI.is_match("@okaxis"));
    }

    #[test]
    fn minimum_is_shown_without_paise() {
        assert_eq!(fmt_whole(Decimal::from(200)), "₹200");
        assert_eq!(fmt_whole(Decimal::new(19999, 2)), "₹199.99");
    }
}
