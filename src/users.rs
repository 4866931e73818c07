// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, FieldErrors, Result};
use crate::models::{Actor, User};
use crate::notify::{self, Notice, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Rider,
    Provider,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rider" => Ok(Role::Rider),
            "provider" | "vehicle_provider" => Ok(Role::Provider),
            "admin" | "staff" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Error::NotPermitted)
    }
}

pub fn create(conn: &Connection, username: &str, email: &str, role: Role) -> Result<User> {
    let username = username.trim();
    let mut errs = FieldErrors::new();
    if username.is_empty() {
        errs.add("username", "This field is required.");
    }
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE username=?1",
            params![username],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        errs.add("username", "A user with that username already exists.");
    }
    errs.into_result()?;

    conn.execute(
        "INSERT INTO users(username, email, is_rider, is_vehicle_provider, is_staff)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            username,
            email.trim(),
            role == Role::Rider,
            role == Role::Provider,
            role == Role::Admin
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, username, ?role, "user created");
    get(conn, id)
}

pub fn get(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id=?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()?
    .ok_or(Error::NotFound { entity: "user", id })
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username=?1", User::COLUMNS),
            params![username.trim()],
            User::from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY username",
        User::COLUMNS
    ))?;
    let rows = stmt.query_map([], User::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn providers(conn: &Connection) -> Result<Vec<User>> {
    Ok(list(conn)?
        .into_iter()
        .filter(|u| u.is_vehicle_provider)
        .collect())
}

fn provider(conn: &Connection, provider_id: i64) -> Result<User> {
    let user = get(conn, provider_id)?;
    if !user.is_vehicle_provider {
        return Err(Error::invalid("provider", "User is not a vehicle provider."));
    }
    Ok(user)
}

/// Admin decision on whether a provider may list bikes.
pub fn set_provider_verified(
    conn: &Connection,
    notifier: &dyn Notifier,
    actor: &Actor,
    provider_id: i64,
    verified: bool,
    notes: Option<&str>,
) -> Result<User> {
    require_admin(actor)?;
    let user = provider(conn, provider_id)?;
    conn.execute(
        "UPDATE users SET is_verified_provider=?1, verification_notes=?2 WHERE id=?3",
        params![verified, notes, user.id],
    )?;
    tracing::info!(
        provider_id,
        verified,
        admin_id = actor.user_id,
        "provider verification changed"
    );

    let message = if verified {
        "Your provider account has been verified. You can now list e-bikes.".to_string()
    } else {
        match notes {
            Some(n) => format!("Your provider verification was revoked: {}", n),
            None => "Your provider verification was revoked.".to_string(),
        }
    };
    notify::dispatch(
        notifier,
        conn,
        &[Notice::to_user(provider_id, message, "/vehicle-providers/dashboard/")],
    );
    get(conn, provider_id)
}

/// Record that the provider settled the one-time registration fee.
pub fn mark_registration_fee_paid(
    conn: &Connection,
    actor: &Actor,
    provider_id: i64,
    now: NaiveDateTime,
) -> Result<User> {
    require_admin(actor)?;
    let user = provider(conn, provider_id)?;
    if !user.registration_fee_paid {
        conn.execute(
            "UPDATE users SET registration_fee_paid=1 WHERE id=?1",
            params![user.id],
        )?;
        tracing::info!(
            provider_id,
            admin_id = actor.user_id,
            at = %now,
            "registration fee marked paid"
        );
    }
    get(conn, provider_id)
}
