// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::error::{Error, FieldErrors, Result};
use crate::models::{Actor, EBike};
use crate::users;

#[derive(Debug, Clone)]
pub struct NewBike {
    pub name: String,
    pub description: String,
    pub price_per_day: Decimal,
    pub price_per_week: Decimal,
    pub image: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BikeFilter {
    pub provider_id: Option<i64>,
    pub available_only: bool,
}

pub fn add(conn: &Connection, actor: &Actor, bike: NewBike) -> Result<EBike> {
    let owner = users::get(conn, actor.user_id)?;
    if !owner.is_vehicle_provider || !owner.is_verified_provider {
        return Err(Error::NotPermitted);
    }

    let mut errs = FieldErrors::new();
    if bike.name.trim().is_empty() {
        errs.add("name", "This field is required.");
    }
    if bike.price_per_day <= Decimal::ZERO {
        errs.add("price_per_day", "Price per day must be greater than zero.");
    }
    if bike.price_per_week <= Decimal::ZERO {
        errs.add("price_per_week", "Price per week must be greater than zero.");
    }
    errs.into_result()?;

    conn.execute(
        "INSERT INTO ebikes(name, description, price_per_day, price_per_week, image, provider_id, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![
            bike.name.trim(),
            bike.description.trim(),
            bike.price_per_day.round_dp(2).to_string(),
            bike.price_per_week.round_dp(2).to_string(),
            bike.image.trim(),
            owner.id
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(ebike_id = id, provider_id = owner.id, "e-bike listed");
    get(conn, id)
}

pub fn get(conn: &Connection, id: i64) -> Result<EBike> {
    find(conn, id)?.ok_or(Error::NotFound { entity: "e-bike", id })
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<EBike>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM ebikes WHERE id=?1", EBike::COLUMNS),
            params![id],
            EBike::from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection, filter: BikeFilter) -> Result<Vec<EBike>> {
    let mut sql = format!("SELECT {} FROM ebikes WHERE 1=1", EBike::COLUMNS);
    if filter.available_only {
        sql.push_str(" AND is_available=1");
    }
    if filter.provider_id.is_some() {
        sql.push_str(" AND provider_id=?1");
    }
    sql.push_str(" ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match filter.provider_id {
        Some(pid) => stmt.query_map(params![pid], EBike::from_row)?,
        None => stmt.query_map([], EBike::from_row)?,
    };
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
