// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "EbikeRental", "ebike-rental"));

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = override_path {
        if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(p.to_path_buf());
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ebike-rental.sqlite"))
}

pub fn open_or_init(override_path: Option<&Path>) -> Result<Connection> {
    let path = db_path(override_path)?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    // writers queue behind BEGIN IMMEDIATE instead of failing
    conn.busy_timeout(BUSY_TIMEOUT)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL DEFAULT '',
        is_rider INTEGER NOT NULL DEFAULT 0,
        is_vehicle_provider INTEGER NOT NULL DEFAULT 0,
        is_staff INTEGER NOT NULL DEFAULT 0,
        is_verified_provider INTEGER NOT NULL DEFAULT 0,
        verification_notes TEXT,
        registration_fee_paid INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS ebikes(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price_per_day TEXT NOT NULL,
        price_per_week TEXT NOT NULL,
        image TEXT NOT NULL DEFAULT '',
        provider_id INTEGER NOT NULL,
        is_available INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY(provider_id) REFERENCES users(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_ebikes_provider ON ebikes(provider_id);

    -- is_approved / is_rejected are derived from status, never stored
    CREATE TABLE IF NOT EXISTS bookings(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rider_id INTEGER NOT NULL,
        ebike_id INTEGER NOT NULL,
        start_date TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_date TEXT NOT NULL,
        end_time TEXT NOT NULL,
        total_price TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK(status IN ('pending','awaiting_approval','approved','rejected','cancelled')),
        is_paid INTEGER NOT NULL DEFAULT 0,
        razorpay_order_id TEXT,
        razorpay_payment_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(rider_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(ebike_id) REFERENCES ebikes(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_bookings_ebike ON bookings(ebike_id, status);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_order
        ON bookings(razorpay_order_id) WHERE razorpay_order_id IS NOT NULL;

    CREATE TABLE IF NOT EXISTS withdrawals(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        transfer_type TEXT NOT NULL CHECK(transfer_type IN ('bank','upi')),
        account_holder_name TEXT,
        account_number TEXT,
        ifsc_code TEXT,
        bank_name TEXT,
        upi_id TEXT,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK(status IN ('pending','approved','rejected','completed')),
        admin_notes TEXT,
        processed_by INTEGER,
        processed_at TEXT,
        transaction_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(provider_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(processed_by) REFERENCES users(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_withdrawals_provider ON withdrawals(provider_id, status);

    CREATE TABLE IF NOT EXISTS provider_documents(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider_id INTEGER NOT NULL,
        document_type TEXT NOT NULL,
        document_file TEXT NOT NULL,
        document_number TEXT,
        uploaded_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK(status IN ('pending','approved','rejected')),
        admin_notes TEXT,
        reviewed_by INTEGER,
        reviewed_at TEXT,
        FOREIGN KEY(provider_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(reviewed_by) REFERENCES users(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS notifications(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recipient_id INTEGER,
        message TEXT NOT NULL,
        link TEXT,
        is_read INTEGER NOT NULL DEFAULT 0,
        is_public INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(recipient_id) REFERENCES users(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
