// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! User-facing notices. Operations collect [`Notice`]s while their
//! transaction is open and hand them to a [`Notifier`] after commit, so a
//! failed delivery can never undo the state change that caused it.

use anyhow::Result;
use rusqlite::{Connection, params};

use crate::models::Notification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(i64),
    /// Every staff account at delivery time.
    Admins,
    /// Public announcement, visible to everyone.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: Recipient,
    pub message: String,
    pub link: Option<String>,
}

impl Notice {
    pub fn to_user(user_id: i64, message: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::User(user_id),
            message: message.into(),
            link: Some(link.into()),
        }
    }

    pub fn to_admins(message: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Admins,
            message: message.into(),
            link: Some(link.into()),
        }
    }
}

pub trait Notifier {
    fn notify(&self, conn: &Connection, notice: &Notice) -> Result<()>;
}

/// Stores notices in the `notifications` table, one row per recipient.
#[derive(Debug, Default, Clone, Copy)]
pub struct InAppNotifier;

impl Notifier for InAppNotifier {
    fn notify(&self, conn: &Connection, notice: &Notice) -> Result<()> {
        // messages are capped at 255 characters
        let message: String = notice.message.chars().take(255).collect();
        match notice.recipient {
            Recipient::User(id) => {
                conn.execute(
                    "INSERT INTO notifications(recipient_id, message, link) VALUES (?1, ?2, ?3)",
                    params![id, message, notice.link],
                )?;
            }
            Recipient::Admins => {
                conn.execute(
                    "INSERT INTO notifications(recipient_id, message, link)
                     SELECT id, ?1, ?2 FROM users WHERE is_staff=1",
                    params![message, notice.link],
                )?;
            }
            Recipient::Public => {
                conn.execute(
                    "INSERT INTO notifications(recipient_id, message, link, is_public) VALUES (NULL, ?1, ?2, 1)",
                    params![message, notice.link],
                )?;
            }
        }
        Ok(())
    }
}

/// Deliver after commit. Failures are logged and otherwise ignored.
pub fn dispatch(notifier: &dyn Notifier, conn: &Connection, notices: &[Notice]) {
    for notice in notices {
        if let Err(e) = notifier.notify(conn, notice) {
            tracing::warn!(
                error = %e,
                recipient = ?notice.recipient,
                "notification delivery failed"
            );
        }
    }
}

/// Personal notices for `user_id` plus public ones, newest first.
pub fn list_for(conn: &Connection, user_id: i64, unread_only: bool) -> Result<Vec<Notification>> {
    let mut sql = String::from(
        "SELECT id, recipient_id, message, link, is_read, is_public, created_at
         FROM notifications WHERE (recipient_id=?1 OR is_public=1)",
    );
    if unread_only {
        sql.push_str(" AND is_read=0");
    }
    sql.push_str(" ORDER BY id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok(Notification {
            id: r.get(0)?,
            recipient_id: r.get(1)?,
            message: r.get(2)?,
            link: r.get(3)?,
            is_read: r.get(4)?,
            is_public: r.get(5)?,
            created_at: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Mark one of the user's own notifications read. Returns false when no
/// such notification belongs to them.
pub fn mark_read(conn: &Connection, user_id: i64, notification_id: i64) -> Result<bool> {
    let n = conn.execute(
        "UPDATE notifications SET is_read=1 WHERE id=?1 AND recipient_id=?2",
        params![notification_id, user_id],
    )?;
    Ok(n == 1)
}

pub fn unread_count(conn: &Connection, user_id: i64) -> Result<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE (recipient_id=?1 AND is_read=0) OR is_public=1",
        params![user_id],
        |r| r.get(0),
    )?;
    Ok(n)
}
