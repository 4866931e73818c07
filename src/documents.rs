// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, FieldErrors, Result};
use crate::models::{Actor, DocumentStatus, DocumentType, ProviderDocument};
use crate::notify::{self, Notice, Notifier};
use crate::users::require_admin;

const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];

pub fn submit(
    conn: &Connection,
    notifier: &dyn Notifier,
    actor: &Actor,
    document_type: DocumentType,
    document_file: &str,
    document_number: Option<&str>,
    now: NaiveDateTime,
) -> Result<ProviderDocument> {
    if !actor.is_provider {
        return Err(Error::NotPermitted);
    }
    let file = document_file.trim();
    let mut errs = FieldErrors::new();
    if file.is_empty() {
        errs.add("document_file", "This field is required.");
    } else {
        let ext = file
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            errs.add(
                "document_file",
                "Only PDF, JPG, PNG, DOC, and DOCX files are allowed",
            );
        }
    }
    errs.into_result()?;
    let number = document_number.map(str::trim).filter(|n| !n.is_empty());

    conn.execute(
        "INSERT INTO provider_documents(provider_id, document_type, document_file, document_number, uploaded_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            actor.user_id,
            document_type,
            file,
            number,
            now,
            DocumentStatus::Pending
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(
        document_id = id,
        provider_id = actor.user_id,
        kind = %document_type,
        "document submitted"
    );
    notify::dispatch(
        notifier,
        conn,
        &[Notice::to_admins(
            format!("New {} document submitted for review.", document_type),
            "/admin-dashboard/#documents",
        )],
    );
    load(conn, id)
}

fn load(conn: &Connection, id: i64) -> Result<ProviderDocument> {
    conn.query_row(
        &format!(
            "SELECT {} FROM provider_documents WHERE id=?1",
            ProviderDocument::COLUMNS
        ),
        params![id],
        ProviderDocument::from_row,
    )
    .optional()?
    .ok_or(Error::NotFound {
        entity: "document",
        id,
    })
}

/// Admin verdict on a pending or previously reviewed document.
pub fn review(
    conn: &Connection,
    notifier: &dyn Notifier,
    actor: &Actor,
    document_id: i64,
    verdict: DocumentStatus,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<ProviderDocument> {
    require_admin(actor)?;
    if verdict == DocumentStatus::Pending {
        return Err(Error::invalid("status", "Choose approved or rejected."));
    }
    let doc = load(conn, document_id)?;
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    conn.execute(
        "UPDATE provider_documents SET status=?1, admin_notes=?2, reviewed_by=?3, reviewed_at=?4 WHERE id=?5",
        params![verdict, notes, actor.user_id, now, document_id],
    )?;
    tracing::info!(document_id, status = %verdict, admin_id = actor.user_id, "document reviewed");

    let message = match (verdict, notes) {
        (DocumentStatus::Approved, _) => {
            format!("Your {} document has been approved.", doc.document_type)
        }
        (_, Some(n)) => format!("Your {} document was rejected: {}", doc.document_type, n),
        (_, None) => format!("Your {} document was rejected.", doc.document_type),
    };
    notify::dispatch(
        notifier,
        conn,
        &[Notice::to_user(
            doc.provider_id,
            message,
            "/vehicle-providers/documents/",
        )],
    );
    load(conn, document_id)
}

/// Newest first. Providers see their own; admins see all, optionally
/// narrowed to one status.
pub fn list_for(
    conn: &Connection,
    actor: &Actor,
    status: Option<DocumentStatus>,
) -> Result<Vec<ProviderDocument>> {
    if !actor.is_admin() && !actor.is_provider {
        return Err(Error::NotPermitted);
    }
    let owner = (!actor.is_admin()).then_some(actor.user_id);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM provider_documents
         WHERE (?1 IS NULL OR provider_id=?1) AND (?2 IS NULL OR status=?2)
         ORDER BY uploaded_at DESC, id DESC",
        ProviderDocument::COLUMNS
    ))?;
    let rows = stmt.query_map(params![owner, status], ProviderDocument::from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}
