// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};

use super::{Session, arg, id_arg, json_flags, opt_arg};
use crate::documents;
use crate::models::{DocumentStatus, DocumentType};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("submit", sub)) => {
            let actor = s.actor()?;
            let kind: DocumentType = arg(sub, "type")?.parse().map_err(|e: String| anyhow!(e))?;
            let doc = documents::submit(
                s.conn,
                s.ctx.notifier,
                &actor,
                kind,
                arg(sub, "file")?,
                opt_arg(sub, "number"),
                s.ctx.now,
            )?;
            println!("Document #{} submitted for review", doc.id);
        }
        Some(("review", sub)) => {
            let actor = s.actor()?;
            let verdict: DocumentStatus =
                arg(sub, "status")?.parse().map_err(|e: String| anyhow!(e))?;
            let doc = documents::review(
                s.conn,
                s.ctx.notifier,
                &actor,
                id_arg(sub, "id")?,
                verdict,
                opt_arg(sub, "notes"),
                s.ctx.now,
            )?;
            println!("Document #{} {}", doc.id, doc.status);
        }
        Some(("list", sub)) => list(s, sub)?,
        _ => {}
    }
    Ok(())
}

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let status = opt_arg(sub, "status")
        .map(|v| v.parse::<DocumentStatus>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let docs = documents::list_for(s.conn, &s.actor()?, status)?;
    if maybe_print_json(json_flag, jsonl_flag, &docs)? {
        return Ok(());
    }
    let rows = docs
        .into_iter()
        .map(|d| {
            vec![
                d.id.to_string(),
                d.provider_id.to_string(),
                d.document_type.to_string(),
                d.document_file,
                d.document_number.unwrap_or_default(),
                d.status.to_string(),
                d.admin_notes.unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Provider", "Type", "File", "Number", "Status", "Notes"],
            rows
        )
    );
    Ok(())
}
