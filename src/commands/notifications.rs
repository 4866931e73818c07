// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};

use super::{Session, id_arg, json_flags};
use crate::notify;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(s, sub)?,
        Some(("read", sub)) => {
            let actor = s.actor()?;
            let id = id_arg(sub, "id")?;
            if !notify::mark_read(s.conn, actor.user_id, id)? {
                bail!("Notification #{} not found", id);
            }
            println!("Notification #{} marked read", id);
        }
        _ => {}
    }
    Ok(())
}

fn list(s: &mut Session<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let actor = s.actor()?;
    let items = notify::list_for(s.conn, actor.user_id, sub.get_flag("unread"))?;
    if maybe_print_json(json_flag, jsonl_flag, &items)? {
        return Ok(());
    }
    let unread = notify::unread_count(s.conn, actor.user_id)?;
    let rows = items
        .into_iter()
        .map(|n| {
            vec![
                n.id.to_string(),
                n.created_at,
                if n.is_read { "" } else { "•" }.to_string(),
                n.message,
                n.link.unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "When", "New", "Message", "Link"], rows)
    );
    println!("{} unread", unread);
    Ok(())
}
