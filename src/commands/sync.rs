// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::Session;
use crate::availability;

/// Standalone sweep for schedulers. `--silent` keeps stdout empty on
/// success; failures are still logged and returned.
pub fn handle(s: &mut Session<'_>, m: &clap::ArgMatches) -> Result<()> {
    let silent = m.get_flag("silent");
    let now = s.ctx.now;
    match availability::sync_all(s.conn, now, s.ctx.rules.availability) {
        Ok(updated) => {
            if !silent {
                println!("Updated availability for {} e-bike(s) at {}", updated, now);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "availability sweep failed");
            Err(e.into())
        }
    }
}
