// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;

use crate::config::Rules;
use crate::notify::Notifier;

/// Collaborators and the clock reading shared by one unit of work.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub rules: &'a Rules,
    pub notifier: &'a dyn Notifier,
    pub now: NaiveDateTime,
}

impl<'a> Context<'a> {
    pub fn new(rules: &'a Rules, notifier: &'a dyn Notifier, now: NaiveDateTime) -> Self {
        Self {
            rules,
            notifier,
            now,
        }
    }
}
