// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod availability;
pub mod bikes;
pub mod bookings;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod notify;
pub mod payments;
pub mod receipts;
pub mod users;
pub mod utils;
pub mod withdrawals;

pub use error::{Error, Result};
