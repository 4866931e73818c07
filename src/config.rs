// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use secrecy::Secret;

/// Share of approved-booking revenue the platform keeps (10%).
pub const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
/// Smallest payout a provider may request (₹200).
pub const MIN_WITHDRAWAL: Decimal = Decimal::from_parts(200, 0, 0, false, 0);
/// One-time provider registration fee (₹100).
pub const REGISTRATION_FEE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// How finely "now" is compared against a booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Whole calendar days, `start_date <= today <= end_date`.
    Date,
    /// Pickup and return times honoured, `start <= now < end`.
    DateTime,
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Granularity::Date),
            "datetime" | "date_time" => Ok(Granularity::DateTime),
            other => Err(anyhow!(
                "Invalid availability granularity '{}', expected date|datetime",
                other
            )),
        }
    }
}

/// Business rules threaded through the core operations.
#[derive(Debug, Clone)]
pub struct Rules {
    pub platform_fee_rate: Decimal,
    pub min_withdrawal: Decimal,
    pub registration_fee: Decimal,
    pub availability: Granularity,
    /// Accept approve/reject on unpaid bookings (older admin workflow).
    pub allow_unpaid_approval: bool,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            platform_fee_rate: PLATFORM_FEE_RATE,
            min_withdrawal: MIN_WITHDRAWAL,
            registration_fee: REGISTRATION_FEE,
            availability: Granularity::DateTime,
            allow_unpaid_approval: false,
            default_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            default_end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: Secret::new(String::new()),
            webhook_secret: Secret::new(String::new()),
            api_base_url: "https://api.razorpay.com/v1".to_string(),
            currency: "INR".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_path: Option<PathBuf>,
    pub log_filter: String,
    pub razorpay: RazorpayConfig,
    pub rules: Rules,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let database_path = env::var("EBIKE_DB_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let log_filter = env::var("EBIKE_LOG").unwrap_or_else(|_| "info".to_string());

        let defaults = RazorpayConfig::default();
        let timeout_secs: u64 = match env::var("RAZORPAY_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid RAZORPAY_TIMEOUT_SECS '{}'", v))?,
            Err(_) => defaults.timeout.as_secs(),
        };
        let razorpay = RazorpayConfig {
            key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            key_secret: Secret::new(env::var("RAZORPAY_KEY_SECRET").unwrap_or_default()),
            webhook_secret: Secret::new(env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default()),
            api_base_url: env::var("RAZORPAY_API_BASE").unwrap_or(defaults.api_base_url),
            currency: env::var("PAYMENT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.currency),
            timeout: Duration::from_secs(timeout_secs),
        };

        let mut rules = Rules::default();
        if let Ok(g) = env::var("AVAILABILITY_GRANULARITY") {
            rules.availability = g.parse()?;
        }
        if let Ok(flag) = env::var("ALLOW_UNPAID_APPROVAL") {
            rules.allow_unpaid_approval = parse_flag(&flag)
                .with_context(|| format!("Invalid ALLOW_UNPAID_APPROVAL '{}'", flag))?;
        }

        Ok(Self {
            database_path,
            log_filter,
            razorpay,
            rules,
        })
    }
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_have_expected_values() {
        assert_eq!(PLATFORM_FEE_RATE.to_string(), "0.10");
        assert_eq!(MIN_WITHDRAWAL, Decimal::from(200));
        assert_eq!(REGISTRATION_FEE, Decimal::from(100));
    }

    #[test]
    fn granularity_parses_both_spellings() {
        assert_eq!("date".parse::<Granularity>().unwrap(), Granularity::Date);
        assert_eq!(
            " DateTime ".parse::<Granularity>().unwrap(),
            Granularity::DateTime
        );
        assert!("hourly".parse::<Granularity>().is_err());
    }

    #[test]
    fn flags_accept_common_forms() {
        assert!(parse_flag("yes").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
