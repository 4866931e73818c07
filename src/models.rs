// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_col;

/// Enum persisted as a lowercase TEXT column.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse().map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created by the rider, not paid yet.
    Pending,
    /// Paid through the gateway, waiting for an admin decision.
    AwaitingApproval,
    Approved,
    Rejected,
    Cancelled,
}

text_enum!(BookingStatus {
    Pending => "pending",
    AwaitingApproval => "awaiting_approval",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

text_enum!(WithdrawalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
});

impl WithdrawalStatus {
    /// Requested or approved but not yet paid out.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, WithdrawalStatus::Pending | WithdrawalStatus::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    Bank,
    Upi,
}

text_enum!(TransferType {
    Bank => "bank",
    Upi => "upi",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Aadhar,
    Pan,
    DrivingLicense,
    BusinessLicense,
    Insurance,
    Other,
}

text_enum!(DocumentType {
    Aadhar => "aadhar",
    Pan => "pan",
    DrivingLicense => "driving_license",
    BusinessLicense => "business_license",
    Insurance => "insurance",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(DocumentStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_rider: bool,
    pub is_vehicle_provider: bool,
    pub is_staff: bool,
    pub is_verified_provider: bool,
    pub verification_notes: Option<String>,
    pub registration_fee_paid: bool,
}

impl User {
    pub const COLUMNS: &'static str = "id, username, email, is_rider, is_vehicle_provider, is_staff, is_verified_provider, verification_notes, registration_fee_paid";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            username: r.get(1)?,
            email: r.get(2)?,
            is_rider: r.get(3)?,
            is_vehicle_provider: r.get(4)?,
            is_staff: r.get(5)?,
            is_verified_provider: r.get(6)?,
            verification_notes: r.get(7)?,
            registration_fee_paid: r.get(8)?,
        })
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            is_staff: self.is_staff,
            is_provider: self.is_vehicle_provider,
            is_rider: self.is_rider,
        }
    }
}

/// Identity on whose behalf an operation runs, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub is_staff: bool,
    pub is_provider: bool,
    pub is_rider: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.is_staff
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EBike {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_per_day: Decimal,
    pub price_per_week: Decimal,
    pub image: String,
    pub provider_id: i64,
    pub is_available: bool,
}

impl EBike {
    pub const COLUMNS: &'static str =
        "id, name, description, price_per_day, price_per_week, image, provider_id, is_available";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            name: r.get(1)?,
            description: r.get(2)?,
            price_per_day: decimal_col(r, 3)?,
            price_per_week: decimal_col(r, 4)?,
            image: r.get(5)?,
            provider_id: r.get(6)?,
            is_available: r.get(7)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub rider_id: i64,
    pub ebike_id: i64,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub is_paid: bool,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub const COLUMNS: &'static str = "id, rider_id, ebike_id, start_date, start_time, end_date, end_time, total_price, status, is_paid, razorpay_order_id, razorpay_payment_id, created_at, updated_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            rider_id: r.get(1)?,
            ebike_id: r.get(2)?,
            start_date: r.get(3)?,
            start_time: r.get(4)?,
            end_date: r.get(5)?,
            end_time: r.get(6)?,
            total_price: decimal_col(r, 7)?,
            status: r.get(8)?,
            is_paid: r.get(9)?,
            razorpay_order_id: r.get(10)?,
            razorpay_payment_id: r.get(11)?,
            created_at: r.get(12)?,
            updated_at: r.get(13)?,
        })
    }

    pub fn is_approved(&self) -> bool {
        self.status == BookingStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == BookingStatus::Rejected
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    /// Billable days, `end_date - start_date`.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Where a payout goes. The variant is the declared transfer type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transfer_type", rename_all = "snake_case")]
pub enum PayoutDestination {
    Bank {
        account_holder_name: String,
        account_number: String,
        ifsc_code: String,
        bank_name: String,
    },
    Upi {
        upi_id: String,
    },
}

impl PayoutDestination {
    pub fn transfer_type(&self) -> TransferType {
        match self {
            PayoutDestination::Bank { .. } => TransferType::Bank,
            PayoutDestination::Upi { .. } => TransferType::Upi,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PayoutDestination::Bank {
                account_holder_name,
                account_number,
                ifsc_code,
                bank_name,
            } => format!(
                "{} - {} - {} ({})",
                account_holder_name,
                bank_name,
                mask_account(account_number),
                ifsc_code
            ),
            PayoutDestination::Upi { upi_id } => format!("UPI {}", upi_id),
        }
    }
}

fn mask_account(number: &str) -> String {
    let keep = number.chars().count().saturating_sub(4);
    number
        .chars()
        .enumerate()
        .map(|(i, c)| if i < keep { 'X' } else { c })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub provider_id: i64,
    pub amount: Decimal,
    pub payout: PayoutDestination,
    pub status: WithdrawalStatus,
    pub admin_notes: Option<String>,
    pub processed_by: Option<i64>,
    pub processed_at: Option<NaiveDateTime>,
    pub transaction_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Withdrawal {
    pub const COLUMNS: &'static str = "id, provider_id, amount, transfer_type, account_holder_name, account_number, ifsc_code, bank_name, upi_id, status, admin_notes, processed_by, processed_at, transaction_id, created_at, updated_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        let transfer_type: TransferType = r.get(3)?;
        let payout = match transfer_type {
            TransferType::Bank => PayoutDestination::Bank {
                account_holder_name: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
                account_number: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
                ifsc_code: r.get::<_, Option<String>>(6)?.unwrap_or_default(),
                bank_name: r.get::<_, Option<String>>(7)?.unwrap_or_default(),
            },
            TransferType::Upi => PayoutDestination::Upi {
                upi_id: r.get::<_, Option<String>>(8)?.unwrap_or_default(),
            },
        };
        Ok(Self {
            id: r.get(0)?,
            provider_id: r.get(1)?,
            amount: decimal_col(r, 2)?,
            payout,
            status: r.get(9)?,
            admin_notes: r.get(10)?,
            processed_by: r.get(11)?,
            processed_at: r.get(12)?,
            transaction_id: r.get(13)?,
            created_at: r.get(14)?,
            updated_at: r.get(15)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDocument {
    pub id: i64,
    pub provider_id: i64,
    pub document_type: DocumentType,
    pub document_file: String,
    pub document_number: Option<String>,
    pub uploaded_at: NaiveDateTime,
    pub status: DocumentStatus,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<NaiveDateTime>,
}

impl ProviderDocument {
    pub const COLUMNS: &'static str = "id, provider_id, document_type, document_file, document_number, uploaded_at, status, admin_notes, reviewed_by, reviewed_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            provider_id: r.get(1)?,
            document_type: r.get(2)?,
            document_file: r.get(3)?,
            document_number: r.get(4)?,
            uploaded_at: r.get(5)?,
            status: r.get(6)?,
            admin_notes: r.get(7)?,
            reviewed_by: r.get(8)?,
            reviewed_at: r.get(9)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: Option<i64>,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub is_public: bool,
    pub created_at: String,
}
