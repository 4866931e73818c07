// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A single user-correctable problem, attached to the input field it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("payment gateway rejected the request: {code} - {description}")]
    Rejected { code: String, description: String },

    #[error("payment gateway credentials not configured")]
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("not permitted")]
    NotPermitted,

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("cannot {action} {entity} #{id} while it is {state}")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        state: String,
        action: &'static str,
    },

    #[error("payment signature verification failed")]
    SignatureVerification,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    /// Single-field validation error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errs = FieldErrors::new();
        errs.add(field, message);
        Error::Validation(errs)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Error::Validation(errs) => Some(errs),
            _ => None,
        }
    }

    /// Text safe to show to the person who triggered the operation.
    /// Gateway and signature details stay in the server log.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errs) => errs.to_string(),
            Error::NotPermitted => "not permitted".to_string(),
            Error::NotFound { .. } => self.to_string(),
            Error::InvalidTransition { .. } => self.to_string(),
            Error::SignatureVerification | Error::MalformedPayload(_) => {
                "payment could not be verified".to_string()
            }
            Error::Gateway(GatewayError::Unavailable(_)) => {
                "payment gateway is unavailable, please try again shortly".to_string()
            }
            Error::Gateway(_) => "payment could not be initialized".to_string(),
            Error::Storage(_) => "internal error".to_string(),
        }
    }
}
