// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Razorpay integration: order creation over HTTP and HMAC-SHA256
//! verification of checkout callbacks and webhooks.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::RazorpayConfig;
use crate::error::GatewayError;
use crate::utils::http_client;

type HmacSha256 = Hmac<Sha256>;

/// Order as returned by the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// Seam between the payment flow and the external gateway.
pub trait PaymentGateway {
    fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: String,
    description: String,
}

pub struct RazorpayClient {
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }
}

impl PaymentGateway for RazorpayClient {
    fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let client = http_client(self.config.timeout)
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        let url = format!("{}/orders", self.config.api_base_url.trim_end_matches('/'));

        let response = client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&CreateOrderRequest {
                amount: amount_minor,
                currency,
                receipt,
            })
            .send()
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "razorpay order request failed"
                );
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        tracing::debug!(%status, "razorpay create_order response");

        if status.is_success() {
            let order: GatewayOrder = serde_json::from_str(&body).map_err(|e| {
                GatewayError::Unavailable(format!("unreadable order response: {}", e))
            })?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "razorpay order created"
            );
            return Ok(order);
        }
        if status.is_server_error() {
            tracing::error!(%status, "razorpay unavailable");
            return Err(GatewayError::Unavailable(format!("HTTP {}", status)));
        }
        let detail = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error)
            .unwrap_or(ApiErrorDetail {
                code: status.as_u16().to_string(),
                description: body,
            });
        tracing::error!(
            code = %detail.code,
            description = %detail.description,
            "razorpay order rejected"
        );
        Err(GatewayError::Rejected {
            code: detail.code,
            description: detail.description,
        })
    }
}

fn hex_hmac(secret: &Secret<String>, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn signature_matches(expected: Option<String>, supplied: &str) -> bool {
    match expected {
        Some(e) => e.as_bytes().ct_eq(supplied.trim().as_bytes()).into(),
        None => false,
    }
}

/// Checks signatures produced by the gateway with our shared secrets.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: Secret<String>,
    webhook_secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(key_secret: Secret<String>, webhook_secret: Secret<String>) -> Self {
        Self {
            key_secret,
            webhook_secret,
        }
    }

    pub fn from_config(config: &RazorpayConfig) -> Self {
        Self::new(config.key_secret.clone(), config.webhook_secret.clone())
    }

    /// `HMAC-SHA256(order_id + "|" + payment_id, key_secret)`, hex encoded.
    pub fn payment_signature(&self, order_id: &str, payment_id: &str) -> Option<String> {
        hex_hmac(
            &self.key_secret,
            format!("{}|{}", order_id, payment_id).as_bytes(),
        )
    }

    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if self.key_secret.expose_secret().is_empty() {
            tracing::error!("payment signature check without a key secret");
            return false;
        }
        signature_matches(self.payment_signature(order_id, payment_id), signature)
    }

    /// `HMAC-SHA256(raw_body, webhook_secret)`, hex encoded.
    pub fn webhook_signature(&self, raw_body: &[u8]) -> Option<String> {
        hex_hmac(&self.webhook_secret, raw_body)
    }

    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> bool {
        if self.webhook_secret.expose_secret().is_empty() {
            tracing::error!("webhook signature check without a webhook secret");
            return false;
        }
        signature_matches(self.webhook_signature(raw_body), signature)
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<Wrapped<PaymentEntity>>,
    pub order: Option<Wrapped<OrderEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct Wrapped<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: String,
    pub receipt: Option<String>,
}
