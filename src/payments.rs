// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Checkout flow: order creation, synchronous signature verification and
//! the asynchronous `payment.captured` webhook. Both confirmation paths
//! end in [`bookings::confirm_payment`], which is a no-op once paid.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::bookings::{self, PaymentOutcome, PaymentReceipt};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::gateway::{PaymentGateway, SignatureVerifier, WebhookEvent};
use crate::models::{Actor, Booking, BookingStatus};
use crate::utils::to_minor_units;

pub const CAPTURED_EVENT: &str = "payment.captured";

/// What the rider's checkout needs to open the gateway widget.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOrder {
    pub booking_id: i64,
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: String,
}

pub fn receipt_for(booking_id: i64) -> String {
    format!("booking_{}", booking_id)
}

fn booking_from_receipt(receipt: &str) -> Option<i64> {
    let r = receipt.trim();
    r.strip_prefix("booking_").unwrap_or(r).parse().ok()
}

fn owned_by_rider(conn: &Connection, actor: &Actor, booking_id: i64) -> Result<Booking> {
    let booking = bookings::get_for(conn, actor, booking_id)?;
    if booking.rider_id != actor.user_id && !actor.is_admin() {
        return Err(Error::NotPermitted);
    }
    Ok(booking)
}

/// Open a gateway order for an unpaid booking and remember its id. A
/// booking keeps one open order; asking again returns the same one.
pub fn create_order(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    currency: &str,
    actor: &Actor,
    booking_id: i64,
) -> Result<CheckoutOrder> {
    let booking = owned_by_rider(conn, actor, booking_id)?;
    if booking.is_paid || booking.status != BookingStatus::Pending {
        return Err(Error::InvalidTransition {
            entity: "booking",
            id: booking_id,
            state: booking.status.to_string(),
            action: "create a payment order for",
        });
    }
    let amount_minor = to_minor_units(booking.total_price).ok_or_else(|| {
        Error::invalid("total_price", "Booking amount must be a positive amount in whole paise.")
    })?;

    let checkout = |order_id: String| CheckoutOrder {
        booking_id,
        order_id,
        amount_minor,
        currency: currency.to_string(),
    };
    if let Some(open) = booking.razorpay_order_id {
        tracing::debug!(booking_id, order_id = %open, "reusing open payment order");
        return Ok(checkout(open));
    }

    let order = gateway.create_order(amount_minor, currency, &receipt_for(booking_id))?;
    let n = conn.execute(
        "UPDATE bookings SET razorpay_order_id=?1
         WHERE id=?2 AND is_paid=0 AND razorpay_order_id IS NULL",
        params![order.id, booking_id],
    )?;
    if n == 0 {
        // another checkout attached its order first
        let current = bookings::load(conn, booking_id)?;
        return match current.razorpay_order_id {
            Some(open) if !current.is_paid => Ok(checkout(open)),
            _ => Err(Error::InvalidTransition {
                entity: "booking",
                id: booking_id,
                state: current.status.to_string(),
                action: "create a payment order for",
            }),
        };
    }
    tracing::info!(
        booking_id,
        order_id = %order.id,
        amount_minor,
        "payment order attached to booking"
    );
    Ok(checkout(order.id))
}

/// Checkout callback carrying the gateway's signature over order|payment.
#[derive(Debug, Clone)]
pub struct CheckoutCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub fn verify(
    conn: &mut Connection,
    ctx: &Context<'_>,
    verifier: &SignatureVerifier,
    actor: &Actor,
    booking_id: i64,
    callback: &CheckoutCallback,
) -> Result<PaymentOutcome> {
    owned_by_rider(conn, actor, booking_id)?;
    if !verifier.verify_payment(&callback.order_id, &callback.payment_id, &callback.signature) {
        tracing::warn!(
            booking_id,
            order_id = %callback.order_id,
            payment_id = %callback.payment_id,
            "payment signature mismatch"
        );
        return Err(Error::SignatureVerification);
    }
    bookings::confirm_payment(
        conn,
        ctx,
        booking_id,
        &PaymentReceipt {
            order_id: callback.order_id.clone(),
            payment_id: callback.payment_id.clone(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Confirmed { booking_id: i64 },
    AlreadyPaid { booking_id: i64 },
    Ignored { reason: String },
}

/// Handle one webhook delivery. Redeliveries and events for bookings that
/// are already paid succeed without changing anything.
pub fn handle_webhook(
    conn: &mut Connection,
    ctx: &Context<'_>,
    verifier: &SignatureVerifier,
    raw_body: &[u8],
    signature: &str,
) -> Result<WebhookOutcome> {
    if !verifier.verify_webhook(raw_body, signature) {
        tracing::warn!("webhook signature mismatch");
        return Err(Error::SignatureVerification);
    }
    let event: WebhookEvent = serde_json::from_slice(raw_body)?;
    if event.event != CAPTURED_EVENT {
        tracing::debug!(event = %event.event, "webhook event ignored");
        return Ok(WebhookOutcome::Ignored {
            reason: format!("unhandled event {}", event.event),
        });
    }

    let Some(payment) = event.payload.payment.map(|p| p.entity) else {
        tracing::warn!("payment.captured without a payment entity");
        return Ok(WebhookOutcome::Ignored {
            reason: "no payment entity".into(),
        });
    };
    let order = event.payload.order.map(|o| o.entity);
    let Some(order_id) = payment
        .order_id
        .clone()
        .or_else(|| order.as_ref().map(|o| o.id.clone()))
    else {
        tracing::warn!(payment_id = %payment.id, "captured payment without an order id");
        return Ok(WebhookOutcome::Ignored {
            reason: "no order id".into(),
        });
    };

    let from_receipt = order
        .as_ref()
        .and_then(|o| o.receipt.as_deref())
        .and_then(booking_from_receipt);
    let booking_id = match from_receipt {
        Some(id) => Some(id),
        None => bookings::find_by_order(conn, &order_id)?.map(|b| b.id),
    };
    let Some(booking_id) = booking_id else {
        tracing::warn!(order_id = %order_id, "webhook for an order no booking knows about");
        return Ok(WebhookOutcome::Ignored {
            reason: format!("no booking for order {}", order_id),
        });
    };

    let outcome = bookings::confirm_payment(
        conn,
        ctx,
        booking_id,
        &PaymentReceipt {
            order_id,
            payment_id: payment.id,
        },
    );
    match outcome {
        Ok(PaymentOutcome::Confirmed(_)) => Ok(WebhookOutcome::Confirmed { booking_id }),
        Ok(PaymentOutcome::AlreadyPaid(_)) => Ok(WebhookOutcome::AlreadyPaid { booking_id }),
        Err(Error::NotFound { .. }) => {
            tracing::warn!(booking_id, "webhook for a booking that no longer exists");
            Ok(WebhookOutcome::Ignored {
                reason: format!("booking {} not found", booking_id),
            })
        }
        Err(e) => Err(e),
    }
}
