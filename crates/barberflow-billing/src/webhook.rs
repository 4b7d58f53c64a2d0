//! Stripe webhook verification and subscription sync mapping.
//!
//! Handlers verify the raw body first, then turn the event into a
//! [`SubscriptionChange`] that the API layer applies to the user record.

use barberflow_types::models::{Plan, SubscriptionStatus};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::plans::PriceMap;

/// Maximum age of a signed webhook before it is treated as a replay.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,

    #[error("Invalid signature hex")]
    InvalidHex,

    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,

    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw request body. Any matching `v1` entry is accepted.
pub fn verify_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        if let Some(t) = part.trim().strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.trim().strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;

    let mut matched = false;
    for signature in signatures {
        let sig_bytes = hex::decode(signature).map_err(|_| WebhookError::InvalidHex)?;
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| WebhookError::MalformedHeader)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice compares in constant time
        if mac.verify_slice(&sig_bytes).is_ok() {
            matched = true;
            break;
        }
    }
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now_unix - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedEvent(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    customer: String,
    status: String,
    #[serde(default)]
    items: Option<SubscriptionItems>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

/// What a webhook event asks us to do to a user's subscription fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// `checkout.session.completed`: user from session metadata becomes active.
    Activate { user_id: String, plan: Plan },
    /// `customer.subscription.updated`: `plan = None` keeps the current tier.
    Update {
        customer_id: String,
        status: SubscriptionStatus,
        plan: Option<Plan>,
    },
    /// `customer.subscription.deleted`: back to free with no subscription.
    Reset { customer_id: String },
    /// Event type we do not act on, or one with nothing to apply.
    Ignore,
}

impl SubscriptionChange {
    pub fn from_event(event: &StripeEvent, prices: &PriceMap) -> Result<Self, WebhookError> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSession = decode_object(event)?;
                let Some(user_id) = session.metadata.get("userId").filter(|id| !id.is_empty())
                else {
                    return Ok(Self::Ignore);
                };
                let plan = session
                    .metadata
                    .get("plan")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(Plan::Pro);
                Ok(Self::Activate {
                    user_id: user_id.clone(),
                    plan,
                })
            }
            "customer.subscription.updated" => {
                let sub: Subscription = decode_object(event)?;
                let Ok(status) = sub.status.parse::<SubscriptionStatus>() else {
                    warn!(
                        event_id = %event.id,
                        customer = %sub.customer,
                        status = %sub.status,
                        "Unhandled subscription status, leaving user unchanged"
                    );
                    return Ok(Self::Ignore);
                };
                let plan = match status {
                    SubscriptionStatus::Active => {
                        let price_id = sub
                            .items
                            .as_ref()
                            .and_then(|items| items.data.first())
                            .map(|item| item.price.id.as_str())
                            .unwrap_or_default();
                        Some(prices.plan_or_default(price_id))
                    }
                    SubscriptionStatus::Canceled
                    | SubscriptionStatus::Unpaid
                    | SubscriptionStatus::PastDue => Some(Plan::Free),
                    _ => None,
                };
                Ok(Self::Update {
                    customer_id: sub.customer,
                    status,
                    plan,
                })
            }
            "customer.subscription.deleted" => {
                let sub: Subscription = decode_object(event)?;
                Ok(Self::Reset {
                    customer_id: sub.customer,
                })
            }
            _ => Ok(Self::Ignore),
        }
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, WebhookError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| WebhookError::MalformedEvent(format!("{}: {}", event.event_type, e)))
}
