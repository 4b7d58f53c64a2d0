use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use barberflow_billing::stripe::CheckoutParams;
use barberflow_billing::webhook::{StripeEvent, verify_signature};
use barberflow_billing::{SubscriptionChange, WebhookError};
use barberflow_db::models::UserRow;
use barberflow_types::api::{CheckoutRequest, UrlResponse, WebhookAck};
use barberflow_types::models::{Plan, SubscriptionStatus};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, with_db};

/// Start a subscription Checkout Session, creating the Stripe customer on first use.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id.to_string();

    let customer_id = match user.stripe_customer_id.clone() {
        Some(id) => id,
        None => {
            let id = state
                .stripe
                .create_customer(&user.email, &user.name, &user_id)
                .await?;
            let (uid, cid) = (user.id, id.clone());
            with_db(&state, move |db| Ok(db.set_stripe_customer(uid, &cid)?)).await?;
            info!(user_id = %user.id, customer_id = %id, "Created Stripe customer");
            id
        }
    };

    let plan = state.prices.plan_or_default(&req.plan_id);
    let client_url = state.client_url.trim_end_matches('/');
    let success_url = format!(
        "{}/dashboard?session_id={{CHECKOUT_SESSION_ID}}&success=true",
        client_url
    );
    let cancel_url = format!("{}/billing", client_url);

    let url = state
        .stripe
        .create_checkout_session(&CheckoutParams {
            customer_id: &customer_id,
            price_id: &req.plan_id,
            user_id: &user_id,
            plan: plan.as_str(),
            success_url: &success_url,
            cancel_url: &cancel_url,
        })
        .await?;

    Ok(Json(UrlResponse { url }))
}

pub async fn create_portal_session(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = user
        .stripe_customer_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("No active subscription found"))?;

    let return_url = format!("{}/billing", state.client_url.trim_end_matches('/'));
    let url = state
        .stripe
        .create_billing_portal_session(customer_id, &return_url)
        .await?;

    Ok(Json(UrlResponse { url }))
}

/// Stripe webhook. Signature is checked against the raw body before parsing.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MalformedHeader)
        .map_err(webhook_error)?;

    verify_signature(&body, signature, &state.webhook_secret, Utc::now().timestamp())
        .map_err(webhook_error)?;

    let event = StripeEvent::parse(&body).map_err(webhook_error)?;
    let change = SubscriptionChange::from_event(&event, &state.prices).map_err(webhook_error)?;
    info!(event_id = %event.id, event_type = %event.event_type, ?change, "Stripe webhook received");

    with_db(&state, move |db| {
        match change {
            SubscriptionChange::Activate { user_id, plan } => {
                let Ok(id) = user_id.parse::<Uuid>() else {
                    warn!(%user_id, "Checkout metadata carries an unknown user id");
                    return Ok(());
                };
                if !db.set_subscription(id, SubscriptionStatus::Active, Some(plan))? {
                    warn!(%id, "Checkout completed for a missing user");
                }
            }
            SubscriptionChange::Update {
                customer_id,
                status,
                plan,
            } => match db.get_user_by_stripe_customer(&customer_id)? {
                Some(user) => {
                    db.set_subscription(user.id, status, plan)?;
                }
                None => warn!(%customer_id, "Subscription update for unknown customer"),
            },
            SubscriptionChange::Reset { customer_id } => {
                match db.get_user_by_stripe_customer(&customer_id)? {
                    Some(user) => {
                        db.set_subscription(user.id, SubscriptionStatus::None, Some(Plan::Free))?;
                    }
                    None => warn!(%customer_id, "Subscription deletion for unknown customer"),
                }
            }
            SubscriptionChange::Ignore => {}
        }
        Ok(())
    })
    .await?;

    Ok(Json(WebhookAck { received: true }))
}

fn webhook_error(err: WebhookError) -> ApiError {
    warn!(error = %err, "Rejected Stripe webhook");
    ApiError::bad_request(format!("Webhook Error: {}", err))
}
