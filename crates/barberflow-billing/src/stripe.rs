use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error: {0}")]
    Api(String),
}

/// Only the fields we read back from Stripe objects.
#[derive(Debug, Deserialize)]
struct StripeObject {
    id: Option<String>,
    url: Option<String>,
    error: Option<StripeApiError>,
}

#[derive(Debug, Deserialize)]
struct StripeApiError {
    message: Option<String>,
}

/// Thin form-encoded client for the handful of Stripe endpoints we call.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

/// Parameters for a subscription-mode Checkout Session.
pub struct CheckoutParams<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub user_id: &'a str,
    pub plan: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    pub fn with_base_url(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }

    /// Create a Stripe Customer tagged with our user id. Returns the customer id.
    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        user_id: &str,
    ) -> Result<String, StripeError> {
        let obj = self
            .post(
                "customers",
                &[("email", email), ("name", name), ("metadata[userId]", user_id)],
            )
            .await?;
        obj.id.ok_or_else(|| StripeError::Api("customer response missing id".into()))
    }

    /// Create a Checkout Session for a subscription. Returns the hosted page URL.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<String, StripeError> {
        let obj = self
            .post(
                "checkout/sessions",
                &[
                    ("customer", params.customer_id),
                    ("mode", "subscription"),
                    ("payment_method_types[0]", "card"),
                    ("line_items[0][price]", params.price_id),
                    ("line_items[0][quantity]", "1"),
                    ("success_url", params.success_url),
                    ("cancel_url", params.cancel_url),
                    ("metadata[userId]", params.user_id),
                    ("metadata[plan]", params.plan),
                ],
            )
            .await?;
        obj.url.ok_or_else(|| StripeError::Api("checkout session missing url".into()))
    }

    /// Create a billing portal session. Returns the portal URL.
    pub async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, StripeError> {
        let obj = self
            .post(
                "billing_portal/sessions",
                &[("customer", customer_id), ("return_url", return_url)],
            )
            .await?;
        obj.url.ok_or_else(|| StripeError::Api("portal session missing url".into()))
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<StripeObject, StripeError> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(%url, "Stripe request");

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let obj: StripeObject = resp.json().await?;
        if !status.is_success() {
            let message = obj
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(StripeError::Api(message));
        }
        Ok(obj)
    }
}
