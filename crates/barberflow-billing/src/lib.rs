//! Stripe billing over the REST API (no SDK dependency).
//!
//! - [`stripe`]: customers, Checkout and billing portal sessions
//! - [`webhook`]: signature verification and event to plan mapping
//! - [`plans`]: price id to plan tier lookup

pub mod plans;
pub mod stripe;
pub mod webhook;

pub use plans::PriceMap;
pub use stripe::{StripeClient, StripeError};
pub use webhook::{SubscriptionChange, WebhookError};
