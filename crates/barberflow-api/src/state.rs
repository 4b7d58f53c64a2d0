use std::sync::Arc;

use barberflow_billing::{PriceMap, StripeClient};
use barberflow_db::Database;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Frontend origin, used for reset links and Stripe redirect URLs.
    pub client_url: String,
    pub stripe: StripeClient,
    pub webhook_secret: String,
    pub prices: PriceMap,
}

/// Run a blocking DB closure off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
