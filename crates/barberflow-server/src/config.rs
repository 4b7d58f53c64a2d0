use std::path::PathBuf;

use anyhow::{Context, bail};
use barberflow_billing::PriceMap;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["secret", "change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_CLIENT_URL: &str = "http://localhost:5173";

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub client_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub prices: PriceMap,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port: u16 = env_or("PORT", "5099")
            .parse()
            .context("PORT must be a valid port number")?;

        let defaults = PriceMap::default();
        let prices = PriceMap {
            pro_price_id: env_or("STRIPE_PRO_PRICE_ID", &defaults.pro_price_id),
            business_price_id: env_or("STRIPE_BUSINESS_PRICE_ID", &defaults.business_price_id),
        };

        Ok(Self {
            host: env_or("BARBERFLOW_HOST", "0.0.0.0"),
            port,
            db_path: env_or("BARBERFLOW_DB_PATH", "barberflow.db").into(),
            jwt_secret,
            client_url: env_or("CLIENT_URL", DEV_CLIENT_URL),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            prices,
        })
    }

    /// Origins the browser app may call from. `None` means any origin.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        if self.client_url.trim() == "*" {
            return None;
        }
        let mut origins = vec![DEV_CLIENT_URL.to_string()];
        let client = self.client_url.trim_end_matches('/').to_string();
        if !origins.contains(&client) {
            origins.push(client);
        }
        Some(origins)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
