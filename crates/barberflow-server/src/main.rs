mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use barberflow_api::{AppState, AppStateInner};
use barberflow_billing::StripeClient;
use barberflow_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "barberflow=debug,barberflow_api=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.stripe_secret_key.is_empty() {
        warn!("STRIPE_SECRET_KEY is not set; checkout and portal calls will fail");
    }
    if config.stripe_webhook_secret.is_empty() {
        warn!("STRIPE_WEBHOOK_SECRET is not set; every webhook will be rejected");
    }

    let db = Database::open(&config.db_path)?;
    let cors = cors_layer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        client_url: config.client_url,
        stripe: StripeClient::new(config.stripe_secret_key),
        webhook_secret: config.stripe_webhook_secret,
        prices: config.prices,
    });

    let app = barberflow_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("BarberFlow API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = match config.allowed_origins() {
        Some(origins) => {
            let values = origins
                .iter()
                .map(|o| HeaderValue::from_str(o))
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(values)
        }
        // Credentials rule out a literal `*`, so echo the caller's origin.
        None => AllowOrigin::mirror_request(),
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
