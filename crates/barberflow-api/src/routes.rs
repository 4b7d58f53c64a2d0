use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde_json::json;

use crate::middleware::{require_auth, require_paid_plan};
use crate::state::AppState;
use crate::{analytics, appointments, auth, billing, clients, services};

/// Full HTTP surface. CORS and request tracing are layered on by the server binary.
pub fn router(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), require_auth);

    let auth_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/password", put(auth::update_password))
        .route_layer(auth_layer.clone())
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", post(auth::reset_password));

    let service_routes = Router::new()
        .route("/", get(services::list_services).post(services::create_service))
        .route(
            "/{id}",
            patch(services::update_service).delete(services::delete_service),
        )
        .route_layer(auth_layer.clone());

    let appointment_routes = Router::new()
        .route(
            "/",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/{id}",
            patch(appointments::update_appointment_status).delete(appointments::delete_appointment),
        )
        .route_layer(auth_layer.clone());

    let client_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/{id}",
            put(clients::update_client).delete(clients::delete_client),
        )
        .route_layer(auth_layer.clone());

    // require_paid_plan sits inside require_auth, which supplies the user.
    let analytics_routes = Router::new()
        .route("/trends", get(analytics::revenue_trends))
        .route("/distribution", get(analytics::service_distribution))
        .route_layer(from_fn(require_paid_plan))
        .route("/stats", get(analytics::dashboard_stats))
        .route_layer(auth_layer.clone());

    let billing_routes = Router::new()
        .route("/checkout", post(billing::create_checkout_session))
        .route("/portal", post(billing::create_portal_session))
        .route_layer(auth_layer)
        .route("/webhook", post(billing::handle_webhook));

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/services", service_routes)
        .nest("/api/appointments", appointment_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/billing", billing_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "BarberFlow API is running",
    }))
}
