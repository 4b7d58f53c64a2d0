#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use barberflow_api::{AppState, AppStateInner, router};
use barberflow_billing::{PriceMap, StripeClient};
use barberflow_db::Database;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().expect("in-memory db"),
            jwt_secret: JWT_SECRET.into(),
            client_url: "http://localhost:5173".into(),
            // Nothing listens here; tests never reach Stripe.
            stripe: StripeClient::with_base_url("sk_test_unused", "http://127.0.0.1:9/v1"),
            webhook_secret: WEBHOOK_SECRET.into(),
            prices: PriceMap::default(),
        });
        let router = router(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register a barber and return `(token, user_id)`.
    pub async fn register(&self, name: &str, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "name": name, "email": email, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["_id"].as_str().unwrap().to_string(),
        )
    }

    /// Create a service and return its id.
    pub async fn create_service(&self, token: &str, name: &str, duration: i64, price: f64) -> String {
        let (status, body) = self
            .post(
                "/api/services",
                Some(token),
                json!({ "name": name, "duration": duration, "price": price }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create service failed: {body}");
        body["_id"].as_str().unwrap().to_string()
    }

    pub async fn book(
        &self,
        token: &str,
        service_id: &str,
        email: &str,
        start: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/appointments",
            Some(token),
            json!({
                "clientName": "Walk In",
                "clientEmail": email,
                "serviceId": service_id,
                "startTime": start,
            }),
        )
        .await
    }
}
