mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;

use common::{TestApp, WEBHOOK_SECRET};

fn signed_webhook(event: &Value, secret: &str) -> Request<Body> {
    let payload = event.to_string();
    let ts = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", ts, payload).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/billing/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", format!("t={},v1={}", ts, signature))
        .body(Body::from(payload))
        .unwrap()
}

fn event(event_type: &str, object: Value) -> Value {
    json!({ "id": "evt_test", "type": event_type, "data": { "object": object } })
}

async fn me(app: &TestApp, token: &str) -> Value {
    let (status, body) = app.get("/api/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn unsigned_or_forged_webhooks_rejected() {
    let app = TestApp::new();
    let ev = event("invoice.paid", json!({}));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/billing/webhook")
        .body(Body::from(ev.to_string()))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Webhook Error:"));

    let (status, _) = app.send(signed_webhook(&ev, "whsec_wrong")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn premium_analytics_follow_subscription_lifecycle() {
    let app = TestApp::new();
    let (token, user_id) = app.register("Sam", "sam@shop.com").await;

    let (status, body) = app.get("/api/analytics/trends", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Upgrade required");
    let (status, _) = app.get("/api/analytics/distribution", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/analytics/stats", &token).await;
    assert_eq!(status, StatusCode::OK);

    // Checkout completes.
    let ev = event(
        "checkout.session.completed",
        json!({ "metadata": { "userId": user_id, "plan": "business" } }),
    );
    let (status, _) = app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);

    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "business");
    assert_eq!(user["subscriptionStatus"], "active");
    let (status, trends) = app.get("/api/analytics/trends?days=30", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(trends.is_array());
    let (status, _) = app.get("/api/analytics/distribution", &token).await;
    assert_eq!(status, StatusCode::OK);

    // Payment fails.
    app.state
        .db
        .set_stripe_customer(user_id.parse().unwrap(), "cus_sam")
        .unwrap();
    let ev = event(
        "customer.subscription.updated",
        json!({ "customer": "cus_sam", "status": "past_due" }),
    );
    app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "free");
    assert_eq!(user["subscriptionStatus"], "past_due");
    let (status, _) = app.get("/api/analytics/trends", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Payment recovers on the pro price.
    let ev = event(
        "customer.subscription.updated",
        json!({
            "customer": "cus_sam",
            "status": "active",
            "items": { "data": [ { "price": { "id": "price_pro_test_id" } } ] }
        }),
    );
    app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "pro");
    assert_eq!(user["subscriptionStatus"], "active");

    // Subscription deleted.
    let ev = event(
        "customer.subscription.deleted",
        json!({ "customer": "cus_sam", "status": "canceled" }),
    );
    app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "free");
    assert_eq!(user["subscriptionStatus"], "none");
}

#[tokio::test]
async fn webhooks_for_unknown_customers_are_acknowledged() {
    let app = TestApp::new();
    let ev = event(
        "customer.subscription.deleted",
        json!({ "customer": "cus_nobody", "status": "canceled" }),
    );
    let (status, body) = app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn portal_requires_a_stripe_customer() {
    let app = TestApp::new();
    let (token, _) = app.register("Sam", "sam@shop.com").await;
    let (status, body) = app
        .request(Method::POST, "/api/billing/portal", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No active subscription found");
}

#[tokio::test]
async fn unrecognised_subscription_status_is_acknowledged() {
    let app = TestApp::new();
    let (token, user_id) = app.register("Sam", "sam@shop.com").await;
    app.state
        .db
        .set_stripe_customer(user_id.parse().unwrap(), "cus_sam")
        .unwrap();

    let ev = event(
        "customer.subscription.updated",
        json!({ "customer": "cus_sam", "status": "paused" }),
    );
    let (status, body) = app.send(signed_webhook(&ev, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "free");
    assert_eq!(user["subscriptionStatus"], "none");
}
