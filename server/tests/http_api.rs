//! Router tests against the in-memory store and scripted partners.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use boxoffice_core::{Event, PartnerErrorKind, SpotId, SpotStatus, SpotStore};
use boxoffice_runtime::{OrchestratorConfig, RetryPolicy};
use boxoffice_server::{AppState, build_router};
use boxoffice_testing::fixtures::{self, PARTNER_1, PARTNER_2};
use boxoffice_testing::{InMemorySpotStore, MockGatewayFactory, MockPartnerGateway};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemorySpotStore>,
    partner: MockPartnerGateway,
    event: Event,
}

async fn app() -> TestApp {
    let store = Arc::new(InMemorySpotStore::new());
    let event = fixtures::event_e1();
    store.create_event(&event).await.unwrap();

    let partner = MockPartnerGateway::new(PARTNER_1);
    let factory = MockGatewayFactory::new()
        .with_gateway(partner.clone())
        .with_partner(PARTNER_2);
    let config = OrchestratorConfig {
        checkout_retry: RetryPolicy::builder()
            .max_retries(1)
            .initial_delay(Duration::from_millis(1))
            .build(),
        ..OrchestratorConfig::default()
    };

    TestApp {
        router: build_router(AppState::new(Arc::clone(&store), Arc::new(factory), config)),
        store,
        partner,
        event,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn checkout(&self, partner: u32, spots: &[&str]) -> (StatusCode, Value) {
        self.post(
            "/checkout",
            &json!({
                "event_id": self.event.id,
                "partner_id": partner,
                "spot_ids": spots,
                "purchaser": {"email": "ana@example.com"}
            }),
        )
        .await
    }

    fn status(&self, spot: &str) -> Option<SpotStatus> {
        self.store.spot_status(self.event.id, &SpotId::new(spot))
    }
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn events_are_listed_and_fetched() {
    let app = app().await;

    let (status, list) = app.get("/events").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, event) = app.get(&format!("/events/{}", app.event.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["partner_id"], json!(1));
    assert_eq!(event["sections"][0]["spots"][2]["id"], json!("A3"));
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let app = app().await;
    let (status, body) = app.get(&format!("/events/{}", uuid::Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn created_event_gets_generated_spots() {
    let app = app().await;
    let (status, event) = app
        .post(
            "/events",
            &json!({
                "name": "Night Show",
                "date": "2026-03-01T20:00:00Z",
                "partner_id": 2,
                "sections": [
                    {"id": "Floor", "capacity": 12, "price": 8000},
                    {"id": "Balcony", "capacity": 2, "price": 4000}
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["sections"][0]["spots"][11]["id"], json!("B2"));
    assert_eq!(event["sections"][1]["spots"][0]["id"], json!("B3"));
    assert_eq!(app.get("/events").await.1.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn inconsistent_event_is_a_validation_error() {
    let app = app().await;
    let (status, body) = app
        .post(
            "/events",
            &json!({
                "name": "Broken",
                "date": "2026-03-01T20:00:00Z",
                "partner_id": 1,
                "sections": [{"id": "Main", "capacity": 2, "price": 100, "spots": ["A1"]}]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn checkout_sells_the_requested_spots() {
    let app = app().await;
    let (status, body) = app.checkout(1, &["A1", "A2"]).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!("sold"));
    assert_eq!(body["ticket_ids"].as_array().unwrap().len(), 2);
    assert_eq!(app.status("A3"), Some(SpotStatus::Available));
}

#[tokio::test]
async fn taken_spot_is_a_conflict() {
    let app = app().await;
    app.checkout(1, &["A1"]).await;

    let (status, body) = app.checkout(1, &["A1"]).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("CONFLICT"));
}

#[tokio::test]
async fn wrong_partner_is_rejected_before_reserving() {
    let app = app().await;
    let (status, body) = app.checkout(2, &["A1"]).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    assert_eq!(app.store.reservations().len(), 0);
}

#[tokio::test]
async fn partner_rejection_releases_the_spots() {
    let app = app().await;
    app.partner.fail_times(PartnerErrorKind::Rejected, 1);

    let (status, body) = app.checkout(1, &["A1"]).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("PARTNER_REJECTED"));
    assert_eq!(app.status("A1"), Some(SpotStatus::Available));
}

#[tokio::test]
async fn unreachable_partner_is_service_unavailable() {
    let app = app().await;
    app.partner.fail_times(PartnerErrorKind::Unavailable, 2);

    let (status, body) = app.checkout(1, &["A1"]).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], json!("PARTNER_UNAVAILABLE"));
    assert_eq!(app.partner.calls(), 2);
    assert_eq!(app.status("A1"), Some(SpotStatus::Available));
}

#[tokio::test]
async fn garbled_partner_response_is_bad_gateway() {
    let app = app().await;
    app.partner.fail_times(PartnerErrorKind::ProtocolError, 1);

    let (status, body) = app.checkout(1, &["A1"]).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], json!("PARTNER_PROTOCOL_ERROR"));
}

#[tokio::test]
async fn malformed_spot_name_is_a_validation_error() {
    let app = app().await;
    let (status, _) = app.checkout(1, &["a1"]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
